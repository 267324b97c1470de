pub mod config;
pub mod error;
pub mod survey;
pub mod telemetry;

pub use survey::key::{
    build_key, create_key, ItemSpec, KeyError, KeyStore, Polarity, ResponseBounds, ScaleKey,
    SubscaleMap,
};
pub use survey::scoring::{
    reverse, score_surveys, SchemaMismatch, ScoreOptions, ScoredSurveys, ScoringError,
    ScoringMethod,
};
pub use survey::table::{Cell, ResponseTable, TableError};
pub use survey::ErrorKind;
