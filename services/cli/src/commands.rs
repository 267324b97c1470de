use clap::Args;
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;
use survey_scoring::config::ScoringConfig;
use survey_scoring::error::AppError;
use survey_scoring::{
    create_key, score_surveys, KeyStore, ResponseBounds, ResponseTable, ScaleKey,
    ScoredSurveys, ScoringMethod, SubscaleMap,
};
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct KeyBuildArgs {
    /// JSON object mapping subscale names to item specs, e.g. {"Sincerity": ["6", "30R"]}
    #[arg(long)]
    pub(crate) map: PathBuf,
    /// Scale name; item columns are named {scale}_{item}
    #[arg(long)]
    pub(crate) scale: String,
    /// Lowest possible raw response
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) min: i32,
    /// Highest possible raw response
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) max: i32,
}

#[derive(Args, Debug)]
pub(crate) struct KeyShowArgs {
    /// Scale whose key should be printed
    #[arg(long)]
    pub(crate) scale: String,
    /// Print the key as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Response CSV with one {scale}_{item} column per item
    #[arg(long)]
    pub(crate) data: PathBuf,
    /// Scale to score; repeat for several, scored in the given order
    #[arg(long = "scale", required = true)]
    pub(crate) scales: Vec<String>,
    /// average or sum (defaults to SURVEY_SCORE_METHOD)
    #[arg(long)]
    pub(crate) method: Option<String>,
    /// Treat reverse-coded items as already reversed in the data
    #[arg(long)]
    pub(crate) no_reverse: bool,
    /// Lowest raw response, for keys stored without bounds
    #[arg(long, requires = "max", allow_negative_numbers = true)]
    pub(crate) min: Option<i32>,
    /// Highest raw response, for keys stored without bounds
    #[arg(long, requires = "min", allow_negative_numbers = true)]
    pub(crate) max: Option<i32>,
    /// Write the scored table here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_key_build(store: &KeyStore, args: KeyBuildArgs) -> Result<(), AppError> {
    let KeyBuildArgs {
        map,
        scale,
        min,
        max,
    } = args;

    let subscales = SubscaleMap::from_path(&map)?;
    let bounds = ResponseBounds::new(min, max)?;
    let key = create_key(store, &scale, &subscales, bounds)?;

    println!(
        "Built key '{}' with {} subscales over {} items ({})",
        key.scale(),
        key.subscales().len(),
        key.columns().len(),
        bounds
    );
    println!("- {}", store.csv_path(&scale).display());
    println!("- {}", store.json_path(&scale).display());
    Ok(())
}

pub(crate) fn run_key_show(store: &KeyStore, args: KeyShowArgs) -> Result<(), AppError> {
    let key = store.load(&args.scale)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        writeln!(out, "{}", key_json(&key))?;
    } else {
        render_key(&mut out, &key)?;
    }
    Ok(())
}

pub(crate) fn run_key_list(store: &KeyStore) -> Result<(), AppError> {
    let scales = store.list()?;
    if scales.is_empty() {
        println!("No keys in {}", store.dir().display());
    }
    for scale in scales {
        println!("{scale}");
    }
    Ok(())
}

pub(crate) fn run_score(
    store: &KeyStore,
    defaults: &ScoringConfig,
    args: ScoreArgs,
) -> Result<(), AppError> {
    let ScoreArgs {
        data,
        scales,
        method,
        no_reverse,
        min,
        max,
        output,
    } = args;

    let mut options = defaults.options();
    if let Some(method) = method {
        options.method = method.parse::<ScoringMethod>()?;
    }
    if no_reverse {
        options.reverse_score = false;
    }
    if let (Some(min), Some(max)) = (min, max) {
        options.fallback_bounds = Some(ResponseBounds::new(min, max)?);
    }

    let table = ResponseTable::from_path(&data)?;
    let scored = score_surveys(store, &table, &scales, &options)?;
    report_mismatches(&scored);

    match output {
        Some(path) => {
            scored.table.to_path(&path)?;
            info!(path = %path.display(), respondents = scored.table.len(), "scores written");
        }
        None => scored.table.to_writer(io::stdout().lock())?,
    }
    Ok(())
}

fn report_mismatches(scored: &ScoredSurveys) {
    for mismatch in &scored.mismatches {
        eprintln!("warning: key realigned to data for {mismatch}");
    }
}

fn key_json(key: &ScaleKey) -> serde_json::Value {
    let subscales: Vec<serde_json::Value> = key
        .subscales()
        .iter()
        .map(|row| {
            json!({
                "name": row.name,
                "polarities": row.polarities.iter().map(|p| p.value()).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "scale": key.scale(),
        "columns": key.columns(),
        "subscales": subscales,
        "min_val": key.bounds().map(|bounds| bounds.min()),
        "max_val": key.bounds().map(|bounds| bounds.max()),
    })
}

fn render_key<W: Write>(out: &mut W, key: &ScaleKey) -> io::Result<()> {
    match key.bounds() {
        Some(bounds) => writeln!(out, "Scale {} (responses {})", key.scale(), bounds)?,
        None => writeln!(out, "Scale {} (legacy key, no response bounds)", key.scale())?,
    }

    for row in key.subscales() {
        let items: Vec<String> = row
            .scored()
            .map(|(index, polarity)| {
                let column = &key.columns()[index];
                if polarity.value() < 0 {
                    format!("{column} (reversed)")
                } else {
                    column.clone()
                }
            })
            .collect();
        writeln!(out, "- {}: {}", row.name, items.join(", "))?;
    }
    Ok(())
}
