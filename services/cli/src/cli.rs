use crate::commands::{
    run_key_build, run_key_list, run_key_show, run_score, KeyBuildArgs, KeyShowArgs, ScoreArgs,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use survey_scoring::config::AppConfig;
use survey_scoring::error::AppError;
use survey_scoring::telemetry;
use survey_scoring::KeyStore;

#[derive(Parser, Debug)]
#[command(
    name = "survey-scoring",
    about = "Build psychometric scale keys and score survey responses against them",
    version
)]
struct Cli {
    /// Directory holding scale keys (overrides SURVEY_KEYS_DIR)
    #[arg(long, global = true)]
    keys_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Author and inspect scale keys
    Key {
        #[command(subcommand)]
        command: KeyCommand,
    },
    /// Score a response table against one or more scale keys
    Score(ScoreArgs),
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    /// Build a key from a JSON subscale map and write it to the key directory
    Build(KeyBuildArgs),
    /// Print a stored key
    Show(KeyShowArgs),
    /// List scales that have a stored key
    List,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;

    if let Some(dir) = cli.keys_dir {
        config.keys.dir = dir;
    }

    telemetry::init(&config.telemetry)?;

    let store = KeyStore::new(config.keys.dir.clone());
    match cli.command {
        Command::Key {
            command: KeyCommand::Build(args),
        } => run_key_build(&store, args),
        Command::Key {
            command: KeyCommand::Show(args),
        } => run_key_show(&store, args),
        Command::Key {
            command: KeyCommand::List,
        } => run_key_list(&store),
        Command::Score(args) => run_score(&store, &config.scoring, args),
    }
}
