mod cli;
mod commands;

use survey_scoring::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
