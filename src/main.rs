//! refmatch - Reference/Candidate File Matcher
//!
//! Entry point for the refmatch CLI application.

use clap::Parser;
use refmatch::{
    cli::Cli,
    error::{ExitCode, StructuredError},
    matching::MatcherError,
};

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match refmatch::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = if err
                .downcast_ref::<MatcherError>()
                .is_some_and(|e| matches!(e, MatcherError::Interrupted))
            {
                ExitCode::Interrupted
            } else {
                ExitCode::GeneralError
            };

            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                match serde_json::to_string_pretty(&structured) {
                    Ok(json) => eprintln!("{}", json),
                    Err(_) => eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err),
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
