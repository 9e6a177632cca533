//! openapi-groups - command-line tool building customized OpenAPI documentation groups.
//!
//! # Usage
//!
//! ```bash
//! openapi-groups [OPTIONS] --handlers <PATH> <SPEC>
//! ```
//!
//! # Examples
//!
//! Build the default groups into a directory:
//! ```bash
//! openapi-groups generated.json --handlers handlers/ -o docs/
//! ```
//!
//! Build one configured group as JSON on stdout:
//! ```bash
//! openapi-groups generated.json --handlers handlers.yaml -c groups.yaml -g public -f json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_groups::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("openapi-groups starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI documentation groups generated successfully");

    Ok(())
}
