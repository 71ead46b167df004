//! memline: a streaming tokenizer and command parser for a
//! memcached-style text protocol.
//!
//! Reads CRLF-terminated lines from stdin (or a file), parses each into a
//! `get` or `set` command and writes one acknowledgement per line to stdout.
//!
//! Features:
//! - Incremental line splitting independent of read chunk sizes
//! - Field-level validation errors for every command parameter
//! - Relative and absolute expiration times
//! - Configuration via CLI arguments or TOML file

mod config;
mod interpreter;
mod protocol;

use config::Config;
use interpreter::{Interpreter, Options};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging. Stdout carries protocol replies only.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        input = ?config.input,
        max_line_length = config.max_line_length,
        acknowledge = config.acknowledge,
        "Starting memline"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

/// Run the interpreter over the configured input and stdout
async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let interpreter = Interpreter::new(Options::from(&config));
    let mut stdout = tokio::io::stdout();

    let result = match config.input {
        Some(ref path) => {
            let mut file = tokio::fs::File::open(path).await?;
            interpreter.run(&mut file, &mut stdout).await
        }
        None => {
            let mut stdin = tokio::io::stdin();
            interpreter.run(&mut stdin, &mut stdout).await
        }
    };

    match result {
        Ok(summary) => {
            info!(
                lines = summary.lines,
                commands = summary.commands,
                errors = summary.errors,
                bytes_written = summary.bytes_written,
                "Input finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Interpreter stopped");
            Err(e.into())
        }
    }
}
