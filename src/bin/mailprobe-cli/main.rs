use std::process::ExitCode;

use anyhow::Result;
use mailprobe_lib::DebugLevel;
use tracing_subscriber::prelude::*;

mod args;
mod mx;
mod output;
mod permutations;
mod validate;

use args::{Cli, Commands};
use output::Format;

// exit codes: 0 ok/cancelled, 1 fatal, 2 no MX, 3 catch-all, 4 invalid partition
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug_level());

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let format = Format::parse(&cli.format)?;
    format.ensure_available()?;
    let out = cli.out.as_deref();

    match &cli.cmd {
        Commands::Validate(args) => validate::run(args, format, out, cli.debug_level()),
        Commands::Permutations(args) => permutations::run(args, format, out),
        Commands::Mx { domain } => mx::run(domain, format, out),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the `--debug` mapping.
fn init_tracing(debug: DebugLevel) {
    let fallback = match debug {
        DebugLevel::Minimal => "mailprobe_lib=warn,mailprobe_cli=warn",
        DebugLevel::Moderate => "mailprobe_lib=debug,mailprobe_cli=debug",
        DebugLevel::Verbose => "mailprobe_lib=trace,mailprobe_cli=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
