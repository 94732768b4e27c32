use std::io::{self, BufRead};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use mailprobe_lib::{
    CancelToken, DebugLevel, Domain, RunError, RunEvent, generate_candidates, validate,
};
use tracing::info;

use crate::args::ValidateArgs;
use crate::output::{self, Format};

pub fn run(args: &ValidateArgs, format: Format, out: Option<&str>, debug: DebugLevel) -> Result<ExitCode> {
    let domain = args.domain()?;
    let options = args.run_options(debug)?;
    let candidates = collect_candidates(args, &domain)?;
    info!(%domain, count = candidates.len(), "candidates ready");

    let streaming = format == Format::Human;
    let verbose = debug >= DebugLevel::Verbose;
    let observer = |event: &RunEvent<'_>| {
        if !streaming {
            return;
        }
        match event {
            RunEvent::MxResolved { domain, mx } => println!("MX for {domain}: {mx}"),
            RunEvent::AddressOfRecord(result) => {
                println!("check    {}", output::human_line(result));
                if verbose {
                    output::print_transcript(result);
                }
            }
            RunEvent::CatchAll(verdict) => {
                if verbose {
                    output::print_transcript(&verdict.probe);
                }
            }
            RunEvent::Probed { index, of, result } => {
                println!("{index:>3}/{of:<3} {}", output::human_line(result));
                if verbose {
                    output::print_transcript(result);
                }
            }
            RunEvent::Cancelled { remaining } => {
                println!("interrupted, {remaining} candidate(s) not probed")
            }
            RunEvent::Pausing(_) => {}
        }
    };

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || on_interrupt.cancel()).context("install Ctrl-C handler")?;

    let outcome = validate(
        &candidates,
        &domain,
        args.sender_email.trim(),
        &options,
        args.probe_options(),
        cancel,
        observer,
    );

    match outcome {
        Ok(report) => {
            output::write_report(&report, format, out)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("error: {err}");
            Ok(ExitCode::from(exit_code(&err)))
        }
    }
}

pub fn exit_code(err: &RunError) -> u8 {
    match err {
        RunError::NoMxRecords(_) => 2,
        RunError::CatchAllDetected { .. } => 3,
        RunError::InvalidPartition(_) => 4,
    }
}

fn collect_candidates(args: &ValidateArgs, domain: &Domain) -> Result<Vec<String>> {
    if args.stdin {
        let mut candidates: Vec<String> = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let address = line.trim();
            if address.is_empty() || address.starts_with('#') {
                continue;
            }
            if args.filter_domain && !domain.owns(address) {
                continue;
            }
            let address = address.to_lowercase();
            if !candidates.contains(&address) {
                candidates.push(address);
            }
        }
        return Ok(candidates);
    }

    match (&args.names.first_name, &args.names.last_name) {
        (Some(first), Some(last)) => {
            Ok(generate_candidates(first, last, domain, args.names.level()?)?)
        }
        _ => bail!("validate needs --first-name and --last-name, or --stdin"),
    }
}
