use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use mailprobe_lib::{Domain, generate_candidates};

use crate::args::PermutationArgs;
use crate::output::{self, Format};

pub fn run(args: &PermutationArgs, format: Format, out: Option<&str>) -> Result<ExitCode> {
    let domain = Domain::parse(&args.domain)
        .with_context(|| format!("invalid --domain '{}'", args.domain))?;
    let (Some(first), Some(last)) = (&args.names.first_name, &args.names.last_name) else {
        bail!("permutations needs --first-name and --last-name");
    };
    let all = generate_candidates(first, last, &domain, args.names.level()?)?;

    let selected = match args.partition.spec() {
        Some(spec) => match spec.select(&all) {
            Ok(part) => part,
            Err(err) => {
                eprintln!("error: {err}");
                return Ok(ExitCode::from(4));
            }
        },
        None => &all[..],
    };
    output::write_candidates(selected, format, out)?;
    Ok(ExitCode::SUCCESS)
}
