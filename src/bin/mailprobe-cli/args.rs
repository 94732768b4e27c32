use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use mailprobe_lib::{
    DebugLevel, DelayRange, Domain, PartitionSpec, PermutationLevel, ProbeOptions, RunOptions,
    validate_address,
};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// format: human|json|ndjson|csv
    #[arg(long, global = true, default_value = "human")]
    pub format: String,

    /// write report to file (JSON/NDJSON/CSV per --format)
    #[arg(long, global = true)]
    pub out: Option<String>,

    /// debug level: 0=minimal, 1=moderate, 2=verbose (SMTP transcripts)
    #[arg(long, global = true, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub debug: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe candidate addresses against the domain's primary MX
    Validate(ValidateArgs),
    /// Print generated candidates without probing
    Permutations(PermutationArgs),
    /// Print the ordered MX records and the selected host
    Mx {
        #[arg(long)]
        domain: String,
    },
}

#[derive(Args)]
pub struct NameArgs {
    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    /// permutation level: 1=light, 2=medium, 3=heavy
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub level: u8,
}

impl NameArgs {
    pub fn level(&self) -> Result<PermutationLevel> {
        Ok(PermutationLevel::try_from(self.level)?)
    }
}

#[derive(Args)]
pub struct PartArgs {
    /// only process this part (1-based) of the candidate list
    #[arg(long)]
    pub part: Option<usize>,

    #[arg(long, default_value_t = 4)]
    pub total_parts: usize,
}

impl PartArgs {
    /// Range checking is left to the library so a bad part maps to its own
    /// exit code.
    pub fn spec(&self) -> Option<PartitionSpec> {
        self.part.map(|selected_part| PartitionSpec {
            total_parts: self.total_parts,
            selected_part,
        })
    }
}

#[derive(Args)]
pub struct PermutationArgs {
    #[arg(long)]
    pub domain: String,

    #[command(flatten)]
    pub names: NameArgs,

    #[command(flatten)]
    pub partition: PartArgs,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[arg(long)]
    pub domain: String,

    /// envelope sender used in MAIL FROM
    #[arg(long)]
    pub sender_email: String,

    #[command(flatten)]
    pub names: NameArgs,

    /// read candidate addresses from stdin (one per line)
    #[arg(long, conflicts_with_all = ["first_name", "last_name"])]
    pub stdin: bool,

    /// with --stdin, drop addresses outside --domain
    #[arg(long, requires = "stdin")]
    pub filter_domain: bool,

    #[command(flatten)]
    pub partition: PartArgs,

    /// pause between probes, drawn uniformly from MIN..=MAX seconds
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [20.0, 30.0])]
    pub delay: Vec<f64>,

    #[arg(long, conflicts_with = "delay")]
    pub no_delay: bool,

    /// skip the info@ (or --check-email) probe
    #[arg(long)]
    pub no_check: bool,

    /// address of record to probe instead of info@<domain>
    #[arg(long)]
    pub check_email: Option<String>,

    /// name announced in HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// per-session deadline in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// seed delay sampling and the catch-all probe address
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ValidateArgs {
    pub fn domain(&self) -> Result<Domain> {
        Domain::parse(&self.domain).with_context(|| format!("invalid --domain '{}'", self.domain))
    }

    pub fn run_options(&self, debug: DebugLevel) -> Result<RunOptions> {
        validate_address(&self.sender_email)
            .with_context(|| format!("invalid --sender-email '{}'", self.sender_email))?;
        if let Some(check) = &self.check_email {
            validate_address(check).with_context(|| format!("invalid --check-email '{check}'"))?;
        }

        let delay = if self.no_delay {
            DelayRange::none()
        } else {
            match self.delay.as_slice() {
                [min, max] => DelayRange::new(*min, *max)?,
                other => bail!("--delay takes MIN MAX, got {} values", other.len()),
            }
        };

        Ok(RunOptions {
            delay,
            debug,
            no_check: self.no_check,
            check_email: self.check_email.clone(),
            partition: self.partition.spec(),
            seed: self.seed,
        })
    }

    pub fn probe_options(&self) -> ProbeOptions {
        let mut options = ProbeOptions {
            timeout: Duration::from_secs(self.timeout.max(1)),
            ..ProbeOptions::default()
        };
        if let Some(helo) = &self.helo {
            options.helo_name = helo.clone();
        }
        options
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn debug_level(&self) -> DebugLevel {
        DebugLevel::try_from(self.debug).unwrap_or(DebugLevel::Verbose)
    }
}
