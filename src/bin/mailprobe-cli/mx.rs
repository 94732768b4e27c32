use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use mailprobe_lib::{Domain, MxError, MxRecord, SystemMxResolver};

use crate::output::{self, Format};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct MxSummary {
    pub domain: String,
    /// Sorted by preference.
    pub records: Vec<MxRecord>,
    /// First record of the DNS answer, the host a run probes.
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub primary: Option<String>,
}

impl MxSummary {
    pub fn from_answers(domain: &Domain, answers: Vec<MxRecord>) -> Self {
        let primary = answers.first().map(|record| record.exchange.clone());
        let mut records = answers;
        records.sort();
        records.dedup();
        Self {
            domain: domain.to_string(),
            records,
            primary,
        }
    }

    pub fn human_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .records
            .iter()
            .map(|r| format!("{:>5} {}", r.preference, r.exchange))
            .collect();
        match &self.primary {
            Some(primary) => lines.push(format!("primary: {primary}")),
            None => lines.push("no MX records".to_string()),
        }
        lines
    }
}

pub fn run(domain: &str, format: Format, out: Option<&str>) -> Result<ExitCode> {
    let domain = Domain::parse(domain).with_context(|| format!("invalid --domain '{domain}'"))?;
    let resolver = SystemMxResolver::new()?;
    let answers = match resolver.answers(&domain) {
        Ok(answers) => answers,
        Err(err @ MxError::NoMxRecords { .. }) => {
            eprintln!("error: {err}");
            return Ok(ExitCode::from(2));
        }
        Err(err) => return Err(err.into()),
    };
    let summary = MxSummary::from_answers(&domain, answers);

    match format {
        Format::Human => {
            for line in summary.human_lines() {
                println!("{line}");
            }
        }
        Format::Json | Format::Ndjson => output::write_json(&summary, out)?,
        Format::Csv => bail!("format=csv is not available for mx"),
    }

    if summary.primary.is_none() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
