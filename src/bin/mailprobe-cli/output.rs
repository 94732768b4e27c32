#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};

use mailprobe_lib::{ProbeResult, RunReport, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
    Ndjson,
    Csv,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            "csv" => Ok(Self::Csv),
            other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
        }
    }

    /// Fails early when the binary was built without the needed feature.
    pub fn ensure_available(self) -> Result<()> {
        match self {
            Self::Human => Ok(()),
            #[cfg(feature = "with-serde")]
            Self::Json | Self::Ndjson => Ok(()),
            #[cfg(not(feature = "with-serde"))]
            Self::Json | Self::Ndjson => bail!("format=json/ndjson requires the 'with-serde' feature"),
            #[cfg(feature = "with-csv")]
            Self::Csv => Ok(()),
            #[cfg(not(feature = "with-csv"))]
            Self::Csv => bail!("format=csv requires the 'with-csv' feature"),
        }
    }
}

pub fn human_line(result: &ProbeResult) -> String {
    let tag = match result.verdict {
        Verdict::Accepted => "[VALID]",
        Verdict::Rejected => "[INVALID]",
        Verdict::Indeterminate => "[UNKNOWN]",
    };
    let mut line = format!("{tag:<10}{}", result.candidate);
    if let Some(err) = &result.error {
        line.push_str(&format!(" :: {err}"));
    }
    line
}

pub fn print_transcript(result: &ProbeResult) {
    for event in &result.transcript {
        println!("          {event}");
    }
}

pub fn write_report(report: &RunReport, format: Format, out: Option<&str>) -> Result<()> {
    match format {
        Format::Human => {
            println!(
                "{} on {} via {}: {}",
                report.status, report.domain, report.mx, report.summary
            );
            for result in report.accepted() {
                println!("  {}", result.candidate);
            }
            Ok(())
        }
        Format::Json => write_json(report, out),
        Format::Ndjson => write_ndjson(&report.results, out),
        Format::Csv => write_csv(&report.results, out),
    }
}

pub fn write_candidates(candidates: &[String], format: Format, out: Option<&str>) -> Result<()> {
    match format {
        Format::Human => {
            for candidate in candidates {
                println!("{candidate}");
            }
            Ok(())
        }
        Format::Json => write_json(candidates, out),
        Format::Ndjson => write_ndjson(candidates, out),
        Format::Csv => write_candidates_csv(candidates, out),
    }
}

#[cfg(feature = "with-serde")]
pub fn write_json<T: serde::Serialize + ?Sized>(value: &T, out: Option<&str>) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    if let Some(path) = out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
pub fn write_json<T: ?Sized>(_: &T, _: Option<&str>) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson<T: serde::Serialize>(rows: &[T], out: Option<&str>) -> Result<()> {
    if let Some(path) = out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson<T>(_: &[T], _: Option<&str>) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
const RESULT_HEADER: [&str; 6] = ["candidate", "accepted", "verdict", "code", "error", "checked_at"];

#[cfg(feature = "with-csv")]
fn csv_record(result: &ProbeResult) -> Vec<String> {
    vec![
        result.candidate.clone(),
        result.accepted.to_string(),
        result.verdict.to_string(),
        result.raw_code.map(|c| c.to_string()).unwrap_or_default(),
        result
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        result.checked_at.to_rfc3339(),
    ]
}

#[cfg(feature = "with-csv")]
fn write_csv(results: &[ProbeResult], out: Option<&str>) -> Result<()> {
    if let Some(path) = out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(RESULT_HEADER)?;
        for result in results {
            wtr.write_record(csv_record(result))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(RESULT_HEADER)?;
        for result in results {
            wtr.write_record(csv_record(result))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[ProbeResult], _: Option<&str>) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(feature = "with-csv")]
fn write_candidates_csv(candidates: &[String], out: Option<&str>) -> Result<()> {
    if let Some(path) = out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(["candidate"])?;
        for candidate in candidates {
            wtr.write_record([candidate])?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(["candidate"])?;
        for candidate in candidates {
            wtr.write_record([candidate])?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_candidates_csv(_: &[String], _: Option<&str>) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
