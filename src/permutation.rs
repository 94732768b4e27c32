//! Candidate address generation from a person's name.

use std::fmt;

use thiserror::Error;

use crate::validator::Domain;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("first and last name must both be non-empty")]
    EmptyName,
    #[error("permutation level must be 1, 2 or 3 (got {0})")]
    InvalidLevel(u8),
}

/// How many naming patterns to try. Each level is a superset of the one
/// below it.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PermutationLevel {
    #[default]
    Light = 1,
    Medium = 2,
    Heavy = 3,
}

impl TryFrom<u8> for PermutationLevel {
    type Error = PermutationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Light),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Heavy),
            other => Err(PermutationError::InvalidLevel(other)),
        }
    }
}

impl fmt::Display for PermutationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
        })
    }
}

#[derive(Clone, Copy)]
enum Piece {
    First,
    Last,
    FirstInitial,
    LastInitial,
    FirstThree,
    LastThree,
}

struct Pattern {
    head: Piece,
    sep: &'static str,
    tail: Option<Piece>,
}

const fn pair(head: Piece, sep: &'static str, tail: Piece) -> Pattern {
    Pattern {
        head,
        sep,
        tail: Some(tail),
    }
}

const fn single(head: Piece) -> Pattern {
    Pattern {
        head,
        sep: "",
        tail: None,
    }
}

use Piece::*;

const LIGHT: &[Pattern] = &[
    pair(First, "", Last),
    pair(First, ".", Last),
    pair(FirstInitial, "", Last),
    pair(FirstInitial, ".", Last),
    pair(FirstInitial, "_", Last),
    pair(First, "-", Last),
];

const MEDIUM: &[Pattern] = &[
    single(First),
    single(Last),
    pair(First, "_", Last),
    pair(Last, ".", First),
    pair(Last, "_", First),
    pair(Last, "", First),
];

const HEAVY: &[Pattern] = &[
    pair(FirstInitial, "", LastThree),
    pair(FirstInitial, ".", LastThree),
    pair(FirstThree, "", LastInitial),
    pair(LastThree, "", FirstInitial),
    pair(First, "", LastInitial),
    pair(Last, "", FirstInitial),
];

struct Name {
    full: String,
    initial: String,
    three: String,
}

impl Name {
    fn new(raw: &str) -> Result<Self, PermutationError> {
        let full = raw.trim().to_lowercase();
        if full.is_empty() {
            return Err(PermutationError::EmptyName);
        }
        Ok(Self {
            initial: full.chars().take(1).collect(),
            three: full.chars().take(3).collect(),
            full,
        })
    }
}

fn render<'a>(piece: Piece, first: &'a Name, last: &'a Name) -> &'a str {
    match piece {
        First => &first.full,
        Last => &last.full,
        FirstInitial => &first.initial,
        LastInitial => &last.initial,
        FirstThree => &first.three,
        LastThree => &last.three,
    }
}

/// Ordered candidate addresses for `first last` at `domain`.
///
/// Names are trimmed and lowercased. Duplicates are dropped, keeping the
/// first occurrence.
pub fn generate_candidates(
    first: &str,
    last: &str,
    domain: &Domain,
    level: PermutationLevel,
) -> Result<Vec<String>, PermutationError> {
    let first = Name::new(first)?;
    let last = Name::new(last)?;

    let mut tables = vec![LIGHT];
    if level >= PermutationLevel::Medium {
        tables.push(MEDIUM);
    }
    if level >= PermutationLevel::Heavy {
        tables.push(HEAVY);
    }

    let mut out: Vec<String> = Vec::new();
    for pattern in tables.into_iter().flatten() {
        let mut local = String::from(render(pattern.head, &first, &last));
        if let Some(tail) = pattern.tail {
            local.push_str(pattern.sep);
            local.push_str(render(tail, &first, &last));
        }
        let address = domain.address(&local);
        if !out.contains(&address) {
            out.push(address);
        }
    }
    Ok(out)
}
