use std::fmt;

use thiserror::Error;

/// A lower-cased, ASCII (IDNA) mail domain.
///
/// Built through [`Domain::parse`], so holding one means the label rules
/// already passed.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(try_from = "String", into = "String"))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when `address` ends in `@<this domain>` (case-insensitive).
    pub fn owns(&self, address: &str) -> bool {
        address
            .trim()
            .rsplit_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && domain.eq_ignore_ascii_case(&self.0)
            })
    }

    /// `local@domain`, no validation of `local`.
    pub fn address(&self, local: &str) -> String {
        format!("{local}@{}", self.0)
    }

    pub(crate) fn from_checked(ascii: String) -> Self {
        Self(ascii)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Domain {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Domain::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(value: Domain) -> Self {
        value.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain is empty")]
    Empty,
    #[error("domain punycode conversion failed")]
    Idna,
    #[error("invalid domain: {}", reasons.join("; "))]
    Invalid { reasons: Vec<String> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("must contain exactly one '@'")]
    MissingAt,
    #[error("local part length {0} invalid (1..=64)")]
    LocalLength(usize),
    #[error("invalid local part '{0}'")]
    InvalidLocal(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}
