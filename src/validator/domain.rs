use super::types::{Domain, DomainError};

impl Domain {
    /// Trims, converts to ASCII (IDNA) and lowercases `input`, then applies
    /// the label rules of [`check_labels`].
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim().trim_end_matches('.');
        if trimmed.is_empty() {
            return Err(DomainError::Empty);
        }
        let ascii = idna::domain_to_ascii(trimmed).map_err(|_| DomainError::Idna)?;
        if ascii.is_empty() {
            return Err(DomainError::Empty);
        }
        let ascii = ascii.to_ascii_lowercase();

        let mut reasons = Vec::new();
        check_labels(&ascii, &mut reasons);
        if reasons.is_empty() {
            Ok(Domain::from_checked(ascii))
        } else {
            Err(DomainError::Invalid { reasons })
        }
    }
}

/// Label checks on an already-ASCII domain.
/// Each failed rule pushes one reason onto `reasons`.
pub(crate) fn check_labels(domain_ascii: &str, reasons: &mut Vec<String>) {
    if domain_ascii.len() > 253 {
        reasons.push(format!("domain length {} > 253", domain_ascii.len()));
    }

    // at least one dot
    if !domain_ascii.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }

    for label in domain_ascii.split('.') {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > 63 {
            reasons.push(format!(
                "domain label '{}' length {} > 63",
                label,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!(
                "domain label '{}' cannot start/end with '-'",
                label
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{}' has invalid chars", label));
        }
    }
}
