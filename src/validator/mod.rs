//! Domain and address checks for operator-supplied inputs.
//!
//! Candidates themselves are never validated here; only the target domain,
//! the `MAIL FROM` identity and the address-of-record override go through it.

mod domain;
mod local;
mod types;

pub use types::{AddressError, Domain, DomainError};

use local::is_dot_atom;

/// Checks that `address` is `dot-atom@domain` and returns its parsed domain.
pub fn validate_address(address: &str) -> Result<Domain, AddressError> {
    let input = address.trim();
    let (local, domain) = match input.split_once('@') {
        Some((l, d)) if !d.contains('@') => (l, d),
        _ => return Err(AddressError::MissingAt),
    };

    if local.is_empty() || local.len() > 64 {
        return Err(AddressError::LocalLength(local.len()));
    }
    if !is_dot_atom(local) {
        return Err(AddressError::InvalidLocal(local.to_string()));
    }

    Ok(Domain::parse(domain)?)
}
