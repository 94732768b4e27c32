//! MX resolution.
//!
//! [`check_mx`] returns the full ordered record list; [`MxResolve`] is the
//! seam the scheduler uses to obtain the one host a run probes.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{MxResolve, SystemMxResolver, check_mx};
pub use types::{MxHost, MxRecord, MxStatus};

#[cfg(test)]
mod tests;
