//! Pure policy evaluation (no IO).
//!
//! Input: document texts handed over by the corpus layer, plus a policy snapshot.
//! Output: findings, diagnostics, fix edits and status summaries.

#![forbid(unsafe_code)]

pub mod checks;
pub mod fix;
pub mod identity;
pub mod model;
pub mod policy;
pub mod status;

mod engine;
mod fingerprint;

pub use engine::{DocumentOutcome, synthesize_document};
pub use fingerprint::fingerprint_for_finding;
pub use fix::{FixError, compute_local_fix, offered_remediation};
pub use identity::{DiagnosticIdentity, IdentityError, decode, encode};

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;
