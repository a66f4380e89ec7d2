//! Shared test utilities for the policyscan workspace.
//!
//! The in-memory adapters implement the app crate's ports so pipeline, registry and policy tests
//! run without a disk corpus. This lives in its own crate because `policyscan-cli` tests and
//! the app crate's integration tests both need it.

mod config;
mod corpus;
mod normalize;
mod sink;

pub use config::MemoryConfigBackend;
pub use corpus::{Gate, MemoryCorpus};
pub use normalize::normalize_nondeterministic;
pub use sink::{RecordingSink, SinkEvent};

/// Manifest used across tests: `left-pad` on line 3, `react` on line 6.
pub const PACKAGE_JSON: &str = r#"{
  "name": "web",
  "dependencies": {
    "left-pad": "1.3.0"
  },
  "devDependencies": {
    "react": "16.0.0"
  }
}
"#;

/// Travis config pinned to an old Go release.
pub const TRAVIS_OLD_GO: &str = "language: go\ngo:\n  - \"1.10.x\"\n";
