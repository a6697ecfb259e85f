//! Version lookup layer
//!
//! Fetches the latest version of a target from its configured source and
//! orders version strings.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Dispatcher  │────▶│   Fetcher   │────▶│  Fetchers   │
//! │  (timeout)  │     │   (trait)   │     │(github,pypi)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │   Compare   │
//!                                         │(version cmp)│
//!                                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`compare`]: segment-wise version ordering
//! - [`dispatch`]: fetcher registry and task spawning
//! - [`error`]: per-target lookup failures
//! - [`fetcher`]: trait implemented by every source
//! - [`fetchers`]: built-in sources (manual, cmd, regex, github, pypi, ...)

pub mod compare;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod fetchers;
