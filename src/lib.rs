//! Check upstream sources for new versions of configured targets.
//!
//! A run loads the target configuration and the previously recorded versions,
//! looks every target up concurrently, reports which ones moved forward and
//! writes the resulting version table back to disk.

pub mod check;
pub mod config;
pub mod logging;
pub mod snapshot;
pub mod version;
