//! Run orchestration
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  dispatch   ┌──────────────┐
//! │ Orchestrator │────────────▶│  Dispatcher  │
//! │    (run)     │◀────────────│ (local task) │
//! └──────────────┘   outcome   └──────────────┘
//!     │      │
//!     │      └──────────────┐
//!     ▼                     ▼
//! ┌──────────────┐   ┌──────────────┐
//! │   Barrier    │   │   Notifier   │
//! │  (finalize)  │   │ (desktop)    │
//! └──────────────┘   └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`barrier`]: reference count of outstanding lookups with a one-shot finalizer
//! - [`notifier`]: accumulates update messages and forwards them to a sink
//! - [`orchestrator`]: the run itself, from baseline load to snapshot write

pub mod barrier;
pub mod notifier;
pub mod orchestrator;
