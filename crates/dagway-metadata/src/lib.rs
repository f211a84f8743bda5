//! Access to the orchestrator's metadata database.
//!
//! The orchestrator owns this database; dagway reads workflow records to
//! validate requests and performs the handful of single-record updates its
//! custom operations need (pausing, triggering runs, managing pools).

pub mod error;
pub mod store;
pub mod types;

pub use error::{MetadataError, Result};
pub use store::MetadataStore;
pub use types::{NewRun, Pool, TaskInstance, Workflow, WorkflowRun};
