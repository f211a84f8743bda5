//! Operation registry, request validation and command assembly for dagway.
//!
//! A request flows through this crate as:
//!
//! 1. [`validate`] resolves the operation name against the [`ApiRegistry`],
//!    checks required arguments, and confirms the referenced workflow exists.
//! 2. The descriptor's [`Dispatch`] decides between an in-process handler and
//!    the generic path.
//! 3. On the generic path, [`assemble`] builds a [`CommandVector`] and the
//!    [`Executor`] runs it, foreground or detached.
//! 4. [`filter_loading_messages`] optionally strips orchestrator log noise.
//!
//! # Example
//!
//! ```ignore
//! use dagway_dispatch::{ApiRegistry, AssemblyContext, ResolvedArguments, assemble};
//!
//! let registry = ApiRegistry::builtin();
//! let descriptor = dagway_dispatch::validate(Some("list_tasks"), &registry, &args, &catalog)?;
//! let resolved = ResolvedArguments::resolve(descriptor, &args);
//! let command = assemble(descriptor, &resolved, &AssemblyContext { program: "airflow", log_folder });
//! let output = Executor::default().execute(&command).await?;
//! ```

pub mod arguments;
pub mod assemble;
pub mod error;
pub mod execute;
pub mod filter;
pub mod registry;
pub mod validate;

pub use arguments::{RequestArguments, ResolvedArguments};
pub use assemble::{AssemblyContext, CommandVector, DETACH_MARKER, LOG_FILE_ARGUMENT, assemble};
pub use error::{DispatchError, Result};
pub use execute::{DEFAULT_SHELL, Executor, ProcessOutput};
pub use filter::filter_loading_messages;
pub use registry::{
    ApiDescriptor, ApiRegistry, ArgumentSpec, Dispatch, FixedArgument, HandlerId, HttpMethod,
    InputKind,
};
pub use validate::{WORKFLOW_ID_ARGUMENT, WorkflowCatalog, validate};
