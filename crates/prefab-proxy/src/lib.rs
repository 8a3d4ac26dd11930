//! Template proxies for composition graphs.
//!
//! A proxy is a placeholder node standing in for a reusable template
//! subgraph. At execution time it is replaced once by a live instance of the
//! template; while authoring it keeps a hidden, read-only preview of the
//! template up to date without touching the authored graph.
//!
//! The host graph is reached only through the traits in [`api`]. [`memory`]
//! provides an in-memory host for tests and simulation.

pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod memory;
pub mod nesting;
pub mod preview;
pub mod proxy;
pub mod runtime;
pub mod scheduler;
pub mod staleness;
pub mod state_machine;
pub mod types;
pub mod validation;

pub use api::*;
pub use config::*;
pub use error::*;
pub use proxy::*;
pub use runtime::*;
pub use types::*;

pub use memory::{EditorLoop, MemoryScene, NodeBlueprint, TickReport};

/// Crate version, as reported by the simulator.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
