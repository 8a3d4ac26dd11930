//! In-memory reference host.
//!
//! [`MemoryScene`] implements every host trait over a `petgraph` hierarchy;
//! [`EditorLoop`] ticks a [`crate::ProxyRuntime`] against it.

mod editor_loop;
mod scene;

pub use editor_loop::{EditorLoop, TickReport};
pub use scene::{MemoryScene, NodeBlueprint};
