//! Seeded simulation of editor authoring sessions against the in-memory host.
//!
//! Every tick applies a batch of random authoring operations, lets the
//! [`prefab_proxy::EditorLoop`] run, and checks that the preview invariants
//! still hold.

pub mod simulator;

pub use simulator::{
    run_simulator, InvariantCheck, OperationStats, SimulatedOperation, Simulator, SimulatorConfig,
    SimulatorReport, Violation,
};
