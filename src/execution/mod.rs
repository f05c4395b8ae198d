//! Fragment gating and execution
//!
//! [`CodeGate`] decides whether a fragment runs. [`Executor`] runs it on a
//! [`SimulationRuntime`] obtained from the process-wide [`EngineHandle`],
//! then feeds the evidence back into the session.

pub mod engine;
pub mod environment;
pub mod executor;
pub mod gate;
pub mod outcome;
pub mod python;
pub mod runtime;
pub mod scripted;

pub use engine::{EngineHandle, EngineProbe};
pub use environment::ExecutionEnvironment;
pub use executor::Executor;
pub use gate::{CodeGate, GateDecision, GatePolicy};
pub use outcome::{EvidenceAuthority, ExecutionOutcome, StageEvidence};
pub use python::PythonRuntime;
pub use runtime::{RawExecution, RuntimeInfo, SimulationRuntime};
pub use scripted::ScriptedRuntime;
