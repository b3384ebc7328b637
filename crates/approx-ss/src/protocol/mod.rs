//! Two-round recovery protocol among in-process parties.

/// Party actors.
pub mod party;
/// Quorums of parties.
pub mod quorum;
/// Orchestration of a full run.
pub mod run;
/// Run state machine.
pub mod state;

pub use party::{Party, Round1Output};
pub use quorum::Quorum;
pub use run::{run_once, ApproxRecovery, RunReport, SimulationMode, StageTimings};
pub use state::{RunState, Stage};
