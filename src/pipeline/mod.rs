pub mod approval;
pub mod dedup;
pub mod executor;
pub mod orchestrator;
pub mod phase;
pub mod state;
pub mod status;
pub mod target;

pub use approval::{Approval, CommandApprover, ConsoleApprover};
pub use dedup::LayerDeduplicator;
pub use executor::{Capabilities, ReconExecutor};
pub use orchestrator::{LayerOrchestrator, LayerResult};
pub use phase::ReconPhase;
pub use state::{Records, BASELINE_LAYER, DEFAULT_SLOTS};
pub use status::{CommandState, StatusTable};
pub use target::Target;
