pub mod init_config;
pub mod replay;
pub mod thresholds;

pub use init_config::InitConfigCommand;
pub use replay::{ReplayCommand, ReplayReport, Scenario, ScenarioStep, StepOutcome};
pub use thresholds::ThresholdsCommand;
