//! Plano render: turns a planogram configuration into positioned, scaled, paint-ordered
//! render instances for a drawing engine.

#![forbid(unsafe_code)]

pub mod config;
pub mod expand;
pub mod processor;
pub mod stage;
pub mod stages;

pub use config::{PipelineConfig, ShadowProfiles};
pub use expand::expand;
pub use processor::{PlanogramProcessor, ProcessedPlanogram, ProcessingError, ProcessingSummary};
pub use stage::{Stage, StageContext};
