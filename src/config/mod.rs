//! Configuration resolution: parsing the on-disk workflow config
//! document, cascading `defaults -> phase -> stage`, and validating it
//! against the provider registries.

mod resolve;
mod schema;
mod settings;

pub use resolve::{resolve, validate};
pub use schema::{PhaseConfigOverlay, StageConfig, StageConfigOverlay, WorkflowConfigDocument};
