pub mod bridge;
pub mod cli;
pub mod composer;
pub mod config;
pub mod logging;
pub mod model_cache;
pub mod session;
pub mod telemetry;
pub mod wrapper;

pub use config::{Catalog, CatalogError, ConfigurationSpec, ValidationError};
pub use model_cache::ModelCache;
pub use session::{RobotStepRecord, Session, SessionError, SessionManager, SessionSnapshot, StepReport};
pub use wrapper::ControlWrapper;
