pub mod config;
pub mod ids;
pub mod types;

pub use config::{EventWeights, FestConfig, SchedulerConfig, SchedulerSection, ServerConfig};
pub use ids::{new_id, or_new_id};
pub use types::*;
