pub mod error;
pub mod executor;
pub mod types;

pub use error::{NodeError, NodeResult};
pub use executor::NodeExecutor;
