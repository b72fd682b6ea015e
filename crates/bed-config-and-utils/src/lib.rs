//! Configuration, paths and logging setup shared by the best-efforts delivery crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, StorageType, DEFAULT_LOG_LEVEL, DEFAULT_MAX_DELIVERY_RETRIES, DEFAULT_POOL_MAX_SIZE,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
