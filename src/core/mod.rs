pub mod config;
pub mod defaults;
pub mod error;
pub mod job;
pub mod mode;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod reload;
pub mod run_log;
pub mod tools;
pub mod wrapper;

pub use error::{Error, ErrorCode, Result};
