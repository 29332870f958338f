pub mod arch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod optimization;
pub mod training;

pub use error::{Result, TrainerError};
