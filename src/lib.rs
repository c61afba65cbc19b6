pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod global;
pub mod jobs;
pub mod remote;

pub use error::{TrackerError, TrackerResult};
