//! CrystalFontz display host
//!
//! Configuration loading and the worker thread that owns a display for the
//! `cfontz_driver` binary. The protocol lives in `cfontz-transport`, the
//! drawing model in `cfontz-display`.

pub mod config;
pub mod worker;

pub use config::DisplayConfig;
pub use worker::{DisplayWorker, WorkerError, WorkerStatus};
