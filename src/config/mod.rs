//! # Configuration
//!
//! Controller configuration loaded from the environment at start-up.

mod controller;

pub use controller::ControllerConfig;
