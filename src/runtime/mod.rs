//! # Runtime
//!
//! Process start-up and the controller loops.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server and Kubernetes client
//! - `watch_loop`: One `Controller` per managed kind, run until shutdown
//! - `error_policy`: Requeue delay after a failed reconcile

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
