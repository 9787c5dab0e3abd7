//! ndtview - a terminal front-end for the Network Diagnostic Tool.
//!
//! The measurement itself is done by an external client behind the
//! [`backend::NdtBackend`] trait. This crate locates a server, starts the
//! client, polls its status text into a phase state machine and renders
//! gauges and results with ratatui.

pub mod app;
pub mod backend;
pub mod error;
pub mod gauge;
pub mod locator;
pub mod logging;
pub mod metrics;
pub mod phase;
pub mod poller;
pub mod results;
pub mod session;
pub mod settings;
pub mod simulate;
pub mod test_utils;
pub mod ui;

pub use error::{Error, Result};
