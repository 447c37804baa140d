//! Configuration for the Tally CLI and server.

#![warn(missing_docs)]

mod config;

pub use config::*;
