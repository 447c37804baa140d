//! Logging facade for Tally.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The configuration
//! implements `serde` traits, so it can be obtained from configuration files.
//!
//! ```
//! let config = tally_log::LogConfig {
//!     format: tally_log::LogFormat::Simplified,
//!     ..Default::default()
//! };
//!
//! tally_log::init(&config);
//! ```
//!
//! # Logging
//!
//! The basic use of this crate is through the five logging macros: [`error!`], [`warn!`],
//! [`info!`], [`debug!`] and [`trace!`] where `error!` represents the highest-priority log
//! messages and `trace!` the lowest. Messages are filtered by configuring the log level to
//! exclude messages with a lower priority.
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text. Choose the log level according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information.

#![warn(missing_docs)]

mod setup;
pub use setup::*;

// Expose the minimal tracing facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};

/// Initializes logging for tests with output capture.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init_test() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}
