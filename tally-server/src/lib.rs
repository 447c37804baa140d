//! The Tally server: a UDP front for the aggregation engine and its flush consumers.

#![warn(missing_docs)]

use std::io;
use std::sync::Arc;

use tally_config::Config;
use tally_metrics::Collector;

mod console;
mod listener;
mod sampler;

pub use self::console::subscribe_console;
pub use self::listener::UdpListener;

/// Indicates failures of the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The tokio runtime could not be created.
    #[error("failed to create the runtime")]
    Runtime(#[source] io::Error),

    /// The UDP listener could not be bound.
    #[error("failed to bind the udp listener")]
    Bind(#[source] io::Error),
}

/// Runs the server until a shutdown signal is received.
///
/// This creates the runtime, wires the collector to its flush consumers, starts the periodic
/// flush, and serves the UDP listener.
pub fn run(config: Config) -> Result<(), ServerError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("tally")
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;

    runtime.block_on(async {
        let collector = Arc::new(Collector::new(config.collector.clone()));

        collector.register_on_flush_error(|error| {
            tally_log::error!("flush subscriber failed: {error}");
        });

        if config.console.enabled {
            subscribe_console(&collector);
        }

        collector.start_flush_timer();

        let listener = UdpListener::bind(config.listener.addr(), Arc::clone(&collector))
            .await
            .map_err(ServerError::Bind)?;

        if config.sampler.enabled {
            tokio::spawn(sampler::run(config.listener.port));
        }

        tokio::select! {
            _ = listener.run() => {}
            _ = tokio::signal::ctrl_c() => tally_log::info!("shutting down"),
        }

        Ok(())
    })
}
