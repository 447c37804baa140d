//! The Tally binary: a statsd-compatible metrics aggregation daemon.
//!
//! Tally listens for the textual statsd protocol on UDP, aggregates counters, gauges, timers
//! and sets over a fixed interval, computes derived statistics, and hands each interval's
//! snapshot to the configured flush consumers.
//!
//! # Workspace Crates
//!
//! The implementation is split into the following workspace crates:
//!
//!  - `tally`: Main entry point and command line interface.
//!  - `tally-common`: Common utilities and types.
//!  - `tally-config`: Static configuration for the CLI and server.
//!  - `tally-log`: Logging facade and setup.
//!  - `tally-metrics`: Protocol codec and aggregation engine.
//!  - `tally-server`: UDP listener and flush consumers.

mod cli;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(error) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("error: {error:#}");
            }
            1
        }
    };

    process::exit(exit_code);
}
