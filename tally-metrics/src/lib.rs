//! Statsd-compatible metrics protocol and aggregation.
//!
//! This crate implements the core of the Tally daemon: a textual metrics protocol and an
//! in-memory aggregation engine that turns a high-rate stream of individual samples into
//! periodic, consistent snapshots with derived statistics.
//!
//! # Protocol
//!
//! Metrics are submitted as newline-separated lines of ASCII text, usually one UDP datagram per
//! packet:
//!
//! ```text
//! <key>:<value>|<type>[|@<sample rate>]
//! ```
//!
//! The type tag selects the aggregation:
//!
//!  - `c`: a counter. The value is a signed integer delta, accumulated over the interval.
//!  - `g`: a gauge. The value replaces the previous one; with an explicit `+` or `-` prefix and
//!    a previously known value, it is applied as a delta instead.
//!  - `ms`: a timer. The value is a non-negative duration; all values of an interval are kept
//!    and summarized into percentiles, mean, median and standard deviation at flush time.
//!  - `s`: a set. The value is an arbitrary string; the interval reports the number of unique
//!    values observed.
//!
//! The optional sample rate describes the fraction of true events that were actually submitted.
//! Counter and timer counts are extrapolated by its inverse, so `api.hits:2|c|@0.1` accumulates
//! `20`.
//!
//! See [`Sample`] for parsing single lines and [`Sample::parse_all`] for whole packets.
//!
//! # Aggregation
//!
//! The [`Collector`] owns the mutable per-interval state. Any number of threads feed it through
//! [`Collector::handle`] or the typed ingestion operations while a periodic flush turns the
//! accumulated state into an immutable [`Snapshot`], computes derived statistics, and hands the
//! result to registered flush subscribers. See the [`Collector`] docs for the locking and hook
//! semantics.

#![warn(missing_docs)]

mod collector;
mod protocol;
mod snapshot;
mod statistics;

pub use self::collector::*;
pub use self::protocol::*;
pub use self::snapshot::*;
pub use self::statistics::*;
