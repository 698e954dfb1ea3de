//! The edge's half of the same-host duplex stream (spec §4.3, §4.4): a
//! bounded drop-oldest queue feeding a single background writer, with a
//! failover writer as the fallback destination while the engine is
//! unreachable.

pub mod client;
pub mod failover;
