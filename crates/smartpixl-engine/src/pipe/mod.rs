//! The engine's half of the same-host duplex stream (spec §4.5): an
//! accept loop with one reader task per connection feeding a shared
//! bounded ingest queue, plus a start-up/periodic catch-up service that
//! drains any failover `.jsonl` files the edge left behind.

pub mod catchup;
pub mod server;
