//! Cross-request in-memory state backing the tier-2/tier-3 enrichment
//! analyzers (spec §3.3). Each structure is a `dashmap`-backed concurrent
//! map swept periodically by a background task; per spec §9 a sweeper is
//! never synchronized against hot readers, so a reader may observe an
//! entry that is about to be evicted.

pub mod company_rollup;
pub mod replay;
pub mod session;
pub mod witness;
