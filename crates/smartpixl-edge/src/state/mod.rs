//! In-memory state backing the fast-enrichment bank (spec §3.2). Every
//! structure here is a concurrent map swept periodically by a background
//! task rather than synchronized against hot readers (spec §9: "do not
//! attempt to synchronize sweeper against hot readers").

pub mod datacenter_trie;
pub mod fingerprint_history;
pub mod geo_cache;
pub mod hit_log;
pub mod ip_velocity;
