//!
//! Session state store
//! -------------------
//! Tracks which tables exist in one session's catalog namespace, which of them is
//! the "latest" (the implicit subject of FROM-less inputs), and which uploaded
//! source the session was built from.
//!
//! The store is only mutated after the catalog has confirmed an outcome; the
//! statement rewriter reads it but never writes to it.

use serde::Serialize;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Identity of the uploaded source a session was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DatasetIdentity {
    pub name: String,
    pub fingerprint: String,
}

impl DatasetIdentity {
    pub fn new(name: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self { name: name.into(), fingerprint: fingerprint.into() }
    }

    /// File name plus an xxh3 digest of the bytes.
    pub fn of_bytes(name: &str, bytes: &[u8]) -> Self {
        Self { name: name.to_string(), fingerprint: format!("{:016x}", xxh3_64(bytes)) }
    }
}

/// What callers render: the latest table and the active set (sorted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablesSnapshot {
    pub latest_table: Option<String>,
    pub active_tables: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    // Active tables in creation order; the last entry is the latest table.
    tables: Vec<String>,
    dataset_identity: Option<DatasetIdentity>,
}

impl Session {
    pub fn new() -> Self { Self::default() }

    /// Clear all tables and adopt `identity` as the current dataset.
    pub fn reset(&mut self, identity: Option<DatasetIdentity>) {
        debug!(target: "sqlchat::session", "reset: dropping {} table(s); dataset={:?}", self.tables.len(), identity.as_ref().map(|d| d.name.as_str()));
        self.tables.clear();
        self.dataset_identity = identity;
    }

    /// Record a confirmed catalog outcome for `name`.
    ///
    /// Re-recording an existing name keeps a single entry and makes it the latest.
    pub fn record_table_outcome(&mut self, name: &str, did_create_or_replace: bool) {
        if !did_create_or_replace { return; }
        if self.tables.last().map(|t| t == name).unwrap_or(false) { return; }
        self.tables.retain(|t| t != name);
        self.tables.push(name.to_string());
        debug!(target: "sqlchat::session", "record_table_outcome: latest='{}' active={}", name, self.tables.len());
    }

    /// Record a confirmed drop. The latest pointer falls back to the most recent
    /// remaining table.
    pub fn record_table_dropped(&mut self, name: &str) {
        let before = self.tables.len();
        self.tables.retain(|t| t != name);
        if self.tables.len() != before {
            debug!(target: "sqlchat::session", "record_table_dropped: '{}' latest={:?}", name, self.latest_table());
        }
    }

    pub fn is_known_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t == name)
    }

    pub fn latest_table(&self) -> Option<&str> {
        self.tables.last().map(|s| s.as_str())
    }

    pub fn active_tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|s| s.as_str())
    }

    pub fn dataset_identity(&self) -> Option<&DatasetIdentity> {
        self.dataset_identity.as_ref()
    }

    pub fn snapshot(&self) -> TablesSnapshot {
        let mut active_tables = self.tables.clone();
        active_tables.sort();
        TablesSnapshot { latest_table: self.latest_table().map(str::to_string), active_tables }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_empty() {
        let s = Session::new();
        assert_eq!(s.latest_table(), None);
        assert_eq!(s.active_tables().count(), 0);
        assert!(s.dataset_identity().is_none());
    }

    #[test]
    fn record_outcome_sets_latest_and_is_idempotent() {
        let mut s = Session::new();
        s.record_table_outcome("tbl", true);
        s.record_table_outcome("big", true);
        s.record_table_outcome("big", true);
        assert_eq!(s.latest_table(), Some("big"));
        assert_eq!(s.active_tables().count(), 2);
        assert!(s.is_known_table("tbl"));
        assert!(!s.is_known_table("TBL"));
    }

    #[test]
    fn recreating_older_table_makes_it_latest() {
        let mut s = Session::new();
        s.record_table_outcome("a", true);
        s.record_table_outcome("b", true);
        s.record_table_outcome("a", true);
        assert_eq!(s.latest_table(), Some("a"));
        assert_eq!(s.snapshot().active_tables, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn outcome_without_creation_is_ignored() {
        let mut s = Session::new();
        s.record_table_outcome("tbl", false);
        assert_eq!(s.latest_table(), None);
    }

    #[test]
    fn reset_clears_tables_and_swaps_identity() {
        let mut s = Session::new();
        s.reset(Some(DatasetIdentity::of_bytes("a.csv", b"x\n1\n")));
        s.record_table_outcome("tbl", true);
        s.reset(Some(DatasetIdentity::of_bytes("b.csv", b"y\n2\n")));
        assert_eq!(s.latest_table(), None);
        assert_eq!(s.active_tables().count(), 0);
        assert_eq!(s.dataset_identity().map(|d| d.name.as_str()), Some("b.csv"));
        s.reset(None);
        assert!(s.dataset_identity().is_none());
    }

    #[test]
    fn dropping_latest_falls_back_to_previous() {
        let mut s = Session::new();
        s.record_table_outcome("tbl", true);
        s.record_table_outcome("big", true);
        s.record_table_dropped("big");
        assert_eq!(s.latest_table(), Some("tbl"));
        s.record_table_dropped("tbl");
        assert_eq!(s.latest_table(), None);
        s.record_table_dropped("missing");
        assert_eq!(s.active_tables().count(), 0);
    }

    #[test]
    fn identical_bytes_share_identity() {
        let a = DatasetIdentity::of_bytes("d.csv", b"a,b\n1,2\n");
        let b = DatasetIdentity::of_bytes("d.csv", b"a,b\n1,2\n");
        let c = DatasetIdentity::of_bytes("d.csv", b"a,b\n1,3\n");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.fingerprint.len(), 16);
    }
}
