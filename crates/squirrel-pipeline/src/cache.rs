//! Cache of the last materialized replay, keyed by the log fingerprint.

use sha2::{Digest, Sha256};

use crate::replay::ReplayReport;

/// Content fingerprint of the log bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Holds the report of the last replay. A lookup only hits while the log
/// bytes still hash to the stored fingerprint; any controller mutation
/// changes the bytes and therefore misses. Rebuilt wholesale, never
/// incrementally.
#[derive(Debug, Default)]
pub struct TableCache {
    slot: Option<(String, ReplayReport)>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &str) -> Option<&ReplayReport> {
        match &self.slot {
            Some((key, report)) if key == fingerprint => Some(report),
            _ => None,
        }
    }

    pub fn put(&mut self, fingerprint: String, report: ReplayReport) {
        self.slot = Some((fingerprint, report));
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Log;
    use crate::replay::{ReplayOptions, replay};

    fn sample_report() -> ReplayReport {
        let log = Log::parse(&Log::boilerplate()).unwrap();
        replay(&log, ReplayOptions::default(), None)
    }

    #[test]
    fn test_hit_requires_matching_fingerprint() {
        let mut cache = TableCache::new();
        let fp = fingerprint(b"version 1");
        cache.put(fp.clone(), sample_report());
        assert!(cache.get(&fp).is_some());
        assert!(cache.get(&fingerprint(b"version 2")).is_none());
    }

    #[test]
    fn test_invalidate_clears_the_slot() {
        let mut cache = TableCache::new();
        let fp = fingerprint(b"bytes");
        cache.put(fp.clone(), sample_report());
        cache.invalidate();
        assert!(cache.get(&fp).is_none());
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let fp = fingerprint(b"abc");
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint(b"abc"));
    }
}
