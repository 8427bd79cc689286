//! KV staging store (C4): an ordered key-value map used purely as a
//! grouping primitive. `put` appends a value under a key; `get` returns
//! every value ever put under that key, in an order that is unspecified
//! across concurrent producers but stable once the load phase (C5) has
//! finished.
//!
//! Keys are the 8-char CNPJ base followed by a one-byte record-kind tag.
//! Internally each `put` is stored under `base || kind || seq`, where `seq`
//! is a monotonically increasing counter — this turns "append under key"
//! into a plain ordered insert, and `get` becomes a prefix scan over
//! `base || kind` that naturally returns values in append order.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{Result, TransformError};

/// One-byte kind tag identifying which enrichment fragment a KV value
/// holds (§4.4 / DESIGN.md).
pub const KIND_PARTNER: u8 = 0;
pub const KIND_ACTIVITY: u8 = 1;
pub const KIND_SIMPLES: u8 = 2;

fn prefix_key(base: &str, kind: u8) -> Vec<u8> {
    let mut k = Vec::with_capacity(base.len() + 1);
    k.extend_from_slice(base.as_bytes());
    k.push(kind);
    k
}

fn full_key(base: &str, kind: u8, seq: u64) -> Vec<u8> {
    let mut k = prefix_key(base, kind);
    k.extend_from_slice(&seq.to_be_bytes());
    k
}

/// Backend-agnostic contract every KV implementation honors (C4).
pub trait KvStore: Send + Sync {
    /// Appends `value` under `base || kind`. Safe to call concurrently;
    /// concurrent puts under the same key accumulate without clobbering
    /// each other.
    fn put(&self, base: &str, kind: u8, value: Vec<u8>) -> Result<()>;

    /// Returns every value put under `base || kind`, in an order that is
    /// stable once the load phase has completed. An unknown key returns an
    /// empty list rather than an error (C4's "missing key" is represented
    /// as an empty `Vec`, which is indistinguishable from "present but
    /// empty" by design — callers only care whether there is anything to
    /// merge).
    fn get(&self, base: &str, kind: u8) -> Result<Vec<Vec<u8>>>;

    /// Lazily-equivalent full scan of every key sharing `base_prefix`,
    /// grouped back into `(key, values)` pairs ordered by key.
    fn iter_prefix(&self, base_prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<Vec<u8>>)>>;

    /// Flushes buffered writes so a subsequent `get` from any thread is
    /// guaranteed to observe them. Called once the load phase (C5) has
    /// finished; the store remains open and readable afterwards — the
    /// export phase (C6) still needs it.
    fn flush(&self) -> Result<()>;

    /// Releases backend resources, discarding on-disk data where
    /// applicable. Called once after the export phase has consumed the
    /// store (§3: "destroyed on successful completion"), never before.
    fn close(&self) -> Result<()>;
}

/// Disk-spilling backend: an embedded ordered LSM store (`sled`), tuned for
/// a bulk sequential load phase followed by a read-only export phase.
pub struct SledStore {
    db: sled::Db,
    path: std::path::PathBuf,
    seq: AtomicU64,
}

impl SledStore {
    /// Opens (creating if needed) a sled database at `path`, configured
    /// for bulk loading: a large write cache and no per-write fsync, since
    /// durability is only required at `close`, not after every `put`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = sled::Config::new()
            .path(&path)
            .cache_capacity(256 * 1024 * 1024)
            .flush_every_ms(None)
            .open()
            .map_err(|e| TransformError::Kv(e.to_string()))?;
        Ok(Self { db, path, seq: AtomicU64::new(0) })
    }

    /// Opens a sled database in a fresh temporary directory, removed when
    /// the store is closed (the common case: the KV store exists only for
    /// the duration of one export run).
    pub fn open_temp() -> Result<Self> {
        let dir = std::env::temp_dir().join(format!("rfb-rs-kv-{}", uuid_like_suffix()));
        Self::open(dir)
    }
}

fn uuid_like_suffix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ (std::process::id() as u64) << 32
}

impl KvStore for SledStore {
    fn put(&self, base: &str, kind: u8, value: Vec<u8>) -> Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let key = full_key(base, kind, seq);
        self.db
            .insert(key, value)
            .map_err(|e| TransformError::Kv(e.to_string()))?;
        Ok(())
    }

    fn get(&self, base: &str, kind: u8) -> Result<Vec<Vec<u8>>> {
        let prefix = prefix_key(base, kind);
        let mut values = Vec::new();
        for entry in self.db.scan_prefix(&prefix) {
            let (_, v) = entry.map_err(|e| TransformError::Kv(e.to_string()))?;
            values.push(v.to_vec());
        }
        Ok(values)
    }

    fn iter_prefix(&self, base_prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<Vec<u8>>)>> {
        let mut grouped: Vec<(Vec<u8>, Vec<Vec<u8>>)> = Vec::new();
        for entry in self.db.scan_prefix(base_prefix) {
            let (k, v) = entry.map_err(|e| TransformError::Kv(e.to_string()))?;
            let key_prefix = &k[..k.len() - 8];
            match grouped.last_mut() {
                Some((last_key, values)) if last_key.as_slice() == key_prefix => {
                    values.push(v.to_vec());
                }
                _ => grouped.push((key_prefix.to_vec(), vec![v.to_vec()])),
            }
        }
        Ok(grouped)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush().map_err(|e| TransformError::Kv(e.to_string()))?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.db.flush().map_err(|e| TransformError::Kv(e.to_string()))?;
        let _ = std::fs::remove_dir_all(&self.path);
        Ok(())
    }
}

/// Memory-resident backend: a concurrent ordered map with identical
/// semantics, selected via `--high-memory` when the operator has enough
/// free RAM to hold the whole staging index.
#[derive(Default)]
pub struct HighMemoryStore {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    seq: AtomicU64,
}

impl HighMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for HighMemoryStore {
    fn put(&self, base: &str, kind: u8, value: Vec<u8>) -> Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let key = full_key(base, kind, seq);
        self.map.lock().unwrap().insert(key, value);
        Ok(())
    }

    fn get(&self, base: &str, kind: u8) -> Result<Vec<Vec<u8>>> {
        let prefix = prefix_key(base, kind);
        let map = self.map.lock().unwrap();
        Ok(map
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn iter_prefix(&self, base_prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<Vec<u8>>)>> {
        let map = self.map.lock().unwrap();
        let mut grouped: Vec<(Vec<u8>, Vec<Vec<u8>>)> = Vec::new();
        for (k, v) in map.range(base_prefix.to_vec()..) {
            if !k.starts_with(base_prefix) {
                break;
            }
            let key_prefix = &k[..k.len() - 8];
            match grouped.last_mut() {
                Some((last_key, values)) if last_key.as_slice() == key_prefix => {
                    values.push(v.clone());
                }
                _ => grouped.push((key_prefix.to_vec(), vec![v.clone()])),
            }
        }
        Ok(grouped)
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<S: KvStore>(store: &S) {
        store.put("00000001", KIND_PARTNER, b"a".to_vec()).unwrap();
        store.put("00000001", KIND_PARTNER, b"b".to_vec()).unwrap();
        store.put("00000001", KIND_SIMPLES, b"s".to_vec()).unwrap();
        store.put("00000002", KIND_PARTNER, b"c".to_vec()).unwrap();

        let partners = store.get("00000001", KIND_PARTNER).unwrap();
        assert_eq!(partners, vec![b"a".to_vec(), b"b".to_vec()]);

        let simples = store.get("00000001", KIND_SIMPLES).unwrap();
        assert_eq!(simples, vec![b"s".to_vec()]);

        let missing = store.get("99999999", KIND_PARTNER).unwrap();
        assert!(missing.is_empty());

        let other = store.get("00000002", KIND_PARTNER).unwrap();
        assert_eq!(other, vec![b"c".to_vec()]);
    }

    #[test]
    fn memory_backend_accumulates_under_key() {
        let store = HighMemoryStore::new();
        exercise(&store);
    }

    #[test]
    fn sled_backend_accumulates_under_key() {
        let store = SledStore::open_temp().unwrap();
        exercise(&store);
        store.close().unwrap();
    }

    #[test]
    fn backends_are_equivalent_for_the_same_puts() {
        let mem = HighMemoryStore::new();
        let disk = SledStore::open_temp().unwrap();
        for (base, kind, value) in [
            ("12345678", KIND_PARTNER, b"p1".to_vec()),
            ("12345678", KIND_PARTNER, b"p2".to_vec()),
            ("12345678", KIND_SIMPLES, b"tx".to_vec()),
        ] {
            mem.put(base, kind, value.clone()).unwrap();
            disk.put(base, kind, value).unwrap();
        }
        assert_eq!(
            mem.get("12345678", KIND_PARTNER).unwrap(),
            disk.get("12345678", KIND_PARTNER).unwrap()
        );
        disk.close().unwrap();
    }
}
