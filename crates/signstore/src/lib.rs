//! Sign Store: the only durable state the core owns.
//!
//! Persists, per symbol, the sign of the funding differential and of the
//! price differential observed at the moment a paired position was opened,
//! so the evaluator can later detect reversal even across restarts.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use funding_arb_core::SignRecord;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SignStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type SignMap = HashMap<String, SignRecord>;

/// Atomic (write-temp + rename) JSON-backed map of symbol -> [`SignRecord`].
///
/// Every mutation persists synchronously before returning, so a crash
/// immediately after a successful `set`/`clear` call never loses the
/// write and never leaves a truncated file on disk.
#[derive(Debug)]
pub struct SignStore {
    path: PathBuf,
    signs: RwLock<SignMap>,
}

impl SignStore {
    /// Opens (or initializes) the store at `path`, loading any existing
    /// state. A missing file starts empty; a corrupt file is logged and
    /// discarded — the store never fails to construct.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let signs = load(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "sign store file unreadable, starting empty");
            HashMap::new()
        });
        Self {
            path,
            signs: RwLock::new(signs),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the backing file, replacing in-memory state. Exposed so
    /// callers that share a file across processes can force a refresh;
    /// the constructor already loads once.
    pub fn reload(&self) -> Result<(), SignStoreError> {
        let loaded = load(&self.path)?;
        *self.signs.write().expect("sign store lock poisoned") = loaded;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<SignRecord> {
        self.signs.read().expect("sign store lock poisoned").get(symbol).copied()
    }

    pub fn set(&self, symbol: &str, funding_sign: i8, price_sign: i8) -> Result<(), SignStoreError> {
        let record = SignRecord::new(funding_sign, price_sign);
        let mut guard = self.signs.write().expect("sign store lock poisoned");
        guard.insert(symbol.to_string(), record);
        persist(&self.path, &guard)?;
        debug!(symbol, funding_sign, price_sign, "sign store: upserted");
        Ok(())
    }

    /// Records the price sign of an existing record, but only if none is
    /// recorded yet; an already-recorded price sign is never overwritten.
    /// Used for the lazy price-sign capture on the first close evaluation
    /// that observes one for a record written with only a funding sign.
    pub fn set_price_sign(&self, symbol: &str, price_sign: i8) -> Result<(), SignStoreError> {
        let mut guard = self.signs.write().expect("sign store lock poisoned");
        if let Some(existing) = guard.get_mut(symbol) {
            if existing.price_sign.is_none() {
                existing.price_sign = Some(price_sign);
                persist(&self.path, &guard)?;
            }
        }
        Ok(())
    }

    /// Records a symbol with only the funding sign known, leaving the
    /// price sign to be lazily captured later.
    pub fn set_funding_only(&self, symbol: &str, funding_sign: i8) -> Result<(), SignStoreError> {
        let record = SignRecord::funding_only(funding_sign);
        let mut guard = self.signs.write().expect("sign store lock poisoned");
        guard.insert(symbol.to_string(), record);
        persist(&self.path, &guard)?;
        debug!(symbol, funding_sign, "sign store: upserted funding-only record");
        Ok(())
    }

    pub fn clear(&self, symbol: &str) -> Result<(), SignStoreError> {
        let mut guard = self.signs.write().expect("sign store lock poisoned");
        guard.remove(symbol);
        persist(&self.path, &guard)?;
        debug!(symbol, "sign store: cleared");
        Ok(())
    }

    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.signs.read().expect("sign store lock poisoned").keys().cloned().collect()
    }
}

fn load(path: &Path) -> Result<SignMap, SignStoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let map = serde_json::from_reader(reader)?;
    Ok(map)
}

fn persist(path: &Path, map: &SignMap) -> Result<(), SignStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = tmp_path_for(path);
    {
        let file = File::create(&tmp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, map)?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
