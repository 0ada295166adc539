//! Small persistent key-value store.
//!
//! Holds the gateway API key and the accessory pairing code across restarts.
//! The whole map is kept in memory and written to `bridge.json` on every change.

use crate::error::Result;
use log::{error, info, warn};
use parking_lot::RwLock;
use rand::Rng;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "bridge.json";

pub const API_KEY: &str = "deconz_api_key";
pub const PAIRING_CODE: &str = "pairing_code";

pub struct KvStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl KvStore {
    /// Open the store in `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(FILE_NAME);
        let values = load(&path);
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        save(&self.path, &values)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write();
        if values.remove(key).is_some() {
            save(&self.path, &values)?;
        }
        Ok(())
    }

    /// Stored pairing code, generating and persisting one on first use.
    pub fn pairing_code(&self) -> Result<String> {
        if let Some(code) = self.get(PAIRING_CODE) {
            return Ok(code);
        }
        let code = generate_pairing_code();
        self.set(PAIRING_CODE, &code)?;
        info!("Generated a new pairing code");
        Ok(code)
    }
}

fn load(path: &Path) -> BTreeMap<String, String> {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(values) => values,
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                BTreeMap::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No stored bridge state found (first run)");
            BTreeMap::new()
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

fn save(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
    let data = serde_json::to_vec_pretty(values)?;
    fs::write(path, data)?;
    Ok(())
}

/// Eight random digits, no leading zero.
pub fn generate_pairing_code() -> String {
    rand::thread_rng().gen_range(10_000_000u32..100_000_000).to_string()
}

/// `12345678` as `1234-5678` for display.
pub fn format_pairing_code(code: &str) -> String {
    if code.len() == 8 && code.is_ascii() {
        format!("{}-{}", &code[..4], &code[4..])
    } else {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        assert!(store.get(API_KEY).is_none());

        store.set(API_KEY, "83B7780291").unwrap();
        drop(store);

        let store = KvStore::open(dir.path()).unwrap();
        assert_eq!(store.get(API_KEY).as_deref(), Some("83B7780291"));

        store.remove(API_KEY).unwrap();
        assert!(KvStore::open(dir.path()).unwrap().get(API_KEY).is_none());
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = KvStore::open(&nested).unwrap();
        store.set("k", "v").unwrap();
        assert!(nested.join(FILE_NAME).exists());
        assert_eq!(store.path(), nested.join(FILE_NAME));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(FILE_NAME), "not json").unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        assert!(store.get(API_KEY).is_none());
    }

    #[test]
    fn test_pairing_code_is_stable() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let code = store.pairing_code().unwrap();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(store.pairing_code().unwrap(), code);

        let reopened = KvStore::open(dir.path()).unwrap();
        assert_eq!(reopened.pairing_code().unwrap(), code);
    }

    #[test]
    fn test_format_pairing_code() {
        assert_eq!(format_pairing_code("12345678"), "1234-5678");
        assert_eq!(format_pairing_code("123"), "123");
    }
}
