//! Atomic JSON file operations.
//!
//! A thin layer for safe access to small JSON state files: writes go to a
//! temporary file which is fsynced and atomically renamed over the target,
//! so readers never observe a torn file.

use draftsmith_core::error::{DraftError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::PathBuf;

/// A handle to a JSON file with atomic update semantics.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// Returns `None` when the file does not exist or is empty.
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Saves data atomically: tmp file + fsync + rename.
    pub fn save(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(data)?;
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Removes the file; missing files are fine.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DraftError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn save_load_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicJsonFile::<Sample>::new(dir.path().join("nested").join("sample.json"));

        assert!(file.load().unwrap().is_none());

        let sample = Sample {
            name: "draft".to_string(),
            count: 2,
        };
        file.save(&sample).unwrap();
        assert_eq!(file.load().unwrap().unwrap(), sample);

        file.remove().unwrap();
        assert!(file.load().unwrap().is_none());
        // Removing twice stays fine.
        file.remove().unwrap();
    }
}
