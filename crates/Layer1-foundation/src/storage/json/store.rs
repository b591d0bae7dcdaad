//! JSON 설정 파일 저장소
//!
//! `audit.json` 한 파일을 글로벌(~/.config/trail) 또는 프로젝트(.trail)
//! 디렉토리에서 읽고 씁니다.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "trail";
const PROJECT_DIR: &str = ".trail";

/// Directory holding Trail's JSON config files
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// `<config dir>/trail/`
    pub fn global() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?;
        Ok(Self {
            dir: config_dir.join(APP_DIR),
        })
    }

    /// `<root>/.trail/`
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(PROJECT_DIR),
        }
    }

    /// `.trail/` under the working directory
    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))?;
        Ok(Self::project(cwd))
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).exists()
    }

    /// Parsed file contents, or `None` when the file is absent.
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", path.display(), e)))
    }

    /// Write `data` as pretty JSON, creating the directory if needed.
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Config(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.file_path(filename);
        let content = serde_json::to_string_pretty(data)?;
        std::fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());

        assert!(store.load_optional::<Sample>("sample.json").unwrap().is_none());

        let sample = Sample {
            name: "trail".to_string(),
        };
        store.save("sample.json", &sample).unwrap();

        assert!(store.exists("sample.json"));
        assert!(store.file_path("sample.json").starts_with(dir.path().join(".trail")));
        assert_eq!(store.load_optional::<Sample>("sample.json").unwrap(), Some(sample));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());
        store.save("bad.json", &"placeholder").unwrap();
        std::fs::write(store.file_path("bad.json"), "{ not json").unwrap();

        let err = store.load_optional::<Sample>("bad.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
