use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::retriever::DEFAULT_PASS_COMMAND;
use crate::search::DEFAULT_MATCH_THRESHOLD;

const SETTINGS_FILE_NAME: &str = ".passtray.json";
const DEFAULT_STORE_DIR_NAME: &str = ".password-store";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store_dir: Option<PathBuf>,
    pub pass_command: String,
    // Placed before `show <route>`, e.g. `["--clip=0"]` for wrappers.
    pub pass_args: Vec<String>,
    pub match_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: None,
            pass_command: DEFAULT_PASS_COMMAND.to_string(),
            pass_args: Vec::new(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl Settings {
    pub fn settings_file_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(SETTINGS_FILE_NAME))
    }

    pub fn load() -> Self {
        let Some(path) = Self::settings_file_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("ignoring settings: {err:#}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn resolve_store_dir(&self) -> PathBuf {
        if let Some(dir) = &self.store_dir {
            return dir.clone();
        }
        if let Some(dir) = std::env::var_os("PASSWORD_STORE_DIR").filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        home_dir()
            .map(|home| home.join(DEFAULT_STORE_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR_NAME))
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        return std::env::var_os("USERPROFILE").map(PathBuf::from);
    }
    #[cfg(not(windows))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn test_root(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("passtray-config-{name}-{nonce}"))
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let root = test_root("partial");
        fs::create_dir_all(&root).expect("create dir");
        let path = root.join("settings.json");
        fs::write(&path, r#"{ "match_threshold": 1 }"#).expect("write settings");

        let settings = Settings::load_from(&path).expect("load");
        assert_eq!(settings.match_threshold, 1);
        assert_eq!(settings.pass_command, "pass");
        assert_eq!(settings.store_dir, None);
        assert!(settings.pass_args.is_empty());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn full_file_loads_every_field() {
        let root = test_root("full");
        fs::create_dir_all(&root).expect("create dir");
        let path = root.join("settings.json");
        let settings = Settings {
            store_dir: Some(root.join("store")),
            pass_command: "gopass".to_string(),
            pass_args: vec!["--yes".to_string()],
            match_threshold: 2,
        };
        let text = serde_json::to_string_pretty(&settings).expect("serialize");
        fs::write(&path, text).expect("write settings");
        assert_eq!(Settings::load_from(&path).expect("load"), settings);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let root = test_root("malformed");
        fs::create_dir_all(&root).expect("create dir");
        let path = root.join("settings.json");
        fs::write(&path, "{ not json").expect("write settings");

        let err = Settings::load_from(&path).expect_err("malformed");
        assert!(err.to_string().contains("failed to parse"));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn explicit_store_dir_wins() {
        let settings = Settings {
            store_dir: Some(PathBuf::from("/srv/secrets")),
            ..Settings::default()
        };
        assert_eq!(settings.resolve_store_dir(), PathBuf::from("/srv/secrets"));
    }
}
