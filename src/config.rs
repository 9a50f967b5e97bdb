//! Logger configuration.
//!
//! Loaded from `~/.webauthn-logger/config.toml`. Every key is optional; a
//! missing file means defaults.
//!
//! The store path is resolved through a chain:
//!
//! 1. `--store <path>`, an explicit per-command override
//! 2. `WEBAUTHN_LOGGER_STORE` env var
//! 3. `store-path` in the config file
//! 4. `~/.webauthn-logger/logs.json`

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::{Deserialize, Serialize};

use crate::inject::{DEFAULT_REINJECT_DELAY, Injector};
use crate::serialize::{MAX_DEPTH, Serializer};
use crate::storage::{DEFAULT_CAPACITY, FileStore};

/// Environment variable overriding the store path.
pub const STORE_ENV: &str = "WEBAUTHN_LOGGER_STORE";

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Where the log document lives.
    pub store_path: Option<PathBuf>,

    /// Retention cap for the log.
    pub capacity: usize,

    /// Serializer recursion cap.
    pub max_depth: usize,

    /// Wait after a client-side navigation before re-injecting.
    pub reinject_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            capacity: DEFAULT_CAPACITY,
            max_depth: MAX_DEPTH,
            reinject_delay_ms: u64::try_from(DEFAULT_REINJECT_DELAY.as_millis()).unwrap_or(100),
        }
    }
}

impl Config {
    /// Load config from `~/.webauthn-logger/config.toml`, or defaults.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if config.capacity == 0 {
            return Err(format!(
                "capacity must be at least 1 in {}",
                path.display()
            ));
        }

        Ok(config)
    }

    /// The config file path: `~/.webauthn-logger/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".webauthn-logger").join("config.toml"))
    }

    pub fn reinject_delay(&self) -> Duration {
        Duration::from_millis(self.reinject_delay_ms)
    }

    /// A serializer honoring `max-depth`.
    pub fn serializer(&self) -> Serializer {
        Serializer::with_max_depth(self.max_depth)
    }

    /// An injector honoring `reinject-delay-ms`.
    pub fn injector(&self) -> Injector {
        Injector::new(self.reinject_delay())
    }

    /// Resolve the store path from the chain in the module docs.
    pub fn resolve_store_path(&self, explicit: Option<&Path>) -> Result<PathBuf, String> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        if let Ok(path) = env::var(STORE_ENV)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }

        FileStore::default_path().ok_or_else(|| "could not determine home directory".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.reinject_delay(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "capacity = 50\nstore-path = \"/tmp/logs.json\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.capacity, 50);
        assert_eq!(config.max_depth, MAX_DEPTH);
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/logs.json")));
    }

    #[test]
    fn max_depth_reaches_the_serializer() {
        use serde_json::json;

        use crate::model::HostValue;
        use crate::serialize::MAX_DEPTH_MARKER;

        let config = Config {
            max_depth: 0,
            ..Config::default()
        };
        let value = HostValue::object([("nested", HostValue::object::<&str>([]))]);
        assert_eq!(
            config.serializer().serialize(&value),
            json!({ "nested": MAX_DEPTH_MARKER })
        );
    }

    #[test]
    fn reinject_delay_reaches_the_injector() {
        use std::cell::RefCell;
        use std::time::Instant;

        use crate::inject::{Page, ReadyState};
        use crate::intercept::Location;

        struct Spa(RefCell<String>);

        impl Location for Spa {
            fn href(&self) -> String {
                self.0.borrow().clone()
            }
        }

        impl Page for Spa {
            fn ready_state(&self) -> ReadyState {
                ReadyState::Complete
            }

            fn inject_script(&self) -> Result<(), String> {
                Ok(())
            }
        }

        let config = Config {
            reinject_delay_ms: 250,
            ..Config::default()
        };
        let page = Spa(RefCell::new("https://example.com/".into()));
        let mut injector = config.injector();
        injector.start(&page);

        let now = Instant::now();
        *page.0.borrow_mut() = "https://example.com/next".into();
        injector.on_mutation(&page, now);

        assert_eq!(injector.next_due(), Some(now + Duration::from_millis(250)));
        assert!(!injector.poll(&page, now + Duration::from_millis(100)));
        assert!(injector.poll(&page, now + Duration::from_millis(250)));
        assert_eq!(injector.injections(), 2);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "capacity = 0\n").unwrap();

        assert!(Config::load_from(&path).unwrap_err().contains("capacity"));
    }

    #[test]
    fn explicit_store_path_wins() {
        // Explicit path is returned before the env or config are consulted.
        let config = Config {
            store_path: Some(PathBuf::from("/from/config.json")),
            ..Config::default()
        };
        let path = config
            .resolve_store_path(Some(Path::new("/explicit.json")))
            .unwrap();
        assert_eq!(path, PathBuf::from("/explicit.json"));
    }
}
