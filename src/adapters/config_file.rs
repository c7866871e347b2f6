//! JSON configuration store.
//!
//! Implements [`ConfigProvider`] over a `config.json` file.
//!
//! - First start: a missing file is replaced by the default configuration,
//!   which is written out immediately.
//! - Validation: every config is checked with [`config::validate`] before
//!   it is persisted or applied.
//! - Atomic writes: the new content goes to `<path>.tmp` and is renamed
//!   over the old file.
//!
//! The engine reads through [`ConfigProvider::site`], which hands out the
//! current `Arc<Site>`; an `update` becomes visible on the next read.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigProvider};
use crate::config::{self, SystemConfig};
use crate::site::Site;

struct Loaded {
    config: Arc<SystemConfig>,
    site: Arc<Site>,
}

impl Loaded {
    fn new(config: SystemConfig) -> Self {
        let site = Arc::new(config.site());
        Self {
            config: Arc::new(config),
            site,
        }
    }
}

pub struct JsonConfigStore {
    path: PathBuf,
    current: RwLock<Loaded>,
    /// Serializes read-modify-write cycles.
    writer: Mutex<()>,
}

impl JsonConfigStore {
    /// Load `path`, creating it with defaults if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = match read_file(&path) {
            Ok(cfg) => {
                info!("Config loaded from {}", path.display());
                cfg
            }
            Err(ConfigError::NotFound) => {
                warn!("No config at {}, writing defaults", path.display());
                let cfg = SystemConfig::default();
                write_atomic(&path, &cfg)?;
                cfg
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            current: RwLock::new(Loaded::new(config)),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<SystemConfig> {
        let loaded = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&loaded.config)
    }

    /// Validate and persist `config`, then make it current.
    pub fn save(&self, config: SystemConfig) -> Result<(), ConfigError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.commit(config)
    }

    /// Apply `f` to a copy of the current config, then validate, persist
    /// and swap it in.  On error nothing changes, on disk or in memory.
    pub fn update<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut SystemConfig),
    {
        self.try_update(|cfg| {
            f(cfg);
            Ok(())
        })
    }

    /// Like [`update`](Self::update), but `f` may refuse the edit; its
    /// error is returned and nothing is written.
    pub fn try_update<F, T>(&self, f: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut SystemConfig) -> Result<T, ConfigError>,
    {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = SystemConfig::clone(&self.config());
        let value = f(&mut next)?;
        self.commit(next)?;
        Ok(value)
    }

    /// Re-read the file, replacing the in-memory config.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let config = read_file(&self.path)?;
        self.swap(config);
        info!("Config reloaded from {}", self.path.display());
        Ok(())
    }

    fn commit(&self, config: SystemConfig) -> Result<(), ConfigError> {
        config::validate(&config)?;
        write_atomic(&self.path, &config)?;
        self.swap(config);
        info!("Config saved to {}", self.path.display());
        Ok(())
    }

    fn swap(&self, config: SystemConfig) {
        let mut loaded = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *loaded = Loaded::new(config);
    }
}

impl ConfigProvider for JsonConfigStore {
    fn site(&self) -> Arc<Site> {
        let loaded = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&loaded.site)
    }
}

fn read_file(path: &Path) -> Result<SystemConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    let cfg: SystemConfig =
        serde_json::from_str(&text).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
    config::validate(&cfg)?;
    Ok(cfg)
}

fn write_atomic(path: &Path, cfg: &SystemConfig) -> Result<(), ConfigError> {
    let json =
        serde_json::to_vec_pretty(cfg).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(&json)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}
