//! User configuration options.

use crate::{BASE_DIR, CLIOptions};
use dirs::config_dir;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::{File, create_dir_all},
    io::Write,
    path::{Path, PathBuf},
};
use vis::{MAX_LEVEL, VisOptions};

const LOG_TAG: &str = "UserConfig";

fn get_cfg_file() -> Option<PathBuf> {
    let mut dir = config_dir()?;
    dir.push(BASE_DIR);
    if let Err(e) = create_dir_all(&dir) {
        warn!(target: LOG_TAG, "Couldn't create {dir:?}: {e}");
        return None;
    }
    dir.push("vis.toml");
    Some(dir)
}

/// Settings kept between runs. One-off switches such as `--fast` or
/// `--nostate` are not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub level: u8,
    pub threads: usize,
    pub visdist: f64,
    /// Seconds between checkpoint saves
    pub state_interval: u64,
}

impl Default for UserConfig {
    fn default() -> Self {
        let d = VisOptions::default();
        Self {
            level: MAX_LEVEL,
            threads: d.threads,
            visdist: d.visdist,
            state_interval: d.state_interval.as_secs(),
        }
    }
}

impl UserConfig {
    /// `load` reads the config, replacing it with defaults when missing or
    /// unreadable
    pub fn load() -> Self {
        match get_cfg_file() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!(target: LOG_TAG, "No user config dir, using defaults");
                Self::default()
            }
        }
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(buf) if !buf.is_empty() => match toml::from_str(&buf) {
                Ok(data) => {
                    info!(target: LOG_TAG, "Loaded user config file");
                    return data;
                }
                Err(e) => warn!("Could not deserialise {path:?} recreating config: {e}"),
            },
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not read {path:?} recreating config: {e}"),
        }
        let config = Self::default();
        info!("Created default user config file");
        config.write_to(path);
        config
    }

    pub fn write(&self) {
        if let Some(path) = get_cfg_file() {
            self.write_to(&path);
        }
    }

    fn write_to(&self, path: &Path) {
        let res = toml::to_string_pretty(self)
            .map_err(|e| e.to_string())
            .and_then(|data| {
                File::create(path)
                    .and_then(|mut f| f.write_all(data.as_bytes()))
                    .map_err(|e| e.to_string())
            });
        match res {
            Ok(()) => info!("Saved user config to {path:?}"),
            Err(err) => error!("Could not write config: {err}"),
        }
    }

    /// Sync the CLI options and UserOptions with each other
    pub fn sync_cli(&mut self, cli: &mut CLIOptions) {
        info!("Checking CLI options");

        if let Some(level) = cli.level {
            if level != self.level {
                self.level = level.min(MAX_LEVEL);
            }
        } else {
            cli.level = Some(self.level);
        }

        if let Some(threads) = cli.threads {
            if threads != self.threads {
                self.threads = threads;
            }
        } else {
            cli.threads = Some(self.threads);
        }

        if let Some(visdist) = cli.visdist {
            if visdist != self.visdist {
                self.visdist = visdist;
            }
        } else {
            cli.visdist = Some(self.visdist);
        }

        if let Some(secs) = cli.state_interval {
            if secs != self.state_interval {
                self.state_interval = secs;
            }
        } else {
            cli.state_interval = Some(self.state_interval);
        }
    }
}
