use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{domain::UserId, errors::Error, Result};

/// Typed configuration for the relay bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub seed_admins: Vec<UserId>,

    // Storage
    pub data_dir: PathBuf,
    pub admin_file: PathBuf,

    // Logging
    pub log_level: String,
    pub log_path: PathBuf,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Required env vars
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| get("TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let seed_admins = parse_csv_i64(get("ADMIN_IDS"))
            .into_iter()
            .map(UserId)
            .collect();

        let data_dir = get("DATA_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let admin_file = get("ADMIN_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.json"));

        let log_level = get("LOG_LEVEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "info".to_string());
        let log_path = get("LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs.json"));

        Ok(Self {
            telegram_bot_token,
            seed_admins,
            data_dir,
            admin_file,
            log_level,
            log_path,
        })
    }

    /// Create the data directory and the parents of the admin and log files.
    ///
    /// Failures are returned rather than raised: the registry and the logger
    /// both have fallbacks, so startup continues without the directories.
    pub fn ensure_dirs(&self) -> Vec<(PathBuf, std::io::Error)> {
        let mut dirs = vec![self.data_dir.as_path()];
        dirs.extend(
            [self.admin_file.parent(), self.log_path.parent()]
                .into_iter()
                .flatten()
                .filter(|p| !p.as_os_str().is_empty()),
        );

        let mut failed = Vec::new();
        for dir in dirs {
            if let Err(e) = fs::create_dir_all(dir) {
                failed.push((dir.to_path_buf(), e));
            }
        }
        failed
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
