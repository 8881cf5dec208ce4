use std::env;
use std::fs;
use std::path::PathBuf;

use crate::predictor::{DEFAULT_FORM_WINDOW, DEFAULT_H2H_WINDOW, OutcomePredictor};

const DEFAULT_DB_FILE: &str = "virtual_football.db";
const SERVERLESS_DB_PATH: &str = "/tmp/virtual_football.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub form_window: usize,
    pub h2h_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            form_window: DEFAULT_FORM_WINDOW,
            h2h_window: DEFAULT_H2H_WINDOW,
        }
    }
}

impl AppConfig {
    /// Reads `VFOOTBALL_DB`, `VFOOTBALL_FORM_WINDOW` and
    /// `VFOOTBALL_H2H_WINDOW`. Without an explicit path the database falls
    /// back to `/tmp` on serverless hosts or when the working directory is
    /// read-only.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        match env::var("VFOOTBALL_DB") {
            Ok(path) if !path.trim().is_empty() => config.db_path = PathBuf::from(path.trim()),
            _ => {
                let serverless =
                    env::var_os("VERCEL").is_some() || env::var_os("VERCEL_ENV").is_some();
                config.db_path = default_db_path(serverless, cwd_writable());
            }
        }
        if let Some(n) = env_usize("VFOOTBALL_FORM_WINDOW") {
            config.form_window = n.max(1);
        }
        if let Some(n) = env_usize("VFOOTBALL_H2H_WINDOW") {
            config.h2h_window = n;
        }

        config
    }

    pub fn predictor(&self) -> OutcomePredictor {
        OutcomePredictor::new(self.form_window, self.h2h_window)
    }
}

fn default_db_path(serverless: bool, cwd_writable: bool) -> PathBuf {
    if serverless || !cwd_writable {
        PathBuf::from(SERVERLESS_DB_PATH)
    } else {
        PathBuf::from(DEFAULT_DB_FILE)
    }
}

fn cwd_writable() -> bool {
    fs::metadata(".")
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_falls_back_to_tmp() {
        assert_eq!(default_db_path(false, true), PathBuf::from(DEFAULT_DB_FILE));
        assert_eq!(default_db_path(true, true), PathBuf::from(SERVERLESS_DB_PATH));
        assert_eq!(default_db_path(false, false), PathBuf::from(SERVERLESS_DB_PATH));
    }

    #[test]
    fn predictor_keeps_at_least_one_form_match() {
        let config = AppConfig {
            form_window: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.predictor().form_window, 1);
        assert_eq!(AppConfig::default().predictor().h2h_window, DEFAULT_H2H_WINDOW);
    }
}
