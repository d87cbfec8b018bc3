//! SDK configuration.
//!
//! Values are resolved per key from the process environment first, then from
//! the `.env` file in the project folder, then from built-in defaults. The
//! resolved [`Settings`] is immutable; build a [`crate::KonfuzioClient`] from
//! it once at startup and pass the client around.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Tracing target for configuration handling.
pub const TRACING_TARGET: &str = "konfuzio_sdk::settings";

/// Name of the configuration file written by `init`.
pub const ENV_FILE: &str = ".env";

pub const DEFAULT_HOST: &str = "https://app.konfuzio.com";
pub const DEFAULT_DATA_FOLDER: &str = "data";

pub const KEY_HOST: &str = "KONFUZIO_HOST";
pub const KEY_USER: &str = "KONFUZIO_USER";
pub const KEY_TOKEN: &str = "KONFUZIO_TOKEN";
pub const KEY_DATA_FOLDER: &str = "KONFUZIO_DATA_FOLDER";
pub const KEY_PROJECT_ID: &str = "KONFUZIO_PROJECT_ID";

/// Resolved SDK configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub user: Option<String>,
    pub token: Option<String>,
    pub data_folder: PathBuf,
    pub project_id: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user: None,
            token: None,
            data_folder: PathBuf::from(DEFAULT_DATA_FOLDER),
            project_id: None,
        }
    }
}

impl Settings {
    /// Load settings for the current working directory.
    pub fn from_env() -> Result<Self> {
        Self::load(Path::new("."))
    }

    /// Load settings using `<project_folder>/.env` as the file layer.
    pub fn load(project_folder: &Path) -> Result<Self> {
        let file = read_env_file(&project_folder.join(ENV_FILE))?;
        Self::resolve(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file.get(key).cloned())
        })
    }

    /// Build settings from a key lookup. Empty values count as unset.
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // A project id of -1 is how older configurations spelled "unset".
        let project_id = match get(KEY_PROJECT_ID) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id >= 0 => Some(id as u64),
                Ok(_) => None,
                Err(_) => {
                    return Err(Error::Config(format!(
                        "{KEY_PROJECT_ID} must be an integer, got {raw:?}"
                    )))
                }
            },
        };

        Ok(Self {
            host: get(KEY_HOST)
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            user: get(KEY_USER),
            token: get(KEY_TOKEN),
            data_folder: get(KEY_DATA_FOLDER)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FOLDER)),
            project_id,
        })
    }

    /// Return the configured project id or [`Error::MissingProjectId`].
    pub fn require_project_id(&self) -> Result<u64> {
        self.project_id.ok_or(Error::MissingProjectId)
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.is_file() {
        tracing::debug!(target: TRACING_TARGET, path = %path.display(), "No env file found");
        return Ok(HashMap::new());
    }
    let mut values = HashMap::new();
    let iter = dotenvy::from_path_iter(path).map_err(|e| Error::Config(e.to_string()))?;
    for item in iter {
        let (key, value) = item.map_err(|e| Error::Config(e.to_string()))?;
        values.insert(key, value);
    }
    tracing::debug!(
        target: TRACING_TARGET,
        path = %path.display(),
        keys = values.len(),
        "Loaded env file"
    );
    Ok(values)
}

/// Values written by `init` before a project is chosen.
#[derive(Debug)]
pub struct EnvFileContent<'a> {
    pub host: &'a str,
    pub user: &'a str,
    pub token: &'a str,
    pub data_folder: &'a str,
}

/// Write a fresh `.env` file, replacing any existing one.
pub fn write_env_file(project_folder: &Path, content: &EnvFileContent<'_>) -> Result<PathBuf> {
    let path = project_folder.join(ENV_FILE);
    let body = format!(
        "{KEY_HOST}={}\n{KEY_USER}={}\n{KEY_TOKEN}={}\n{KEY_DATA_FOLDER}={}\n",
        content.host, content.user, content.token, content.data_folder
    );
    fs::write(&path, body)?;
    tracing::info!(target: TRACING_TARGET, path = %path.display(), "Wrote env file");
    Ok(path)
}

/// Append the chosen project id to an existing `.env` file.
pub fn append_project_id(project_folder: &Path, project_id: u64) -> Result<()> {
    let path = project_folder.join(ENV_FILE);
    let mut file = OpenOptions::new().append(true).create(true).open(&path)?;
    writeln!(file, "{KEY_PROJECT_ID}={project_id}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::resolve(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(matches!(
            settings.require_project_id(),
            Err(Error::MissingProjectId)
        ));
    }

    #[test]
    fn resolves_values_and_trims_host() {
        let settings = Settings::resolve(lookup(&[
            (KEY_HOST, "https://konfuzio.example.com/"),
            (KEY_TOKEN, "abc"),
            (KEY_PROJECT_ID, "46"),
            (KEY_DATA_FOLDER, "docs"),
        ]))
        .unwrap();
        assert_eq!(settings.host, "https://konfuzio.example.com");
        assert_eq!(settings.token.as_deref(), Some("abc"));
        assert_eq!(settings.project_id, Some(46));
        assert_eq!(settings.data_folder, PathBuf::from("docs"));
    }

    #[test]
    fn negative_project_id_means_unset() {
        let settings = Settings::resolve(lookup(&[(KEY_PROJECT_ID, "-1")])).unwrap();
        assert_eq!(settings.project_id, None);
    }

    #[test]
    fn rejects_non_numeric_project_id() {
        let err = Settings::resolve(lookup(&[(KEY_PROJECT_ID, "abc")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn written_env_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        write_env_file(
            dir.path(),
            &EnvFileContent {
                host: "https://konfuzio.example.com",
                user: "someone@example.com",
                token: "secret-token",
                data_folder: "my_data",
            },
        )
        .unwrap();
        append_project_id(dir.path(), 7).unwrap();

        let file = read_env_file(&dir.path().join(ENV_FILE)).unwrap();
        assert_eq!(file.get(KEY_USER).map(String::as_str), Some("someone@example.com"));
        assert_eq!(file.get(KEY_TOKEN).map(String::as_str), Some("secret-token"));
        assert_eq!(file.get(KEY_PROJECT_ID).map(String::as_str), Some("7"));

        let settings = Settings::resolve(|key| file.get(key).cloned()).unwrap();
        assert_eq!(settings.project_id, Some(7));
        assert_eq!(settings.data_folder, PathBuf::from("my_data"));
    }

    #[test]
    fn missing_env_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_file(&dir.path().join(ENV_FILE)).unwrap().is_empty());
    }
}
