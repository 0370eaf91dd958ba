//! Credential store backed by a TOML file.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Contents of `config.toml`.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Skedda login.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Stored Skedda login.
#[derive(Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CredentialsConfig {
    /// Login e-mail.
    #[serde(default)]
    pub username: String,
    /// Login password, stored in clear text.
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"*****")
            .finish()
    }
}

impl AppConfig {
    /// Reads the store; a missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Writes the store, creating its directory. On Unix the file is made
    /// readable by the owner only.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
        restrict_permissions(path)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict permissions of {}", path.display()))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_missing_file_is_empty_store() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();

        // Act
        let config = AppConfig::load(&dir.path().join("config.toml")).unwrap();

        // Assert
        assert_eq!(config, AppConfig::default());
        assert!(config.credentials.username.is_empty());
    }

    #[test]
    fn test_saved_credentials_are_reloaded() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skedda").join("config.toml");
        let config = AppConfig {
            credentials: CredentialsConfig {
                username: String::from("user@example.com"),
                password: String::from("s3cret"),
            },
        };

        // Act
        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(loaded, config);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        // Act
        AppConfig::default().save(&path).unwrap();

        // Assert
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_password_may_be_absent() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[credentials]\nusername = \"someone\"\n").unwrap();

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(config.credentials.username, "someone");
        assert!(config.credentials.password.is_empty());
    }

    #[test]
    fn test_malformed_file_fails() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "credentials = [").unwrap();

        // Act
        let err = AppConfig::load(&path).unwrap_err();

        // Assert
        assert!(err.to_string().starts_with("failed to parse"));
    }

    #[test]
    fn test_debug_masks_password() {
        // Arrange
        let creds = CredentialsConfig {
            username: String::from("user"),
            password: String::from("hunter2"),
        };

        // Act
        let debug = format!("{creds:?}");

        // Assert
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
