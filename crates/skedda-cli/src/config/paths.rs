//! Location of the credential store.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// File name of the credential store.
const CONFIG_FILE: &str = "config.toml";

/// Returns `{dir}/config.toml`, or `~/.config/skedda/config.toml` without
/// `--dir`.
///
/// # Errors
///
/// Returns an error if `HOME` is unset and no `dir` was given.
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    let base = match dir {
        Some(d) => d.clone(),
        None => {
            let home = std::env::var_os("HOME").context("HOME environment variable is not set")?;
            PathBuf::from(home).join(".config").join("skedda")
        }
    };
    Ok(base.join(CONFIG_FILE))
}
