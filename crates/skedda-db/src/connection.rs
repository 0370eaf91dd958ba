//! Cache database location and connection setup.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations::run_migrations;

/// Cache file name.
const DB_FILE: &str = "skedda.db";

/// How long a connection waits on a lock held by another `skedda` process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the directory that holds the cache file.
fn data_dir(dir: Option<&PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(d) => Ok(d.clone()),
        None => {
            let home = std::env::var_os("HOME").context("HOME environment variable is not set")?;
            Ok(PathBuf::from(home).join(".local").join("share").join("skedda"))
        }
    }
}

/// Opens the cache at `{dir}/skedda.db` (default dir
/// `~/.local/share/skedda`), creating the directory and schema on first use.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created or the
/// schema cannot be brought up to date.
pub fn open_db(dir: Option<&PathBuf>) -> Result<Connection> {
    let data_dir = data_dir(dir)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create directory {}", data_dir.display()))?;

    let path = data_dir.join(DB_FILE);
    tracing::debug!(path = %path.display(), "Opening cache database");
    let conn = Connection::open(&path)
        .with_context(|| format!("failed to open cache {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    run_migrations(&conn).context("cache schema migration failed")?;
    Ok(conn)
}
