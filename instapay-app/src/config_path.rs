use std::path::PathBuf;

use dirs::{download_dir, home_dir};

use crate::error::InstapayError;

pub const ENV_DATA_DIR: &str = "INSTAPAY_DATA_DIR";
pub const ENV_DOWNLOAD_DIR: &str = "INSTAPAY_DOWNLOAD_DIR";

/// Returns the directory holding the local payment history.
///
/// The directory is taken from the `INSTAPAY_DATA_DIR` environment variable. If the variable is
/// not set, a `.instapay` directory in the user's home directory is used. The directory is
/// created when missing.
///
/// # Examples
///
/// ```no_run
/// let dir = instapay_app::config_path::data_dir().expect("data dir");
/// println!("History directory: {}", dir.display());
/// ```
pub fn data_dir() -> Result<PathBuf, InstapayError> {
    let dir = match std::env::var(ENV_DATA_DIR) {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => home_dir()
            .ok_or_else(|| InstapayError::StorageUnavailable("home dir not found".to_owned()))?
            .join(".instapay"),
    };

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Where fallback downloads land: `INSTAPAY_DOWNLOAD_DIR`, the platform download directory, or
/// the data directory, in that order.
pub fn download_dir_or_default() -> Result<PathBuf, InstapayError> {
    match std::env::var(ENV_DOWNLOAD_DIR) {
        Ok(dir) => Ok(PathBuf::from(dir)),
        Err(_) => match download_dir() {
            Some(dir) => Ok(dir),
            None => data_dir(),
        },
    }
}
