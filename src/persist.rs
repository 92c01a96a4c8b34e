//! JSON persistence behind advisory file locks.
//!
//! Every persisted artifact (DoF cache, entropy cache, count-index snapshot,
//! CI result log) goes through [`load_json`] and [`save_json`]. Writers hold
//! an exclusive `fs2` lock on a sidecar `<file>.lock` for the duration of the
//! write; readers hold a shared one. A missing file loads as `None`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn open_lock(path: &Path) -> Result<File> {
    let lock_path = lock_path(path);
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| Error::Io { path: lock_path, source })
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Loads a JSON document, or `None` if the file does not exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        debug!("load_json(path = {}): missing, cold start", path.display());
        return Ok(None);
    }

    let lock = open_lock(path)?;
    lock.lock_shared().map_err(io_error(path))?;

    let result = File::open(path).map_err(io_error(path)).and_then(|file| {
        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Serialization {
            path: path.to_path_buf(),
            source,
        })
    });

    lock.unlock().map_err(io_error(path))?;
    let value = result?;
    info!("Loaded {}", path.display());
    Ok(Some(value))
}

/// Writes `value` as JSON, creating parent directories as needed.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let lock = open_lock(path)?;
    lock.lock_exclusive().map_err(io_error(path))?;

    let result = File::create(path).map_err(io_error(path)).and_then(|file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value).map_err(|source| Error::Serialization {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(io_error(path))
    });

    lock.unlock().map_err(io_error(path))?;
    result?;
    info!("Saved {}", path.display());
    Ok(())
}
