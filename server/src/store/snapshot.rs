//! Bincode snapshot of the catalog tables

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::Tables;
use crate::error::StoreError;

/// Reads the snapshot at `path`. A missing file is not an error.
pub fn load(path: &Path) -> Result<Option<Tables>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(bincode::deserialize(&bytes)?))
}

/// Replaces the snapshot at `path`. The new content is written next to it
/// and renamed into place so a crash never leaves a half-written file.
pub fn save(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let bytes = bincode::serialize(tables)?;
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes)?;
    fs::rename(&staging, path)?;
    Ok(())
}
