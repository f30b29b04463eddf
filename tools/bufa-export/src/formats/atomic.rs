//! All-or-nothing buffer files

use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writer handed to buffer writers by [`write_atomic`]
pub type BufferWriter<'a> = BufWriter<&'a mut NamedTempFile>;

/// Write `path` through a temporary file in the same directory
///
/// The destination only appears once `write` succeeded and the data was
/// flushed. On failure the temporary file is removed and any existing file
/// at `path` is left untouched. Missing parent directories are created.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufferWriter<'_>) -> Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
    {
        let mut writer = BufWriter::new(&mut file);
        write(&mut writer).with_context(|| format!("Failed to write {:?}", path))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", path))?;
    }
    file.persist(path)
        .with_context(|| format!("Failed to move buffer into place: {:?}", path))?;

    tracing::debug!("Wrote {:?}", path);
    Ok(())
}
