//! Byte-level concatenation of segment files.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Append every file in `sources`, in order, to `destination`.
///
/// The destination is opened in append mode and created if missing. Sources
/// are deleted after they are copied when `remove_sources` is set.
pub async fn merge_files(
    sources: &[PathBuf],
    destination: &Path,
    remove_sources: bool,
) -> Result<u64> {
    let mut output = OpenOptions::new()
        .create(true)
        .append(true)
        .open(destination)
        .await
        .map_err(|e| Error::filesystem(destination, e))?;

    let mut written = 0u64;
    for source in sources {
        let mut input = fs::File::open(source)
            .await
            .map_err(|e| Error::filesystem(source, e))?;
        written += tokio::io::copy(&mut input, &mut output)
            .await
            .map_err(|e| Error::filesystem(destination, e))?;
        drop(input);

        if remove_sources {
            fs::remove_file(source)
                .await
                .map_err(|e| Error::filesystem(source, e))?;
        }
    }

    output
        .flush()
        .await
        .map_err(|e| Error::filesystem(destination, e))?;

    tracing::info!(
        "Merged {} segment(s) into {} ({} bytes)",
        sources.len(),
        destination.display(),
        written
    );
    Ok(written)
}
