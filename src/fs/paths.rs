//! Output directory and file layout.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Where a job writes its files.
///
/// Segments are `{dir}/{prefix}_{index}.ts`, the merged file is
/// `{dir}/{prefix}.ts` and the converted file `{dir}/{prefix}.mp4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    directory: PathBuf,
    prefix: String,
}

impl OutputLayout {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}_{}.ts", self.prefix, index))
    }

    pub fn merged_path(&self) -> PathBuf {
        self.directory.join(format!("{}.ts", self.prefix))
    }

    pub fn converted_path(&self) -> PathBuf {
        self.directory.join(format!("{}.mp4", self.prefix))
    }
}

/// Ensure a directory exists, creating it if necessary.
///
/// Fails if the path exists but is not a directory.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::filesystem(path, "exists, but is not a directory")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| Error::filesystem(path, e)),
        Err(e) => Err(Error::filesystem(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_names() {
        let layout = OutputLayout::new("/downloads", "movie");
        assert_eq!(layout.segment_path(7), PathBuf::from("/downloads/movie_7.ts"));
        assert_eq!(layout.merged_path(), PathBuf::from("/downloads/movie.ts"));
        assert_eq!(layout.converted_path(), PathBuf::from("/downloads/movie.mp4"));
    }

    #[tokio::test]
    async fn test_ensure_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).await.unwrap();

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ensure_dir(&file).await,
            Err(Error::Filesystem { .. })
        ));
    }
}
