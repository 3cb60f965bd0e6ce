//! Container conversion through an external ffmpeg binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Lines of ffmpeg stderr kept in a failure message.
const STDERR_TAIL_LINES: usize = 5;

/// Remux a merged transport stream into another container.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// The system `ffmpeg`, copying audio and video streams into MP4.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `ffmpeg` on the PATH, failing with [`Error::FFmpegNotFound`].
    pub async fn locate() -> Result<Self> {
        let ffmpeg = Self::default();
        ffmpeg.probe().await?;
        Ok(ffmpeg)
    }

    /// Run `ffmpeg -version` to check the binary is usable.
    pub async fn probe(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(Error::FFmpeg(format!(
                "{} -version exited with status: {}",
                self.program.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        if let Some(first) = version.lines().next() {
            tracing::debug!("{}", first);
        }
        Ok(())
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FFmpegNotFound
        } else {
            Error::FFmpeg(format!("Failed to run {}: {}", self.program.display(), e))
        }
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        tracing::info!("Converting {} -> {}", input.display(), output.display());

        let result = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-acodec", "copy", "-vcodec", "copy", "-f", "mp4"])
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::FFmpeg(format!(
                "ffmpeg exited with status: {}\n{}",
                result.status,
                stderr_tail(&stderr)
            )));
        }

        Ok(())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
