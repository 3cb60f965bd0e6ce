//! In-memory collaborators for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use crate::download::client::Fetch;
use crate::download::transcode::Transcoder;
use crate::error::{Error, Result};

/// Holds requests to matching URLs until the test releases them.
#[derive(Clone)]
pub struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Semaphore>,
    suffix: String,
}

/// Serves fixed bodies; unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// Block requests whose URL ends with `suffix` until released.
    pub fn gated(mut self, suffix: &str) -> (Self, Gate) {
        let gate = Gate {
            started: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
            suffix: suffix.to_string(),
        };
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().push(url.to_string());

        if let Some(gate) = &self.gate {
            if url.ends_with(&gate.suffix) {
                gate.started.notify_one();
                if let Ok(permit) = gate.release.acquire().await {
                    permit.forget();
                }
            }
        }

        self.bodies.get(url).cloned().ok_or_else(|| Error::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Writes the input bytes to the output path, or fails on demand.
#[derive(Default)]
pub struct RecordingTranscoder {
    pub fail: bool,
    pub calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        self.calls
            .lock()
            .push((input.to_path_buf(), output.to_path_buf()));
        if self.fail {
            return Err(Error::FFmpeg("conversion refused".to_string()));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// AES-128-CBC with PKCS#7 padding, the way HLS packagers encrypt segments.
pub fn encrypt_aes128(plain: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let mut buffer = vec![0u8; plain.len() + 16];
    buffer[..plain.len()].copy_from_slice(plain);
    cbc::Encryptor::<aes::Aes128>::new(key.into(), iv.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plain.len())
        .unwrap()
        .to_vec()
}
