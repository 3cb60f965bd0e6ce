//! AES-128 segment decryption.

use aes::Aes128;
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};

use crate::error::{Error, Result};
use crate::playlist::EncryptionMeta;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

const BLOCK_SIZE: usize = 16;

/// First byte of every MPEG-TS packet.
const TS_SYNC_BYTE: u8 = 0x47;

/// Decrypt a downloaded segment with its resolved key.
///
/// Without an IV in the playlist the key doubles as the IV. After the
/// padding is stripped, leading bytes before the first TS sync byte are
/// dropped. That realignment is a heuristic: when no sync byte exists the
/// depadded data is returned untouched.
pub fn decrypt_segment(data: &[u8], meta: &EncryptionMeta) -> Result<Vec<u8>> {
    let key: [u8; BLOCK_SIZE] = meta.key.as_slice().try_into().map_err(|_| {
        Error::Encryption(format!(
            "AES-128 key from {} must be {} bytes, got {}",
            meta.key_url,
            BLOCK_SIZE,
            meta.key.len()
        ))
    })?;

    let iv = if meta.iv.trim().is_empty() {
        key
    } else {
        parse_iv(&meta.iv)?
    };

    let plain = decrypt_aes128_cbc(data, &key, &iv)?;
    Ok(align_to_sync_byte(plain))
}

/// Decode an `IV` attribute: 32 hex digits with an optional `0x` prefix.
pub fn parse_iv(iv: &str) -> Result<[u8; BLOCK_SIZE]> {
    let trimmed = iv.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let mut out = [0u8; BLOCK_SIZE];
    hex::decode_to_slice(digits, &mut out)
        .map_err(|e| Error::Encryption(format!("IV {} is illegal, {}", iv, e)))?;
    Ok(out)
}

/// CBC-decrypt `data`, then drop as many trailing bytes as the last byte says.
pub fn decrypt_aes128_cbc(
    data: &[u8],
    key: &[u8; BLOCK_SIZE],
    iv: &[u8; BLOCK_SIZE],
) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::Encryption(format!(
            "Encrypted length {} is not a multiple of {}",
            data.len(),
            BLOCK_SIZE
        )));
    }

    let mut buffer = data.to_vec();
    let len = Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|e| Error::Encryption(format!("Decryption failed: {}", e)))?
        .len();
    buffer.truncate(len);

    strip_padding(&mut buffer);
    Ok(buffer)
}

/// Remove `N` trailing bytes where `N` is the value of the last byte.
fn strip_padding(buffer: &mut Vec<u8>) {
    if let Some(&pad) = buffer.last() {
        let keep = buffer.len().saturating_sub(pad as usize);
        buffer.truncate(keep);
    }
}

/// Drop anything before the first sync byte, if there is one.
pub fn align_to_sync_byte(mut data: Vec<u8>) -> Vec<u8> {
    if let Some(start) = data.iter().position(|&b| b == TS_SYNC_BYTE) {
        data.drain(..start);
    }
    data
}
