//! Frame and record codec
//!
//! A frame on disk is `[u32 LE length][nonce || ciphertext || tag]`. The
//! plaintext of each frame is one JSON-encoded [`Record`].

use std::io::{self, Read};

use cachet_crypto::{decrypt, encrypt, CryptoError, DerivedKey, NONCE_SIZE, TAG_SIZE};
use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

/// Bytes of the length prefix in front of every sealed frame
pub(crate) const LEN_PREFIX: u64 = 4;

/// Upper bound for one sealed frame. No writer produces a larger one.
pub(crate) const MAX_FRAME: u32 = 512 * 1024 * 1024;

/// Largest file content a single entry can hold.
///
/// Base64 inside the JSON record grows content by 4/3; the rest of the
/// frame budget covers the path, the other fields and the AEAD overhead.
pub const MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

const _: () = assert!((MAX_ENTRY_SIZE + 2) / 3 * 4 + 64 * 1024 < MAX_FRAME as u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum Record {
    Check {
        format: u32,
    },
    Put {
        path: String,
        size: u64,
        mtime: i64,
        cached_at: i64,
        #[serde(with = "base64_bytes")]
        content: Vec<u8>,
    },
    Delete {
        path: String,
    },
    Meta {
        key: String,
        value: String,
    },
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Encrypt a record into a complete frame, length prefix included.
///
/// Fails without sealing anything if the frame would exceed `limit`.
pub(crate) fn seal(key: &DerivedKey, record: &Record, limit: u32) -> Result<Vec<u8>> {
    let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(record)?);
    let sealed_len = plaintext.len() + NONCE_SIZE + TAG_SIZE;
    let len = match u32::try_from(sealed_len) {
        Ok(len) if len <= limit => len,
        _ => {
            return Err(StoreError::FrameTooLarge {
                size: sealed_len,
                limit,
            })
        }
    };
    let sealed = encrypt(key, &plaintext)?;

    let mut frame = Vec::with_capacity(LEN_PREFIX as usize + sealed.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&sealed);
    Ok(frame)
}

/// Decrypt the sealed part of a frame (without its length prefix)
pub(crate) fn open(key: &DerivedKey, sealed: &[u8]) -> std::result::Result<Record, OpenError> {
    let plaintext = decrypt(key, sealed).map_err(OpenError::Crypto)?;
    serde_json::from_slice(&plaintext).map_err(OpenError::Decode)
}

#[derive(Debug)]
pub(crate) enum OpenError {
    Crypto(CryptoError),
    Decode(serde_json::Error),
}

/// Outcome of pulling the next frame off a reader
pub(crate) enum FrameRead {
    /// Sealed frame bytes (prefix stripped)
    Frame(Vec<u8>),
    /// Clean end of the log
    End,
    /// The log ends inside a frame
    Torn,
    /// A length no writer produces, with more data behind it
    BadLength(u32),
}

pub(crate) fn read_frame(reader: &mut impl Read) -> io::Result<FrameRead> {
    let mut prefix = [0u8; LEN_PREFIX as usize];
    match read_full(reader, &mut prefix)? {
        0 => return Ok(FrameRead::End),
        n if n < prefix.len() => return Ok(FrameRead::Torn),
        _ => {}
    }

    let len = u32::from_le_bytes(prefix);
    if len > MAX_FRAME || (len as usize) < NONCE_SIZE + TAG_SIZE {
        let mut next = [0u8; 1];
        return Ok(match read_full(reader, &mut next)? {
            0 => FrameRead::Torn,
            _ => FrameRead::BadLength(len),
        });
    }

    let mut sealed = vec![0u8; len as usize];
    if read_full(reader, &mut sealed)? < sealed.len() {
        return Ok(FrameRead::Torn);
    }
    Ok(FrameRead::Frame(sealed))
}

/// Like `read_exact`, but reports how much was read before EOF
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zeroize::Zeroizing;

    fn key() -> DerivedKey {
        DerivedKey::from_raw(Zeroizing::new([9u8; cachet_crypto::KEY_SIZE]))
    }

    #[test]
    fn test_frame_roundtrip() {
        let record = Record::Put {
            path: "/src/a.lua".into(),
            size: 3,
            mtime: 1_700_000_000,
            cached_at: 1_700_000_100,
            content: b"\x00\xffx".to_vec(),
        };
        let frame = seal(&key(), &record, MAX_FRAME).unwrap();

        let mut cursor = Cursor::new(frame);
        let FrameRead::Frame(sealed) = read_frame(&mut cursor).unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(open(&key(), &sealed).unwrap(), record);
        assert!(matches!(read_frame(&mut cursor).unwrap(), FrameRead::End));
    }

    #[test]
    fn test_partial_frame_is_torn() {
        let frame = seal(&key(), &Record::Delete { path: "/x".into() }, MAX_FRAME).unwrap();
        for cut in [1, 3, 5, frame.len() - 1] {
            let mut cursor = Cursor::new(frame[..cut].to_vec());
            assert!(matches!(read_frame(&mut cursor).unwrap(), FrameRead::Torn), "cut at {cut}");
        }
    }

    #[test]
    fn test_absurd_length_at_end_is_torn() {
        let mut cursor = Cursor::new(u32::MAX.to_le_bytes().to_vec());
        assert!(matches!(read_frame(&mut cursor).unwrap(), FrameRead::Torn));
    }

    #[test]
    fn test_absurd_length_mid_log_is_bad_length() {
        let mut bytes = u32::MAX.to_le_bytes().to_vec();
        bytes.extend(seal(&key(), &Record::Delete { path: "/x".into() }, MAX_FRAME).unwrap());
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            read_frame(&mut cursor).unwrap(),
            FrameRead::BadLength(u32::MAX)
        ));

        let mut cursor = Cursor::new([3u8, 0, 0, 0, 0xAA, 0xBB, 0xCC].to_vec());
        assert!(matches!(read_frame(&mut cursor).unwrap(), FrameRead::BadLength(3)));
    }

    #[test]
    fn test_oversized_record_is_rejected_before_sealing() {
        let record = Record::Put {
            path: "/big".into(),
            size: 4096,
            mtime: 0,
            cached_at: 0,
            content: vec![0u8; 4096],
        };
        assert!(matches!(
            seal(&key(), &record, 1024),
            Err(StoreError::FrameTooLarge { limit: 1024, .. })
        ));
        assert!(seal(&key(), &record, MAX_FRAME).is_ok());
    }
}
