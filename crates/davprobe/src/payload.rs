//! Payload generation.
//!
//! Each round uploads a payload of a chosen size. The bytes are reproducible
//! for a given size so a failed round can be replayed, and every payload is
//! staged through a temporary file that is removed when the payload drops.

use crate::error::{ProbeError, ProbeResult};
use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Prefix for temporary payload files.
pub const PAYLOAD_FILE_PREFIX: &str = "davprobe_";

/// Period of the digit pattern: the content renders `i % 25` for `i = 1..`.
const PATTERN_PERIOD: u32 = 25;

/// IEEE CRC-32 of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Build the reproducible content for a payload of `size` bytes.
///
/// The content is the decimal rendering of `i % 25` for `i = 1, 2, 3, ...`
/// concatenated and cut at exactly `size` bytes:
/// `"123456789101112...23240123..."`.
pub fn pattern_bytes(size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(size);
    let mut i: u32 = 1;
    while out.len() < size {
        let value = i % PATTERN_PERIOD;
        if value >= 10 {
            out.push(b'0' + (value / 10) as u8);
            if out.len() == size {
                break;
            }
        }
        out.push(b'0' + (value % 10) as u8);
        i = i.wrapping_add(1);
    }
    out
}

/// An immutable payload staged on disk.
///
/// Dropping the payload deletes its backing file.
pub struct Payload {
    content: Vec<u8>,
    checksum: u32,
    file: NamedTempFile,
}

impl Payload {
    /// The bytes to upload.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// CRC-32 of the content.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Path of the backing temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("size", &self.content.len())
            .field("checksum", &format_args!("{:08x}", self.checksum))
            .field("path", &self.file.path())
            .finish()
    }
}

/// Produces payloads staged under a work directory.
#[derive(Debug, Clone)]
pub struct ContentGenerator {
    work_dir: PathBuf,
}

impl ContentGenerator {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Generate a payload of exactly `size` bytes.
    ///
    /// The content is written to a temporary file, rewound and read back;
    /// the read-back bytes become the upload body. `label` is appended to the
    /// file name to tell rounds apart on disk.
    pub fn generate(&self, size: usize, label: &str) -> ProbeResult<Payload> {
        if size == 0 {
            return Err(ProbeError::Config("payload size must be at least 1 byte".to_string()));
        }

        let content = pattern_bytes(size);
        let checksum = crc32(&content);

        let (file, read_back) = self.stage(&content, label).map_err(|source| {
            ProbeError::IoCreation {
                dir: self.work_dir.clone(),
                source,
            }
        })?;

        let read_back_crc = crc32(&read_back);
        if read_back.len() != size || read_back_crc != checksum {
            return Err(ProbeError::ReadBackMismatch {
                expected: size,
                actual: read_back.len(),
                expected_crc: checksum,
                actual_crc: read_back_crc,
            });
        }

        tracing::trace!(
            size,
            checksum = format_args!("{checksum:08x}"),
            path = %file.path().display(),
            "Staged payload"
        );

        Ok(Payload {
            content: read_back,
            checksum,
            file,
        })
    }

    /// Write, rewind and read back. The returned file is deleted on drop,
    /// including when this function bails out early.
    fn stage(&self, content: &[u8], label: &str) -> std::io::Result<(NamedTempFile, Vec<u8>)> {
        let suffix = format!("_{label}");
        let mut file = tempfile::Builder::new()
            .prefix(PAYLOAD_FILE_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.work_dir)?;

        file.write_all(content)?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;

        let mut read_back = Vec::with_capacity(content.len());
        file.read_to_end(&mut read_back)?;

        Ok((file, read_back))
    }
}
