// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only block log
//!
//! Durability layer of the local ledger.
//! - A block is written and fsync'd BEFORE it becomes visible
//! - Frames are CRC32 checked
//! - Bincode serialization
//!
//! # File Format
//! ```text
//! [Header: 16 bytes][Frame][Frame][Frame]...
//! ```
//!
//! Header:
//! - magic: [u8; 4] ("CCBL")
//! - version: u32 (1)
//! - reserved: u64 (0)
//!
//! Frame:
//! - len: u32 LE (body length)
//! - crc32: u32 LE (of body)
//! - body: bincode(LedgerBlock)

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use certchain::LedgerBlock;
use thiserror::Error;

pub const BLOCK_LOG_MAGIC: [u8; 4] = *b"CCBL";
pub const BLOCK_LOG_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 16;
const FRAME_PREFIX_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum BlockLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid header")]
    InvalidHeader,

    #[error("Corrupted frame at offset {offset}")]
    Corrupted { offset: u64 },
}

pub type Result<T> = std::result::Result<T, BlockLogError>;

struct BlockLogHeader {
    magic: [u8; 4],
    version: u32,
    reserved: u64,
}

impl BlockLogHeader {
    fn new() -> Self {
        Self {
            magic: BLOCK_LOG_MAGIC,
            version: BLOCK_LOG_VERSION,
            reserved: 0,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.reserved.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..8]);
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&bytes[8..16]);
        Self {
            magic,
            version: u32::from_le_bytes(version),
            reserved: u64::from_le_bytes(reserved),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.magic != BLOCK_LOG_MAGIC || self.version != BLOCK_LOG_VERSION {
            return Err(BlockLogError::InvalidHeader);
        }
        Ok(())
    }
}

/// Blocks decoded from a log image, plus the byte length that held them.
pub struct Decoded {
    pub blocks: Vec<LedgerBlock>,
    pub valid_len: u64,
    /// A trailing frame was cut short (crash during append).
    pub torn_tail: bool,
}

/// Decode a whole log image.
///
/// A frame whose length prefix runs past the end is treated as a torn write
/// and ends the scan. A complete frame with a bad checksum is corruption.
pub fn decode_log(bytes: &[u8]) -> Result<Decoded> {
    if bytes.len() < HEADER_LEN {
        return Err(BlockLogError::InvalidHeader);
    }
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&bytes[..HEADER_LEN]);
    BlockLogHeader::from_bytes(&header).validate()?;

    let mut blocks = Vec::new();
    let mut offset = HEADER_LEN;
    let mut torn_tail = false;

    while offset < bytes.len() {
        if bytes.len() - offset < FRAME_PREFIX_LEN {
            torn_tail = true;
            break;
        }
        let len = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]) as usize;
        let crc = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]);
        let body_start = offset + FRAME_PREFIX_LEN;
        if bytes.len() - body_start < len {
            torn_tail = true;
            break;
        }
        let body = &bytes[body_start..body_start + len];
        if crc32fast::hash(body) != crc {
            return Err(BlockLogError::Corrupted { offset: offset as u64 });
        }
        let (block, read): (LedgerBlock, usize) =
            bincode::serde::decode_from_slice(body, bincode::config::standard())
                .map_err(|e| BlockLogError::Serialization(e.to_string()))?;
        if read != len {
            return Err(BlockLogError::Corrupted { offset: offset as u64 });
        }
        blocks.push(block);
        offset = body_start + len;
    }

    Ok(Decoded {
        blocks,
        valid_len: offset as u64,
        torn_tail,
    })
}

/// Read every block from a log file without modifying it.
pub fn read_block_log(path: impl AsRef<Path>) -> Result<Vec<LedgerBlock>> {
    let bytes = std::fs::read(path)?;
    Ok(decode_log(&bytes)?.blocks)
}

pub struct BlockLogWriter {
    path: PathBuf,
    file: BufWriter<File>,
    block_count: u64,
}

impl BlockLogWriter {
    /// Open or create a block log, returning the blocks already in it.
    ///
    /// A torn trailing frame is truncated away before appending resumes.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<LedgerBlock>)> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let mut existing = Vec::new();
        file.read_to_end(&mut existing)?;

        let blocks = if existing.is_empty() {
            file.write_all(&BlockLogHeader::new().to_bytes())?;
            file.sync_all()?;
            Vec::new()
        } else {
            let decoded = decode_log(&existing)?;
            if decoded.torn_tail {
                tracing::warn!(
                    path = %path.display(),
                    valid_len = decoded.valid_len,
                    "truncating torn block log tail"
                );
                file.set_len(decoded.valid_len)?;
                file.sync_all()?;
            }
            decoded.blocks
        };

        Ok((
            Self {
                path,
                file: BufWriter::new(file),
                block_count: blocks.len() as u64,
            },
            blocks,
        ))
    }

    /// Append a block. Only returns Ok() after the frame is fsync'd.
    pub fn append(&mut self, block: &LedgerBlock) -> Result<()> {
        let body = bincode::serde::encode_to_vec(block, bincode::config::standard())
            .map_err(|e| BlockLogError::Serialization(e.to_string()))?;
        let len = u32::try_from(body.len())
            .map_err(|_| BlockLogError::Serialization("block exceeds frame size".into()))?;

        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&crc32fast::hash(&body).to_le_bytes())?;
        self.file.write_all(&body)?;
        self.file.flush()?;
        self.file.get_ref().sync_all()?;

        self.block_count += 1;
        Ok(())
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certchain::types::{certchain_verifier, Roster, ServerIdentity};
    use tempfile::tempdir;

    fn block(n: u8) -> LedgerBlock {
        let roster = Roster::new(vec![ServerIdentity::new("n", "http://127.0.0.1:1")]);
        LedgerBlock::genesis(roster, certchain_verifier(), vec![n; 16])
    }

    #[test]
    fn append_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.log");

        {
            let (mut log, existing) = BlockLogWriter::open(&path).unwrap();
            assert!(existing.is_empty());
            log.append(&block(1)).unwrap();
            log.append(&block(2)).unwrap();
            assert_eq!(log.block_count(), 2);
        }

        let (log, existing) = BlockLogWriter::open(&path).unwrap();
        assert_eq!(log.block_count(), 2);
        assert_eq!(existing, vec![block(1), block(2)]);
        assert_eq!(read_block_log(&path).unwrap().len(), 2);
    }

    #[test]
    fn torn_tail_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.log");
        {
            let (mut log, _) = BlockLogWriter::open(&path).unwrap();
            log.append(&block(1)).unwrap();
        }
        let intact = std::fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[200, 0, 0, 0, 1, 2]).unwrap();
        }

        let (mut log, existing) = BlockLogWriter::open(&path).unwrap();
        assert_eq!(existing, vec![block(1)]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);
        log.append(&block(2)).unwrap();
        drop(log);
        assert_eq!(read_block_log(&path).unwrap(), vec![block(1), block(2)]);
    }

    #[test]
    fn flipped_byte_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.log");
        {
            let (mut log, _) = BlockLogWriter::open(&path).unwrap();
            log.append(&block(1)).unwrap();
        }
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            BlockLogWriter::open(&path),
            Err(BlockLogError::Corrupted { offset: 16 })
        ));
    }

    #[test]
    fn bad_header_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.log");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(matches!(BlockLogWriter::open(&path), Err(BlockLogError::InvalidHeader)));
    }
}
