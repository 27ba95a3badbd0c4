//! Machine save states (quick save / quick load).
//!
//! Captures the full machine state to a file using bincode serialization
//! with deflate compression.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "I80S"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use crate::cpu::Cpu;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Magic bytes identifying a save state file.
const MAGIC: &[u8; 4] = b"I80S";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;
/// Header size: magic + version.
const HEADER_LEN: usize = 8;

/// A frozen machine state: CPU fields plus full memory. The port bus is
/// host wiring and is not captured.
#[derive(Serialize, Deserialize)]
pub struct SaveState {
    pub cpu: Cpu,
    pub mem: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("not a save state file (bad magic)")]
    BadMagic,
    #[error("unsupported save state version {found} (expected {FORMAT_VERSION})")]
    Version { found: u32 },
    #[error("save state truncated")]
    Truncated,
    #[error("corrupt save state payload")]
    Corrupt,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serialize a state into the headered, compressed container.
pub fn encode(state: &SaveState) -> Result<Vec<u8>, StateError> {
    let payload = bincode::serialize(state).map_err(|_| StateError::Corrupt)?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);
    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Parse a container produced by [`encode`], verifying magic and
/// version.
pub fn decode(data: &[u8]) -> Result<SaveState, StateError> {
    if data.len() < HEADER_LEN {
        return Err(StateError::Truncated);
    }
    if &data[0..4] != MAGIC {
        return Err(StateError::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(StateError::Version { found: version });
    }
    let payload = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|_| StateError::Corrupt)?;
    bincode::deserialize(&payload).map_err(|_| StateError::Corrupt)
}

pub fn save_to_file(state: &SaveState, path: &Path) -> Result<(), StateError> {
    std::fs::write(path, encode(state)?)?;
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<SaveState, StateError> {
    decode(&std::fs::read(path)?)
}

/// Derive the save state path from the program image path:
/// `invaders.img` → `invaders.state`.
pub fn state_path(image_path: &str) -> String {
    let p = Path::new(image_path);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("program");
    let dir = p.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}.state", stem)).to_string_lossy().into_owned()
}
