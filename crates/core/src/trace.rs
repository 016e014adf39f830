//! Session trace files.
//!
//! A trace is the list of [`TraceEntry`] values recorded during a session,
//! serialized with bincode and deflate-compressed. Trace files are output
//! only; nothing in the core restores state from them.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "MCUT"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use std::path::Path;

use crate::error::TraceError;
use crate::snapshot::TraceEntry;

/// Magic bytes identifying an mcu-sim trace file.
const MAGIC: &[u8; 4] = b"MCUT";
/// Current trace format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

/// Encode entries into the trace file layout.
pub fn encode(entries: &[TraceEntry]) -> Result<Vec<u8>, TraceError> {
    let payload = bincode::serialize(entries)?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode a trace, verifying magic and version.
pub fn decode(data: &[u8]) -> Result<Vec<TraceEntry>, TraceError> {
    if data.len() < HEADER_LEN {
        return Err(TraceError::Truncated);
    }
    if &data[0..4] != MAGIC {
        return Err(TraceError::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(TraceError::Version { found: version, expected: FORMAT_VERSION });
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| TraceError::Decompress(format!("{:?}", e)))?;

    Ok(bincode::deserialize(&decompressed)?)
}

pub fn save_to_file(entries: &[TraceEntry], path: &Path) -> Result<(), TraceError> {
    let out = encode(entries)?;
    std::fs::write(path, out)?;
    log::info!("wrote {} trace entries to {}", entries.len(), path.display());
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let data = std::fs::read(path)?;
    decode(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::TraceBuffer;
    use crate::Board;

    fn sample_trace() -> Vec<TraceEntry> {
        let mut board = Board::new();
        let mut tb = TraceBuffer::new(16);
        board.machine.execute_line("MOV #5, W0").unwrap();
        tb.record("MOV #5, W0", board.snapshot());
        board.stepper.step();
        tb.record("step", board.snapshot());
        board.timer.advance(7);
        tb.record("tick 7", board.snapshot());
        tb.entries()
    }

    #[test]
    fn test_encode_decode() {
        let entries = sample_trace();
        let bytes = encode(&entries).unwrap();
        assert_eq!(&bytes[0..4], b"MCUT");
        let back = decode(&bytes).unwrap();
        assert_eq!(back, entries);
        assert_eq!(back[0].snapshot.registers.values[0], 5);
        assert_eq!(back[2].snapshot.timer.counter, 7);
    }

    #[test]
    fn test_rejects_bad_header() {
        assert!(matches!(decode(b"MCU"), Err(TraceError::Truncated)));
        assert!(matches!(decode(b"ABES\x01\0\0\0xx"), Err(TraceError::BadMagic)));
        assert!(matches!(
            decode(b"MCUT\x02\0\0\0xx"),
            Err(TraceError::Version { found: 2, expected: 1 })
        ));
        assert!(matches!(decode(b"MCUT\x01\0\0\0\xff\xff"), Err(TraceError::Decompress(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let entries = sample_trace();
        let path = std::env::temp_dir().join(format!("mcu-sim-trace-{}.bin", std::process::id()));
        save_to_file(&entries, &path).unwrap();
        let back = load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back.len(), 3);
        assert_eq!(back[1].command, "step");
    }
}
