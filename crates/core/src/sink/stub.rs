use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::buttons::ButtonState;
use crate::logger;
use super::OutputSink;

/// One write seen by the recording sink.
#[derive(Debug, Clone)]
pub struct Record {
    pub at: Instant,
    pub bytes: Vec<u8>,
}

impl Record {
    /// Decoded button state when this write was a well-formed frame.
    pub fn buttons(&self) -> Option<ButtonState> {
        match self.bytes.as_slice() {
            [0x80, lo, hi] => Some(ButtonState::from_bits(u16::from_le_bytes([*lo, *hi]))),
            _ => None,
        }
    }

    pub fn hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Debug stand-in for the device: keeps every write in memory and, when a
/// dump path is set, writes them as hex lines on close.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Vec<Record>,
    dump: Option<PathBuf>,
    verbose: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dump(path: PathBuf) -> Self {
        Self { records: Vec::new(), dump: Some(path), verbose: true }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Button states written so far, skipping anything that is not a frame.
    pub fn states(&self) -> Vec<ButtonState> {
        self.records.iter().filter_map(Record::buttons).collect()
    }
}

impl OutputSink for RecordingSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let record = Record { at: Instant::now(), bytes: bytes.to_vec() };
        if self.verbose {
            match record.buttons() {
                Some(state) => logger::info_p("stub", &format!("{} ({})", record.hex(), state)),
                None => logger::info_p("stub", &record.hex()),
            }
        }
        self.records.push(record);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(path) = &self.dump else { return Ok(()) };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        let text: String = self.records.iter().map(|r| format!("{}\n", r.hex())).collect();
        std::fs::write(path, text).with_context(|| format!("writing frame dump {}", path.display()))?;
        logger::info_p("stub", &format!("dumped {} frame(s) to {}", self.records.len(), path.display()));
        Ok(())
    }
}
