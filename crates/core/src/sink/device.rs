use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::buttons::ButtonState;
use crate::logger;
use super::OutputSink;

/// Writes frames to a device node whose line settings were configured
/// outside this process (e.g. `stty -F /dev/ttyUSB0 4800 raw`).
pub struct DeviceSink {
    path: PathBuf,
    file: File,
}

impl DeviceSink {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .with_context(|| format!("opening device {}", path.display()))?;
        logger::info_p("device", &format!("opened {}", path.display()));
        Ok(Self { path: path.to_path_buf(), file })
    }
}

impl OutputSink for DeviceSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.set_buttons(ButtonState::ALL_RELEASED)
            .with_context(|| format!("releasing buttons on {}", self.path.display()))?;
        logger::info_p("device", &format!("closed {}", self.path.display()));
        Ok(())
    }
}
