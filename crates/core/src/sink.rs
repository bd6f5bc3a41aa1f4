pub mod stub;
pub mod device;

use std::io;
use std::path::Path;

use anyhow::Result;

use crate::buttons::ButtonState;
use crate::logger;

/// Byte sink connected to the controller emulator. Transport details
/// (port settings, flow control) belong to the implementation.
pub trait OutputSink: Send {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Send the frame selecting exactly `state`.
    fn set_buttons(&mut self, state: ButtonState) -> io::Result<()> {
        self.write(&state.frame())
    }

    /// Release anything held and flush recorded output. Called once when the
    /// host disconnects.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl OutputSink for Box<dyn OutputSink> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Create the sink for this session: the recording stub when asked for (or
/// when no device is configured), otherwise the device node at `device`.
pub fn create_sink(device: Option<&Path>, force_stub: bool, dump_dir: &Path) -> Result<Box<dyn OutputSink>> {
    match device {
        Some(path) if !force_stub => {
            logger::register_prefix("device", logger::COLOR_GRAY);
            Ok(Box::new(device::DeviceSink::open(path)?))
        }
        _ => {
            logger::register_prefix("stub", logger::COLOR_GRAY);
            Ok(Box::new(stub::RecordingSink::with_dump(dump_dir.join("frames.txt"))))
        }
    }
}
