//! Byte-level link under the packet transport

use crate::TransportError;
use std::time::Duration;

/// A bidirectional byte stream to a display module.
///
/// Implemented by [`SerialPort`](crate::SerialPort) for real hardware and by
/// [`ScriptedLink`](crate::ScriptedLink) for tests.
pub trait Link: Send {
    /// Write the whole buffer, blocking until it has been handed to the device.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    /// Read whatever is available into `buf`, waiting at most `wait` for the
    /// first byte. Returns the number of bytes read; zero means nothing arrived.
    fn read_available(&mut self, buf: &mut [u8], wait: Duration) -> Result<usize, TransportError>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(buf)
    }

    fn read_available(&mut self, buf: &mut [u8], wait: Duration) -> Result<usize, TransportError> {
        (**self).read_available(buf, wait)
    }
}
