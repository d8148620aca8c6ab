//! Raw termios serial port link

use crate::link::Link;
use crate::TransportError;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Line settings for opening a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub device: PathBuf,
    pub baud_rate: u32,
    /// USB-CDC modules: open blocking, VMIN = VTIME = 0
    pub usb: bool,
}

impl SerialConfig {
    pub fn new(device: impl Into<PathBuf>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            usb: false,
        }
    }

    pub fn with_usb(mut self, usb: bool) -> Self {
        self.usb = usb;
        self
    }
}

/// Longest a write may wait for room in the output queue
const WRITE_STALL_TIMEOUT: Duration = Duration::from_secs(1);

fn speed_constant(baud_rate: u32) -> Option<libc::speed_t> {
    match baud_rate {
        1200 => Some(libc::B1200),
        2400 => Some(libc::B2400),
        9600 => Some(libc::B9600),
        19200 => Some(libc::B19200),
        115200 => Some(libc::B115200),
        _ => None,
    }
}

/// A serial device in raw mode.
///
/// The previous line settings are restored when the port is dropped.
pub struct SerialPort {
    file: File,
    path: PathBuf,
    saved: Option<libc::termios>,
}

impl SerialPort {
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let speed = speed_constant(config.baud_rate)
            .ok_or(TransportError::UnsupportedBaudRate(config.baud_rate))?;

        let mut flags = libc::O_NOCTTY;
        if !config.usb {
            flags |= libc::O_NDELAY;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(flags)
            .open(&config.device)
            .map_err(|source| TransportError::Open {
                path: config.device.clone(),
                source,
            })?;

        let fd = file.as_raw_fd();
        let mut saved: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut saved) } != 0 {
            return Err(Self::open_error(&config.device));
        }

        let mut raw = saved;
        unsafe { libc::cfmakeraw(&mut raw) };
        if config.usb {
            raw.c_cc[libc::VMIN] = 0;
            raw.c_cc[libc::VTIME] = 0;
        }
        unsafe {
            libc::cfsetospeed(&mut raw, speed);
            libc::cfsetispeed(&mut raw, libc::B0);
        }
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return Err(Self::open_error(&config.device));
        }

        info!(
            "Opened {} at {} baud{}",
            config.device.display(),
            config.baud_rate,
            if config.usb { " (USB)" } else { "" }
        );

        Ok(Self {
            file,
            path: config.device.clone(),
            saved: Some(saved),
        })
    }

    fn open_error(path: &Path) -> TransportError {
        TransportError::Open {
            path: path.to_path_buf(),
            source: std::io::Error::last_os_error(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

}

/// Block until `fd` is ready for `events` (`POLLIN`/`POLLOUT`) or `wait`
/// passes. An interrupted wait counts as not ready.
fn wait_ready(fd: RawFd, events: libc::c_short, wait: Duration) -> Result<bool, TransportError> {
    let mut pollfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    let timeout = wait.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    // sub-millisecond waits still give the device a chance
    let timeout = if timeout == 0 && !wait.is_zero() { 1 } else { timeout };

    let result = unsafe { libc::poll(&mut pollfd, 1, timeout) };
    if result < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err.into());
    }
    if pollfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
        return Err(TransportError::Disconnected);
    }
    Ok(result > 0)
}

/// Write all of `buf` to a possibly non-blocking descriptor, sleeping in
/// `poll` while the output queue is full. Fails if no progress is possible
/// for `stall`.
fn write_all_nonblocking<W: Write + AsRawFd>(
    writer: &mut W,
    mut buf: &[u8],
    stall: Duration,
) -> Result<(), TransportError> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => return Err(TransportError::Disconnected),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if !wait_ready(writer.as_raw_fd(), libc::POLLOUT, stall)? {
                    return Err(std::io::Error::new(
                        ErrorKind::TimedOut,
                        format!("output queue full for {stall:?}"),
                    )
                    .into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

impl Link for SerialPort {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        write_all_nonblocking(&mut self.file, buf, WRITE_STALL_TIMEOUT)
    }

    fn read_available(&mut self, buf: &mut [u8], wait: Duration) -> Result<usize, TransportError> {
        if buf.is_empty() || !wait_ready(self.file.as_raw_fd(), libc::POLLIN, wait)? {
            return Ok(0);
        }
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            unsafe {
                libc::tcsetattr(self.file.as_raw_fd(), libc::TCSANOW, &saved);
            }
            debug!("Restored line settings on {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;
    use std::time::Instant;

    #[test]
    fn test_speed_constants() {
        for rate in crate::protocol::BAUD_RATES {
            assert!(speed_constant(rate).is_some(), "{rate}");
        }
        assert!(speed_constant(57600).is_none());
    }

    #[test]
    fn test_unsupported_baud_rate() {
        let err = SerialPort::open(&SerialConfig::new("/dev/null", 4800))
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(4800)));
    }

    #[test]
    fn test_missing_device() {
        let err = SerialPort::open(&SerialConfig::new("/nonexistent/lcd", 19200))
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn test_wait_ready_on_socket() {
        let (a, mut b) = UnixStream::pair().unwrap();
        assert!(!wait_ready(a.as_raw_fd(), libc::POLLIN, Duration::from_millis(5)).unwrap());
        assert!(wait_ready(a.as_raw_fd(), libc::POLLOUT, Duration::ZERO).unwrap());
        b.write_all(&[0x40]).unwrap();
        assert!(wait_ready(a.as_raw_fd(), libc::POLLIN, Duration::from_millis(50)).unwrap());
    }

    /// Fill the socket's send queue so the next write would block
    fn congested_pair() -> (UnixStream, UnixStream) {
        let (mut writer, reader) = UnixStream::pair().unwrap();
        writer.set_nonblocking(true).unwrap();
        let chunk = [0u8; 4096];
        loop {
            match writer.write(&chunk) {
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => panic!("{e}"),
            }
        }
        (writer, reader)
    }

    #[test]
    fn test_full_queue_waits_then_times_out() {
        let (mut writer, _reader) = congested_pair();
        let started = Instant::now();
        let err = write_all_nonblocking(&mut writer, &[1, 2, 3], Duration::from_millis(50))
            .unwrap_err();
        let elapsed = started.elapsed();
        assert!(matches!(err, TransportError::Io(ref e) if e.kind() == ErrorKind::TimedOut));
        assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
    }

    #[test]
    fn test_write_resumes_when_queue_drains() {
        let (mut writer, mut reader) = congested_pair();
        let drain = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let mut sink = vec![0u8; 1 << 16];
            let mut total = 0;
            while let Ok(n) = reader.read(&mut sink) {
                total += n;
                if n == 0 || sink[..n].ends_with(&[0xAB]) {
                    break;
                }
            }
            total
        });
        write_all_nonblocking(&mut writer, &[0xAB], Duration::from_secs(2)).unwrap();
        drop(writer);
        assert!(drain.join().unwrap() > 0);
    }

    #[test]
    #[ignore = "requires a CrystalFontz module on /dev/lcd"]
    fn test_ping_hardware() {
        use crate::{protocol::cmd, Transport};
        let port = SerialPort::open(&SerialConfig::new("/dev/lcd", 19200)).unwrap();
        let mut transport = Transport::new(port);
        transport.send_zero_byte(cmd::PING).unwrap();
    }
}
