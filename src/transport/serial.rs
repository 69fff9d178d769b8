//! # Serial Transport
//!
//! Writes to a tty (USB or RS-232 adapter) configured for raw binary
//! transfer at the requested baud rate.
//!
//! ## TTY Configuration
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR,
//!   ICRNL cleared
//! - **No software flow control**: IXON, IXOFF, IXANY cleared; raster data
//!   contains 0x11 and 0x13
//! - **No output processing**: OPOST cleared (no CR/LF translation)
//! - **8N1**: CS8, no parity
//! - **Non-canonical, no echo**
//!
//! File I/O is blocking, so open and write run on tokio's blocking pool
//! under a timeout. The device is opened non-blocking so a missing carrier
//! cannot stall `open`, then switched back to blocking writes.
//!
//! A timed-out write is abandoned at the next chunk boundary and pending
//! output is flushed. `send` only returns once the blocking task has let go
//! of the file, so the caller's target lock covers every byte written.
//!
//! ## Windows port names
//!
//! `COM10` and above must be opened as `\\.\COM10`; see
//! [`normalize_com_port`].

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

use super::{Channel, Payload};

/// Writes are split into chunks of this size.
const CHUNK_SIZE: usize = 4096;

/// Windows device path for COM ports above 9. Other names are returned as-is.
///
/// ```
/// use rasid::transport::serial::normalize_com_port;
///
/// assert_eq!(normalize_com_port("COM7"), "COM7");
/// assert_eq!(normalize_com_port("com12"), r"\\.\COM12");
/// ```
pub fn normalize_com_port(port: &str) -> String {
    let upper = port.to_uppercase();
    let is_high_com = upper
        .strip_prefix("COM")
        .and_then(|n| n.parse::<u32>().ok())
        .is_some_and(|n| n > 9);
    if is_high_com {
        format!(r"\\.\{upper}")
    } else {
        port.to_string()
    }
}

pub struct SerialChannel {
    path: String,
    file: Option<File>,
    send_timeout: Duration,
}

impl SerialChannel {
    pub async fn open(
        path: &str,
        baud: u32,
        open_timeout: Duration,
        send_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let device = if cfg!(windows) {
            normalize_com_port(path)
        } else {
            path.to_string()
        };

        let mut task = tokio::task::spawn_blocking(move || open_raw(&device, baud));
        let joined = match tokio::time::timeout(open_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                // Whatever the task opened is dropped with its result.
                let _ = task.await;
                return Err(TransportError::Timeout {
                    operation: "serial open",
                    after: open_timeout,
                });
            }
        };
        let file = joined
            .map_err(|e| TransportError::Unavailable(format!("{path}: {e}")))?
            .map_err(|e| TransportError::from_io(path, &e))?;

        tracing::debug!(path, baud, "serial port opened");
        Ok(Self {
            path: path.to_string(),
            file: Some(file),
            send_timeout,
        })
    }
}

#[async_trait]
impl Channel for SerialChannel {
    async fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        let Payload::Raw(bytes) = payload else {
            return Err(TransportError::Rejected(
                "serial printers accept raw bytes only".into(),
            ));
        };
        let mut file = self
            .file
            .take()
            .ok_or_else(|| TransportError::Unavailable(format!("{}: channel closed", self.path)))?;

        let control = file
            .try_clone()
            .map_err(|e| TransportError::from_io(&self.path, &e))?;
        let abort = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&abort);
        let data = bytes.clone();
        let mut task =
            tokio::task::spawn_blocking(move || write_chunked(&mut file, &data, &stop).map(|()| file));

        let joined = match tokio::time::timeout(self.send_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.store(true, Ordering::SeqCst);
                discard_output(&control);
                // The chunk in flight still has to finish before the port is free.
                let _ = task.await;
                tracing::warn!(path = %self.path, after = ?self.send_timeout, "serial write abandoned");
                return Err(TransportError::Timeout {
                    operation: "serial write",
                    after: self.send_timeout,
                });
            }
        };
        let file = joined
            .map_err(|e| TransportError::Rejected(format!("{}: {e}", self.path)))?
            .map_err(|e| TransportError::from_io(&self.path, &e))?;

        self.file = Some(file);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.file.take().is_some() {
            tracing::debug!(path = %self.path, "serial port closed");
        }
        Ok(())
    }
}

fn write_chunked(file: &mut File, data: &[u8], abort: &AtomicBool) -> io::Result<()> {
    for chunk in data.chunks(CHUNK_SIZE) {
        if abort.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "write abandoned"));
        }
        file.write_all(chunk)?;
    }
    file.flush()
}

fn open_raw(path: &str, baud: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK);
    }
    let file = options.open(path)?;
    set_blocking(&file)?;
    configure_tty_raw(&file, baud)?;
    Ok(file)
}

#[cfg(unix)]
fn set_blocking(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_blocking(_file: &File) -> io::Result<()> {
    Ok(())
}

/// Drop output queued in the driver. Not a tty means nothing to drop.
#[cfg(unix)]
fn discard_output(file: &File) {
    use std::os::unix::io::AsRawFd;

    if unsafe { libc::tcflush(file.as_raw_fd(), libc::TCOFLUSH) } != 0 {
        tracing::trace!(error = %io::Error::last_os_error(), "tcflush skipped");
    }
}

#[cfg(not(unix))]
fn discard_output(_file: &File) {}

#[cfg(unix)]
fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        _ => return None,
    };
    Some(speed)
}

#[cfg(unix)]
fn configure_tty_raw(file: &File, baud: u32) -> io::Result<()> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let speed = baud_constant(baud).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("unsupported baud rate {baud}"))
    })?;

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        // Not a terminal (e.g. a plain file or a /dev/usb/lp node). Write
        // through unconfigured.
        tracing::debug!(error = %io::Error::last_os_error(), "tcgetattr failed, skipping tty setup");
        return Ok(());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    unsafe {
        if libc::cfsetispeed(&mut termios, speed) != 0 || libc::cfsetospeed(&mut termios, speed) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File, _baud: u32) -> io::Result<()> {
    // The Windows COM driver keeps its own line settings.
    Ok(())
}
