//! # Printer Transport Layer
//!
//! Moves a finished payload to a printer or to a host-side renderer.
//!
//! ## Available Transports
//!
//! | Target | Backend | Accepts |
//! |--------|---------|---------|
//! | [`TransportTarget::SerialPort`] | [`serial`]: raw tty via termios | bytes |
//! | [`TransportTarget::NetworkSocket`] | [`network`]: TCP, port 9100 | bytes |
//! | [`TransportTarget::SpoolerQueue`] | [`spooler`]: CUPS `lp` | bytes, documents |
//! | [`TransportTarget::HostDialog`] | [`dialog`]: UI thread | documents |
//!
//! ## Lifecycle
//!
//! [`deliver`] is the only way the pipeline talks to a device:
//!
//! ```text
//! lock(target) ─► open ─► send ─► close ─► unlock
//!                          │        ▲
//!                          └─error──┘   (close always runs)
//! ```
//!
//! The lock is per target, so two jobs for the same printer never
//! interleave their bytes while jobs for different printers run in parallel.

pub mod dialog;
pub mod document;
pub mod lock;
pub mod network;
pub mod serial;
pub mod spooler;
pub mod system;

use std::fmt;

use async_trait::async_trait;

use crate::error::TransportError;

pub use dialog::{DialogHost, RecordingDialog, UiThread};
pub use document::HostDocument;
pub use lock::{LockPolicy, TargetLocks};
pub use system::SystemConnector;

/// Default raw printing port of network printers.
pub const DEFAULT_RAW_PORT: u16 = 9100;

/// Opaque reference to a UI surface a dialog can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub String);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a payload goes. One target is bound per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    SpoolerQueue(String),
    SerialPort { path: String, baud: u32 },
    NetworkSocket { host: String, port: u16 },
    HostDialog(SurfaceHandle),
}

impl TransportTarget {
    /// Identity used by the exclusion lock. Settings that do not change the
    /// physical device (baud rate) are not part of it.
    pub fn key(&self) -> String {
        match self {
            Self::SpoolerQueue(name) => format!("spooler:{name}"),
            Self::SerialPort { path, .. } => format!("serial:{path}"),
            Self::NetworkSocket { host, port } => format!("tcp:{}:{port}", host.to_lowercase()),
            Self::HostDialog(surface) => format!("dialog:{surface}"),
        }
    }

    /// What a device behind this kind of target can do.
    ///
    /// Spooler queues go through a driver that decides about cutting itself.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::SerialPort { .. } | Self::NetworkSocket { .. } => Capabilities {
                raw_bytes: true,
                cut: true,
            },
            Self::SpoolerQueue(_) => Capabilities {
                raw_bytes: true,
                cut: false,
            },
            Self::HostDialog(_) => Capabilities {
                raw_bytes: false,
                cut: false,
            },
        }
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpoolerQueue(name) => write!(f, "spooler queue {name}"),
            Self::SerialPort { path, baud } => write!(f, "serial {path} @{baud}"),
            Self::NetworkSocket { host, port } => write!(f, "tcp {host}:{port}"),
            Self::HostDialog(surface) => write!(f, "dialog on {surface}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Accepts an ESC/POS byte stream.
    pub raw_bytes: bool,
    /// Has a cutter that honours `GS V`.
    pub cut: bool,
}

/// What a channel transmits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Raw(Vec<u8>),
    Document(HostDocument),
}

impl Payload {
    /// Bytes that go over the wire.
    pub fn len(&self) -> usize {
        match self {
            Self::Raw(bytes) => bytes.len(),
            Self::Document(doc) => doc.to_text().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Document(_) => "document",
        }
    }
}

/// An open connection to one target.
#[async_trait]
pub trait Channel: Send {
    /// Transmit the whole payload. Success means the target accepted it,
    /// not that the paper came out.
    async fn send(&mut self, payload: &Payload) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens channels for targets.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, target: &TransportTarget) -> Result<Box<dyn Channel>, TransportError>;

    fn capabilities(&self, target: &TransportTarget) -> Capabilities {
        target.capabilities()
    }
}

/// Lock the target, open it, send, and close it again.
///
/// The channel is closed on every path out of `send`, and the lock is
/// released when this returns. Returns the number of bytes transmitted.
pub async fn deliver(
    connector: &dyn Connector,
    locks: &TargetLocks,
    target: &TransportTarget,
    payload: &Payload,
) -> Result<usize, TransportError> {
    let _guard = locks.acquire(target).await?;

    let mut channel = connector.open(target).await?;
    let sent = channel.send(payload).await;
    let closed = channel.close().await;

    match (sent, closed) {
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                tracing::debug!(%target, error = %close_err, "close after failed send");
            }
            Err(err)
        }
        (Ok(()), Err(err)) => Err(err),
        (Ok(()), Ok(())) => {
            tracing::info!(%target, bytes = payload.len(), kind = payload.kind(), "payload delivered");
            Ok(payload.len())
        }
    }
}
