//! # Interactive Print Dialog
//!
//! Some hosts can only print through a dialog owned by their UI thread. All
//! dialog work is therefore queued to one dedicated [`UiThread`]; async
//! callers wait for the answer on a oneshot channel.
//!
//! A dialog never receives raw bytes. It gets a [`HostDocument`] and the host
//! renders it with its own fonts.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::TransportError;

use super::{Channel, HostDocument, Payload, SurfaceHandle};

/// Name of the thread that owns the dialog host.
pub const UI_THREAD_NAME: &str = "rasid-ui";

/// Something that can show a print dialog. Only ever called on the UI thread.
pub trait DialogHost: Send {
    /// Present `document` on `surface`. Returns once the user confirmed;
    /// a dismissed dialog is [`TransportError::Rejected`].
    fn present(&mut self, surface: &SurfaceHandle, document: &HostDocument)
    -> Result<(), TransportError>;
}

type Job = Box<dyn FnOnce(&mut dyn DialogHost) + Send>;

/// Handle to the UI thread. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UiThread {
    jobs: mpsc::Sender<Job>,
}

impl UiThread {
    /// Start the UI thread, moving `host` onto it. The thread exits when the
    /// last handle is dropped.
    pub fn spawn(host: impl DialogHost + 'static) -> std::io::Result<Self> {
        let (jobs, queue) = mpsc::channel::<Job>();
        std::thread::Builder::new()
            .name(UI_THREAD_NAME.into())
            .spawn(move || {
                let mut host = host;
                for job in queue {
                    job(&mut host);
                }
                tracing::debug!("ui thread stopped");
            })?;
        Ok(Self { jobs })
    }

    pub async fn present(
        &self,
        surface: SurfaceHandle,
        document: HostDocument,
    ) -> Result<(), TransportError> {
        let (reply, answer) = tokio::sync::oneshot::channel();
        let job: Job = Box::new(move |host| {
            // Receiver gone means the caller stopped waiting.
            let _ = reply.send(host.present(&surface, &document));
        });
        self.jobs
            .send(job)
            .map_err(|_| TransportError::Unavailable("ui thread is not running".into()))?;
        answer
            .await
            .map_err(|_| TransportError::Unavailable("ui thread dropped the dialog".into()))?
    }
}

pub struct DialogChannel {
    ui: UiThread,
    surface: SurfaceHandle,
}

impl DialogChannel {
    pub fn new(ui: UiThread, surface: SurfaceHandle) -> Self {
        Self { ui, surface }
    }
}

#[async_trait]
impl Channel for DialogChannel {
    async fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        match payload {
            Payload::Raw(_) => Err(TransportError::Rejected(
                "print dialogs accept documents, not raw bytes".into(),
            )),
            Payload::Document(doc) => self.ui.present(self.surface.clone(), doc.clone()).await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// What a [`RecordingDialog`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presented {
    pub surface: SurfaceHandle,
    pub document: HostDocument,
    pub thread: Option<String>,
}

/// Dialog host that records instead of showing anything. Used for dry runs
/// and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingDialog {
    shown: Arc<Mutex<Vec<Presented>>>,
    dismiss: bool,
}

impl RecordingDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose user always presses cancel.
    pub fn dismissing() -> Self {
        Self {
            dismiss: true,
            ..Self::default()
        }
    }

    pub fn shown(&self) -> Vec<Presented> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl DialogHost for RecordingDialog {
    fn present(
        &mut self,
        surface: &SurfaceHandle,
        document: &HostDocument,
    ) -> Result<(), TransportError> {
        if self.dismiss {
            return Err(TransportError::Rejected("print dialog dismissed".into()));
        }
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Presented {
                surface: surface.clone(),
                document: document.clone(),
                thread: std::thread::current().name().map(str::to_string),
            });
        Ok(())
    }
}
