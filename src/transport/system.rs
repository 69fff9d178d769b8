//! The connector used outside tests: dispatches each target kind to its
//! backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

use super::dialog::DialogChannel;
use super::network::NetworkChannel;
use super::serial::SerialChannel;
use super::spooler::SpoolerChannel;
use super::{Channel, Connector, TransportTarget, UiThread};

#[derive(Debug, Clone)]
pub struct SystemConnector {
    connect_timeout: Duration,
    send_timeout: Duration,
    ui: Option<UiThread>,
}

impl Default for SystemConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(10))
    }
}

impl SystemConnector {
    pub fn new(connect_timeout: Duration, send_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            send_timeout,
            ui: None,
        }
    }

    /// Route dialog targets to `ui`. Without one they are unavailable.
    pub fn with_ui(mut self, ui: UiThread) -> Self {
        self.ui = Some(ui);
        self
    }
}

#[async_trait]
impl Connector for SystemConnector {
    async fn open(&self, target: &TransportTarget) -> Result<Box<dyn Channel>, TransportError> {
        tracing::debug!(%target, "opening channel");
        let channel: Box<dyn Channel> = match target {
            TransportTarget::SerialPort { path, baud } => Box::new(
                SerialChannel::open(path, *baud, self.connect_timeout, self.send_timeout).await?,
            ),
            TransportTarget::NetworkSocket { host, port } => Box::new(
                NetworkChannel::connect(host, *port, self.connect_timeout, self.send_timeout)
                    .await?,
            ),
            TransportTarget::SpoolerQueue(queue) => {
                Box::new(SpoolerChannel::open(queue, self.send_timeout).await?)
            }
            TransportTarget::HostDialog(surface) => {
                let ui = self.ui.clone().ok_or_else(|| {
                    TransportError::Unavailable("no dialog host attached".into())
                })?;
                Box::new(DialogChannel::new(ui, surface.clone()))
            }
        };
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SurfaceHandle;

    #[tokio::test]
    async fn test_dialog_without_ui_is_unavailable() {
        let connector = SystemConnector::default();
        let target = TransportTarget::HostDialog(SurfaceHandle("main".into()));
        assert!(matches!(
            connector.open(&target).await,
            Err(TransportError::Unavailable(_))
        ));
    }
}
