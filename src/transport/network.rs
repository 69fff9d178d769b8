//! Raw TCP printing (port 9100 on most thermal printers).

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::TransportError;

use super::{Channel, Payload};

#[derive(Debug)]
pub struct NetworkChannel {
    addr: String,
    stream: Option<TcpStream>,
    send_timeout: Duration,
}

impl NetworkChannel {
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        send_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        tracing::debug!(%addr, "connecting to printer");

        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "connect",
                after: connect_timeout,
            })?
            .map_err(|e| TransportError::from_io(&addr, &e))?;

        Ok(Self {
            addr,
            stream: Some(stream),
            send_timeout,
        })
    }
}

#[async_trait]
impl Channel for NetworkChannel {
    async fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        let Payload::Raw(bytes) = payload else {
            return Err(TransportError::Rejected(
                "network printers accept raw bytes only".into(),
            ));
        };
        let addr = &self.addr;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::Unavailable(format!("{addr}: channel closed")))?;

        let write = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        };
        match tokio::time::timeout(self.send_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::from_io(addr, &e)),
            Err(_) => {
                self.stream = None;
                Err(TransportError::Timeout {
                    operation: "network write",
                    after: self.send_timeout,
                })
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            // Peer may already have hung up; nothing left to report.
            let _ = stream.shutdown().await;
        }
        Ok(())
    }
}
