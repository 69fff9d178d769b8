//! CUPS print queues via `lp`.
//!
//! Raw payloads are submitted with `-o raw` so the driver passes ESC/POS
//! bytes through untouched. Documents are submitted as UTF-8 text and the
//! queue's driver lays them out with system fonts.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::TransportError;

use super::{Channel, Payload};

#[derive(Debug)]
pub struct SpoolerChannel {
    queue: String,
    send_timeout: Duration,
}

impl SpoolerChannel {
    /// Check that `queue` exists before anything is submitted.
    pub async fn open(queue: &str, send_timeout: Duration) -> Result<Self, TransportError> {
        let mut lookup = Command::new("lpstat");
        lookup.args(["-p", queue]);
        check_queue(lookup, queue, send_timeout).await?;
        Ok(Self {
            queue: queue.to_string(),
            send_timeout,
        })
    }

    async fn submit(&self, data: Vec<u8>, raw: bool) -> Result<(), TransportError> {
        let mut command = Command::new("lp");
        command.args(["-d", &self.queue]);
        if raw {
            command.args(["-o", "raw"]);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Unavailable(format!("cannot run lp: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Rejected("lp stdin unavailable".into()))?;

        let run = async move {
            stdin.write_all(&data).await?;
            drop(stdin);
            child.wait_with_output().await
        };
        let output = tokio::time::timeout(self.send_timeout, run)
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "spooler submit",
                after: self.send_timeout,
            })?
            .map_err(|e| TransportError::from_io("lp", &e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::Rejected(format!(
                "lp -d {}: {}",
                self.queue,
                stderr.trim()
            )));
        }
        tracing::debug!(
            queue = %self.queue,
            job = %String::from_utf8_lossy(&output.stdout).trim(),
            "spooler accepted job"
        );
        Ok(())
    }
}

/// Run `lookup` and treat a non-zero exit as an unknown queue. A lookup
/// still running after `timeout` is killed.
async fn check_queue(mut lookup: Command, queue: &str, timeout: Duration) -> Result<(), TransportError> {
    let status = lookup
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();
    let status = tokio::time::timeout(timeout, status)
        .await
        .map_err(|_| TransportError::Timeout {
            operation: "spooler lookup",
            after: timeout,
        })?
        .map_err(|e| TransportError::Unavailable(format!("cannot run lpstat: {e}")))?;

    if !status.success() {
        return Err(TransportError::Unavailable(format!("unknown spooler queue {queue}")));
    }
    Ok(())
}

#[async_trait]
impl Channel for SpoolerChannel {
    async fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        match payload {
            Payload::Raw(bytes) => self.submit(bytes.clone(), true).await,
            Payload::Document(doc) => self.submit(doc.to_text().into_bytes(), false).await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
