//! Test connector that records what reaches each target.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rasid::TransportError;
use rasid::transport::{Channel, Connector, Payload, TransportTarget};

/// One write as seen on the wire: which channel made it and the bytes.
#[derive(Debug, Clone)]
pub struct Write {
    pub channel: usize,
    pub target: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct Recorder {
    /// Target keys whose `open` fails as unavailable.
    unavailable: HashSet<String>,
    /// Target keys whose `send` fails with the given error after opening.
    failing: HashMap<String, TransportError>,
    /// Split raw payloads into writes of this many bytes, yielding between them.
    chunk: Option<usize>,
    next_channel: AtomicUsize,
    open: Arc<Mutex<Vec<String>>>,
    /// Keys of channels that were closed, in order.
    pub closed: Arc<Mutex<Vec<String>>>,
    pub max_open_per_target: Arc<AtomicUsize>,
    pub writes: Arc<Mutex<Vec<Write>>>,
    pub payloads: Arc<Mutex<Vec<(TransportTarget, Payload)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(mut self, target: &TransportTarget) -> Self {
        self.unavailable.insert(target.key());
        self
    }

    pub fn failing_send(mut self, target: &TransportTarget, error: TransportError) -> Self {
        self.failing.insert(target.key(), error);
        self
    }

    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk = Some(size);
        self
    }

    pub fn payloads(&self) -> Vec<(TransportTarget, Payload)> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

struct RecorderChannel {
    id: usize,
    key: String,
    target: TransportTarget,
    chunk: Option<usize>,
    failure: Option<TransportError>,
    open: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Vec<String>>>,
    writes: Arc<Mutex<Vec<Write>>>,
    payloads: Arc<Mutex<Vec<(TransportTarget, Payload)>>>,
}

#[async_trait]
impl Channel for RecorderChannel {
    async fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.payloads
            .lock()
            .unwrap()
            .push((self.target.clone(), payload.clone()));
        if let Payload::Raw(bytes) = payload {
            let size = self.chunk.unwrap_or(bytes.len().max(1));
            for piece in bytes.chunks(size) {
                self.writes.lock().unwrap().push(Write {
                    channel: self.id,
                    target: self.key.clone(),
                    bytes: piece.to_vec(),
                });
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let mut open = self.open.lock().unwrap();
        if let Some(pos) = open.iter().position(|k| *k == self.key) {
            open.remove(pos);
        }
        self.closed.lock().unwrap().push(self.key.clone());
        Ok(())
    }
}

#[async_trait]
impl Connector for Recorder {
    async fn open(&self, target: &TransportTarget) -> Result<Box<dyn Channel>, TransportError> {
        let key = target.key();
        if self.unavailable.contains(&key) {
            return Err(TransportError::Unavailable(format!("{target} not found")));
        }
        {
            let mut open = self.open.lock().unwrap();
            open.push(key.clone());
            let same = open.iter().filter(|k| **k == key).count();
            self.max_open_per_target.fetch_max(same, Ordering::SeqCst);
        }
        let failure = self.failing.get(&key).cloned();
        Ok(Box::new(RecorderChannel {
            id: self.next_channel.fetch_add(1, Ordering::SeqCst),
            key,
            target: target.clone(),
            chunk: self.chunk,
            failure,
            open: Arc::clone(&self.open),
            closed: Arc::clone(&self.closed),
            writes: Arc::clone(&self.writes),
            payloads: Arc::clone(&self.payloads),
        }))
    }
}
