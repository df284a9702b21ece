use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::transport::Connection;

#[derive(Debug, Default)]
struct Script {
    inbound: VecDeque<Result<Vec<u8>, io::ErrorKind>>,
    sent: Vec<Vec<u8>>,
    write_limit: Option<usize>,
}

/// In-memory [`Connection`] driven by the test.
///
/// Reads pop queued datagrams in order and wait while the queue is empty;
/// writes are recorded. Clones share one script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
    arrived: Arc<Notify>,
}

impl ScriptedConnection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one inbound datagram.
    pub fn push_inbound(&self, datagram: Vec<u8>) {
        self.script().inbound.push_back(Ok(datagram));
        self.arrived.notify_one();
    }

    /// Queues one failing read.
    pub fn push_recv_error(&self, kind: io::ErrorKind) {
        self.script().inbound.push_back(Err(kind));
        self.arrived.notify_one();
    }

    /// Number of queued reads not yet consumed.
    #[must_use]
    pub fn pending_inbound(&self) -> usize {
        self.script().inbound.len()
    }

    /// Every datagram written so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.script().sent.clone()
    }

    /// Caps the byte count reported by later writes.
    pub fn limit_writes_to(&self, limit: usize) {
        self.script().write_limit = Some(limit);
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        let mut script = self.script();
        script.sent.push(datagram.to_vec());
        Ok(script
            .write_limit
            .map_or(datagram.len(), |limit| limit.min(datagram.len())))
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let notified = self.arrived.notified();
            let next = self.script().inbound.pop_front();
            match next {
                Some(Ok(datagram)) => {
                    let len = datagram.len().min(buf.len());
                    buf[..len].copy_from_slice(&datagram[..len]);
                    return Ok(len);
                }
                Some(Err(kind)) => return Err(io::Error::from(kind)),
                None => notified.await,
            }
        }
    }
}
