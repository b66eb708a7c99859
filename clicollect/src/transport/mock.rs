//! Scripted in-memory transport for driving sessions under tokio's paused clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use super::Transport;
use crate::error::{Result, TransportError};

#[derive(Debug, Clone)]
enum MockEvent {
    Data(Bytes),
    Disconnect,
}

/// One scheduled event, relative to the moment its trigger fired.
#[derive(Debug, Clone)]
pub(crate) struct Emit {
    after: Duration,
    event: MockEvent,
}

impl Emit {
    pub(crate) fn data(after: Duration, data: impl Into<Bytes>) -> Self {
        Self {
            after,
            event: MockEvent::Data(data.into()),
        }
    }

    pub(crate) fn disconnect(after: Duration) -> Self {
        Self {
            after,
            event: MockEvent::Disconnect,
        }
    }
}

/// What the fake appliance does, and when.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockScript {
    reject_auth: bool,
    on_open: Vec<Emit>,
    on_send: Vec<(String, Vec<Emit>)>,
}

impl MockScript {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reject_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    /// Emit `data` this long after open.
    pub(crate) fn emit(mut self, after: Duration, data: impl Into<Bytes>) -> Self {
        self.on_open.push(Emit::data(after, data));
        self
    }

    /// React to a sent line (line ending stripped) with timed emits.
    pub(crate) fn on_line(mut self, line: impl Into<String>, emits: Vec<Emit>) -> Self {
        self.on_send.push((line.into(), emits));
        self
    }

    /// React to `line` with one `byte` every `interval`, `count` times.
    pub(crate) fn drip(
        self,
        line: impl Into<String>,
        byte: u8,
        interval: Duration,
        count: u32,
    ) -> Self {
        let emits = (1..=count)
            .map(|i| Emit::data(interval * i, vec![byte]))
            .collect();
        self.on_line(line, emits)
    }
}

/// Observations a test can make after the driver has taken the transport.
#[derive(Debug, Default)]
pub(crate) struct MockLog {
    pub(crate) sent: Vec<String>,
    pub(crate) opens: usize,
    pub(crate) closes: usize,
    pub(crate) open: bool,
}

pub(crate) struct MockTransport {
    script: MockScript,
    pending: VecDeque<(Instant, MockEvent)>,
    log: Arc<Mutex<MockLog>>,
    open: bool,
}

impl MockTransport {
    pub(crate) fn new(script: MockScript) -> Self {
        Self {
            script,
            pending: VecDeque::new(),
            log: Arc::new(Mutex::new(MockLog::default())),
            open: false,
        }
    }

    pub(crate) fn log(&self) -> Arc<Mutex<MockLog>> {
        self.log.clone()
    }

    fn schedule(&mut self, emits: &[Emit]) {
        let now = Instant::now();
        for emit in emits {
            self.pending.push_back((now + emit.after, emit.event.clone()));
        }
        self.pending.make_contiguous().sort_by_key(|(due, _)| *due);
    }
}

impl Transport for MockTransport {
    async fn open(&mut self) -> Result<()> {
        self.log.lock().unwrap().opens += 1;
        if self.script.reject_auth {
            return Err(TransportError::AuthenticationFailed {
                user: "admin".into(),
            }
            .into());
        }
        self.open = true;
        self.log.lock().unwrap().open = true;
        let emits = self.script.on_open.clone();
        self.schedule(&emits);
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(TransportError::NotOpen.into());
        }
        let line = String::from_utf8_lossy(data)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.log.lock().unwrap().sent.push(line.clone());

        if let Some(idx) = self.script.on_send.iter().position(|(l, _)| *l == line) {
            let (_, emits) = self.script.on_send.remove(idx);
            self.schedule(&emits);
        }
        Ok(())
    }

    async fn receive(&mut self, wait: Duration) -> Result<Option<Vec<u8>>> {
        if !self.open {
            return Err(TransportError::NotOpen.into());
        }
        let deadline = Instant::now() + wait;
        match self.pending.front() {
            Some((due, _)) if *due <= deadline => {
                tokio::time::sleep_until(*due).await;
                match self.pending.pop_front().map(|(_, event)| event) {
                    Some(MockEvent::Data(data)) => Ok(Some(data.to_vec())),
                    Some(MockEvent::Disconnect) => Err(TransportError::Disconnected.into()),
                    None => Ok(None),
                }
            }
            _ => {
                tokio::time::sleep_until(deadline).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.closes += 1;
        log.open = false;
        self.open = false;
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
