// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Worker threads owned by a component for long-running work.
//!
//! A worker has no Proxies or Stubs; it consumes [`WorkerMessage`]s posted by
//! its component and reports back through a [`super::ThreadPort`] if needed.

use super::dispatcher::Heartbeat;
use crate::component::WorkerThreadEntry;
use crate::config::{DispatcherConfig, WORKER_THREAD_PREFIX};
use crate::error::{Error, Result};
use crate::stream::SharedBuffer;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Message posted to a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMessage {
    pub id: u32,
    pub data: SharedBuffer,
}

impl WorkerMessage {
    pub fn new(id: u32, data: SharedBuffer) -> Self {
        Self { id, data }
    }
}

/// Code running on a worker thread.
pub trait WorkerConsumer: Send {
    fn on_start(&mut self, _worker: &str) {}

    fn on_message(&mut self, message: WorkerMessage);

    fn on_stop(&mut self) {}
}

enum WorkerEnvelope {
    Message(WorkerMessage),
    Exit,
}

/// Running worker thread. Dropping it stops the thread.
pub struct WorkerThread {
    name: String,
    sender: Sender<WorkerEnvelope>,
    handle: Option<JoinHandle<()>>,
    heartbeat: Arc<Heartbeat>,
}

impl WorkerThread {
    pub fn spawn(
        entry: &WorkerThreadEntry,
        consumer: Box<dyn WorkerConsumer>,
        config: DispatcherConfig,
    ) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let heartbeat = Arc::new(Heartbeat::new());
        let tick = entry.watchdog().and(config.idle_tick);
        let name = entry.name().to_string();

        let loop_name = name.clone();
        let loop_heartbeat = Arc::clone(&heartbeat);
        let handle = thread::Builder::new()
            .name(format!("{}-{}", WORKER_THREAD_PREFIX, entry.local_name()))
            .spawn(move || worker_loop(&loop_name, consumer, receiver, loop_heartbeat, tick))
            .map_err(|e| Error::SpawnFailed(format!("{}: {}", name, e)))?;

        log::info!("[worker] {} started ({})", name, entry.consumer());
        Ok(Self {
            name,
            sender,
            handle: Some(handle),
            heartbeat,
        })
    }

    /// Qualified name (`<thread>::<worker>`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heartbeat(&self) -> &Arc<Heartbeat> {
        &self.heartbeat
    }

    pub fn post(&self, message: WorkerMessage) -> Result<()> {
        self.sender
            .send(WorkerEnvelope::Message(message))
            .map_err(|_| Error::QueueClosed(self.name.clone()))
    }

    /// Process queued messages, call `on_stop` and join.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.sender.send(WorkerEnvelope::Exit);
        if handle.join().is_err() {
            log::error!("[worker] {} panicked", self.name);
        }
        log::info!("[worker] {} stopped", self.name);
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThread")
            .field("name", &self.name)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

fn worker_loop(
    name: &str,
    mut consumer: Box<dyn WorkerConsumer>,
    receiver: Receiver<WorkerEnvelope>,
    heartbeat: Arc<Heartbeat>,
    tick: Option<Duration>,
) {
    consumer.on_start(name);
    loop {
        let envelope = match tick {
            Some(tick) => match receiver.recv_deadline(Instant::now() + tick) {
                Ok(envelope) => envelope,
                Err(RecvTimeoutError::Timeout) => {
                    heartbeat.beat();
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match receiver.recv() {
                Ok(envelope) => envelope,
                Err(_) => break,
            },
        };
        heartbeat.beat();
        match envelope {
            WorkerEnvelope::Message(message) => consumer.on_message(message),
            WorkerEnvelope::Exit => break,
        }
    }
    consumer.on_stop();
}
