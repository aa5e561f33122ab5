// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatcher threads: one cooperative event loop per OS thread.
//!
//! # Architecture
//!
//! ```text
//! any thread ──ThreadPort::send_event──> crossbeam inbox ──> run_loop ──> ThreadContext
//!                                        (MPSC, FIFO)          │
//!                                                              └─> Heartbeat (watchdog)
//! ```
//!
//! Each envelope runs to completion before the next is taken. Threads with a
//! watchdog wait in slices of [`DispatcherConfig::idle_tick`] and refresh their
//! heartbeat while idle.

use super::context::ThreadContext;
use super::router::ServiceRouter;
use crate::config::DispatcherConfig;
use crate::error::{Error, Result};
use crate::event::ServiceEvent;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Closure executed on a dispatcher thread with access to its context.
pub type ThreadTask = Box<dyn FnOnce(&mut ThreadContext) + Send>;

/// Inbox item.
pub(crate) enum Envelope {
    Event(ServiceEvent),
    Task(ThreadTask),
    Exit,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Envelope::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Envelope::Task(_) => f.write_str("Task"),
            Envelope::Exit => f.write_str("Exit"),
        }
    }
}

/// Sending side of a dispatcher inbox. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct ThreadPort {
    name: Arc<str>,
    sender: Sender<Envelope>,
}

impl ThreadPort {
    pub(crate) fn new(name: &str, sender: Sender<Envelope>) -> Self {
        Self {
            name: Arc::from(name),
            sender,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue an event. Fails once the thread has stopped.
    pub fn send_event(&self, event: ServiceEvent) -> Result<()> {
        self.send(Envelope::Event(event))
    }

    /// Run `task` on the dispatcher thread after already queued work.
    pub fn post_task<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&mut ThreadContext) + Send + 'static,
    {
        self.post_boxed(Box::new(task))
    }

    pub(crate) fn post_boxed(&self, task: ThreadTask) -> Result<()> {
        self.send(Envelope::Task(task))
    }

    pub(crate) fn send_exit(&self) -> bool {
        self.sender.send(Envelope::Exit).is_ok()
    }

    pub(crate) fn same_port(&self, other: &ThreadPort) -> bool {
        self.sender.same_channel(&other.sender)
    }

    fn send(&self, envelope: Envelope) -> Result<()> {
        self.sender
            .send(envelope)
            .map_err(|_| Error::QueueClosed(self.name.to_string()))
    }
}

impl fmt::Debug for ThreadPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPort")
            .field("name", &self.name)
            .field("queued", &self.sender.len())
            .finish()
    }
}

/// Liveness signal read by an external watchdog.
#[derive(Debug)]
pub struct Heartbeat {
    last: Mutex<Instant>,
    beats: AtomicU64,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(Instant::now()),
            beats: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn beat(&self) {
        *self.last.lock() = Instant::now();
        self.beats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_beat(&self) -> Instant {
        *self.last.lock()
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.last_beat().elapsed()
    }

    /// `true` if no beat happened within `timeout`.
    pub fn is_stalled(&self, timeout: Duration) -> bool {
        self.elapsed() > timeout
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned dispatcher thread. Dropping it stops the thread.
pub struct DispatcherThread {
    port: ThreadPort,
    handle: Option<JoinHandle<()>>,
    heartbeat: Arc<Heartbeat>,
    watchdog: Option<Duration>,
    router: Arc<ServiceRouter>,
}

impl DispatcherThread {
    /// Register `name` with the router and start its loop.
    pub fn spawn(
        name: &str,
        router: Arc<ServiceRouter>,
        config: DispatcherConfig,
        watchdog: Option<Duration>,
    ) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let port = ThreadPort::new(name, sender);
        router.register_thread(port.clone())?;

        let heartbeat = Arc::new(Heartbeat::new());
        let tick = watchdog.and(config.idle_tick);

        let loop_port = port.clone();
        let loop_router = Arc::clone(&router);
        let loop_heartbeat = Arc::clone(&heartbeat);
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let context = ThreadContext::new(loop_port, loop_router, config);
            run_loop(context, receiver, loop_heartbeat, tick);
        });

        match spawned {
            Ok(handle) => {
                log::info!("[dispatcher] thread {} started", name);
                Ok(Self {
                    port,
                    handle: Some(handle),
                    heartbeat,
                    watchdog,
                    router,
                })
            }
            Err(e) => {
                router.unregister_port(&port);
                Err(Error::SpawnFailed(format!("{}: {}", name, e)))
            }
        }
    }

    pub fn name(&self) -> &str {
        self.port.name()
    }

    pub fn port(&self) -> &ThreadPort {
        &self.port
    }

    pub fn heartbeat(&self) -> &Arc<Heartbeat> {
        &self.heartbeat
    }

    pub fn watchdog(&self) -> Option<Duration> {
        self.watchdog
    }

    /// Run `task` on this thread.
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&mut ThreadContext) + Send + 'static,
    {
        self.port.post_task(task)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Drain already queued work, shut the context down and join.
    ///
    /// Called from the thread itself, only the exit is queued.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.port.send_exit();
        if handle.thread().id() != thread::current().id() && handle.join().is_err() {
            log::error!("[dispatcher] thread {} panicked", self.port.name());
        }
        self.router.unregister_port(&self.port);
        log::info!("[dispatcher] thread {} stopped", self.port.name());
    }
}

impl Drop for DispatcherThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for DispatcherThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherThread")
            .field("name", &self.port.name())
            .field("running", &self.is_running())
            .field("watchdog", &self.watchdog)
            .finish()
    }
}

fn run_loop(
    mut context: ThreadContext,
    receiver: Receiver<Envelope>,
    heartbeat: Arc<Heartbeat>,
    tick: Option<Duration>,
) {
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
            Envelope::Event(event) => context.dispatch(event),
            Envelope::Task(task) => task(&mut context),
            Envelope::Exit => break,
        }
    }
    context.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_task_runs_on_named_thread() {
        let router = Arc::new(ServiceRouter::new());
        let mut thread = DispatcherThread::spawn("disp-T", Arc::clone(&router), DispatcherConfig::default(), None)
            .expect("spawn");
        let (tx, rx) = crossbeam::channel::bounded(1);
        thread
            .post(move |ctx| {
                let os_name = std::thread::current().name().map(str::to_string);
                tx.send((ctx.name().to_string(), os_name)).expect("send");
            })
            .expect("post");
        let (ctx_name, os_name) = rx.recv_timeout(Duration::from_secs(5)).expect("task ran");
        assert_eq!(ctx_name, "disp-T");
        assert_eq!(os_name.as_deref(), Some("disp-T"));

        thread.stop();
        assert!(!router.has_thread("disp-T"));
        assert!(matches!(thread.post(|_| {}), Err(Error::QueueClosed(_))));
    }

    #[test]
    fn test_watchdog_thread_beats_while_idle() {
        let router = Arc::new(ServiceRouter::new());
        let config = DispatcherConfig {
            idle_tick: Some(Duration::from_millis(5)),
        };
        let thread = DispatcherThread::spawn("disp-W", router, config, Some(Duration::from_millis(50)))
            .expect("spawn");
        std::thread::sleep(Duration::from_millis(60));
        assert!(thread.heartbeat().beats() >= 2);
        assert!(!thread.heartbeat().is_stalled(Duration::from_secs(5)));
    }

    #[test]
    fn test_duplicate_name_fails_spawn() {
        let router = Arc::new(ServiceRouter::new());
        let _first = DispatcherThread::spawn("disp-D", Arc::clone(&router), DispatcherConfig::default(), None)
            .expect("spawn");
        let second = DispatcherThread::spawn("disp-D", router, DispatcherConfig::default(), None);
        assert!(matches!(second, Err(Error::DuplicateThread(_))));
    }
}
