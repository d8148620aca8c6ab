//! Dedicated thread owning one display
//!
//! The transport blocks while it waits for acknowledgements, so the display
//! lives on its own OS thread. Async callers send closures over a bounded
//! channel and get results back on a oneshot. Between requests the worker
//! flushes the framebuffer every refresh interval and broadcasts key presses.
//! The thread waits on the request channel with a small current-thread
//! runtime so the wait ends at the next refresh deadline.

use cfontz_display::{Driver, Key};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Buffered key events per subscriber before the slowest one lags
const KEY_CHANNEL_CAPACITY: usize = 64;

/// Queued requests before `call` waits for the worker to catch up
const REQUEST_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn display worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("display worker has stopped")]
    Stopped,

    #[error("display worker panicked")]
    Panicked,
}

/// What the refresh loop has done so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub ticks: u64,
    pub flush_errors: u64,
    pub keys: u64,
    pub last_error: Option<String>,
}

type Job<D> = Box<dyn FnOnce(&mut D) + Send>;

pub struct DisplayWorker<D: Driver + 'static> {
    requests: mpsc::Sender<Job<D>>,
    keys: broadcast::Sender<Key>,
    status: Arc<Mutex<WorkerStatus>>,
    thread: JoinHandle<D>,
}

impl<D: Driver + 'static> DisplayWorker<D> {
    /// Move `display` onto a new thread that refreshes it every `refresh`
    pub fn spawn(display: D, refresh: Duration) -> Result<Self, WorkerError> {
        let (requests, rx) = mpsc::channel::<Job<D>>(REQUEST_CHANNEL_CAPACITY);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(WorkerError::Spawn)?;
        let (keys, _) = broadcast::channel(KEY_CHANNEL_CAPACITY);
        let status = Arc::new(Mutex::new(WorkerStatus::default()));

        let thread = {
            let keys = keys.clone();
            let status = Arc::clone(&status);
            std::thread::Builder::new()
                .name("cfontz-worker".to_string())
                .spawn(move || run(display, runtime, rx, refresh, keys, status))
                .map_err(WorkerError::Spawn)?
        };

        Ok(Self {
            requests,
            keys,
            status,
            thread,
        })
    }

    /// Run `f` on the worker thread and return its result
    pub async fn call<R, F>(&self, f: F) -> Result<R, WorkerError>
    where
        R: Send + 'static,
        F: FnOnce(&mut D) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<D> = Box::new(move |display| {
            let _ = tx.send(f(display));
        });
        self.requests
            .send(job)
            .await
            .map_err(|_| WorkerError::Stopped)?;
        rx.await.map_err(|_| WorkerError::Stopped)
    }

    pub fn subscribe_keys(&self) -> broadcast::Receiver<Key> {
        self.keys.subscribe()
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.lock().clone()
    }

    /// Stop the refresh loop and hand the display back
    pub async fn shutdown(self) -> Result<D, WorkerError> {
        let Self {
            requests, thread, ..
        } = self;
        drop(requests);
        tokio::task::spawn_blocking(move || thread.join())
            .await
            .map_err(|_| WorkerError::Panicked)?
            .map_err(|_| WorkerError::Panicked)
    }
}

fn run<D: Driver>(
    mut display: D,
    runtime: Runtime,
    mut rx: mpsc::Receiver<Job<D>>,
    refresh: Duration,
    keys: broadcast::Sender<Key>,
    status: Arc<Mutex<WorkerStatus>>,
) -> D {
    info!("Display worker started ({}ms refresh)", refresh.as_millis());
    let mut next_tick = Instant::now() + refresh;

    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match runtime.block_on(tokio::time::timeout(wait, rx.recv())) {
            Ok(Some(job)) => job(&mut display),
            Ok(None) => break,
            Err(_elapsed) => {}
        }

        if Instant::now() >= next_tick {
            tick(&mut display, &keys, &status);
            next_tick = Instant::now() + refresh;
        }
    }

    info!("Display worker stopped");
    display
}

/// Push pending drawing to the module and publish any key presses
fn tick<D: Driver>(
    display: &mut D,
    keys: &broadcast::Sender<Key>,
    status: &Mutex<WorkerStatus>,
) {
    let result = display.flush();
    let pressed: Vec<Key> = std::iter::from_fn(|| display.get_key()).collect();

    let mut status = status.lock();
    status.ticks += 1;
    status.keys += pressed.len() as u64;
    if let Err(e) = result {
        warn!("Flush failed: {}", e);
        status.flush_errors += 1;
        status.last_error = Some(e.to_string());
    }
    drop(status);

    for key in pressed {
        debug!("Key {}", key);
        // no subscribers is fine
        let _ = keys.send(key);
    }
}
