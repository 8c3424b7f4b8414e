use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::api::LoadError;
use crate::graph::{GraphSnapshot, GraphStats};

type Delivery = (u64, Result<GraphSnapshot, LoadError>);

/// Runs snapshot fetches off the UI thread. Every request shares one channel
/// and carries a generation; only the newest generation is ever applied.
pub(in crate::app) struct SnapshotLoader {
    tx: Sender<Delivery>,
    rx: Receiver<Delivery>,
    generation: u64,
    worker: Option<JoinHandle<()>>,
}

impl SnapshotLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            generation: 0,
            worker: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts a fetch and makes it the current generation; results of earlier
    /// requests still in flight will be discarded.
    pub fn request<F>(&mut self, fetch: F) -> u64
    where
        F: FnOnce() -> Result<GraphSnapshot, LoadError> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();

        info!(generation, "snapshot load requested");
        self.worker = Some(thread::spawn(move || {
            let _ = tx.send((generation, fetch()));
        }));
        generation
    }

    /// Makes any in-flight fetch stale.
    pub fn cancel(&mut self) {
        if self.worker.take().is_some() {
            debug!(generation = self.generation, "snapshot load cancelled");
        }
        self.generation += 1;
    }

    /// Returns the current request's result once it arrives.
    pub fn poll(&mut self) -> Option<Result<GraphSnapshot, LoadError>> {
        self.worker.as_ref()?;

        if let Some(result) = self.drain() {
            return Some(result);
        }

        let finished = self.worker.as_ref().is_some_and(JoinHandle::is_finished);
        if !finished {
            return None;
        }

        // the worker may have sent right before finishing
        if let Some(result) = self.drain() {
            return Some(result);
        }

        self.worker = None;
        warn!(generation = self.generation, "snapshot load worker exited without a result");
        Some(Err(LoadError::Disconnected))
    }

    fn drain(&mut self) -> Option<Result<GraphSnapshot, LoadError>> {
        loop {
            match self.rx.try_recv() {
                Ok((generation, result)) if generation == self.generation => {
                    self.worker = None;
                    match &result {
                        Ok(snapshot) => info!(
                            generation,
                            nodes = snapshot.nodes().len(),
                            edges = snapshot.edges().len(),
                            "snapshot loaded"
                        ),
                        Err(error) => warn!(generation, %error, "snapshot load failed"),
                    }
                    return Some(result);
                }
                Ok((generation, _)) => {
                    debug!(generation, current = self.generation, "discarded stale snapshot");
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }
}

const STOP_CHECK: Duration = Duration::from_millis(50);

/// Polls graph statistics on a background thread until stopped or dropped.
pub(in crate::app) struct StatsPoller {
    rx: Receiver<GraphStats>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl StatsPoller {
    pub fn spawn<F>(interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Result<GraphStats, LoadError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let worker = thread::spawn(move || {
            while !worker_stop.load(Ordering::Relaxed) {
                match fetch() {
                    Ok(stats) => {
                        if tx.send(stats).is_err() {
                            break;
                        }
                    }
                    Err(error) => warn!(%error, "stats poll failed"),
                }

                let next_poll = Instant::now() + interval;
                while !worker_stop.load(Ordering::Relaxed) {
                    let now = Instant::now();
                    if now >= next_poll {
                        break;
                    }
                    thread::sleep(STOP_CHECK.min(next_poll - now));
                }
            }
            debug!("stats poller stopped");
        });

        Self {
            rx,
            stop,
            worker: Some(worker),
        }
    }

    /// Newest figures received since the last call, if any.
    pub fn latest(&mut self) -> Option<GraphStats> {
        self.rx.try_iter().last()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // a fetch in progress can take up to the request timeout; don't wait for it
        self.worker.take();
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
