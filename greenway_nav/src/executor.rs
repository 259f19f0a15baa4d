// Where path searches run: on the calling thread, or on a worker thread fed
// through an `mpsc` channel.
//
// Both executors take an `Arc<NavSnapshot>` plus a request and hand back a
// `PendingPath`. The search code is the same either way; only the delivery
// differs. `SyncExecutor` computes immediately and returns an already-ready
// handle. `ThreadedExecutor` owns one worker thread that pulls jobs off a
// channel, searches the job's snapshot and sends the result back on a
// per-request reply channel. The caller polls the handle from its own tick
// loop, the same non-blocking pattern as a network client draining its inbox.
//
// Failure model: if the worker dies (or is aborted) every request still in
// its queue sees `BridgeError::WorkerLost` when polled, never a silent drop.
// `PathBridge` is what the world talks to: it notices a dead executor, logs
// once, and serves all later requests synchronously. Dropping a
// `PendingPath` cancels interest; the worker's reply send then fails and is
// ignored.
//
// See also: `snapshot.rs` (the immutable data searched off-thread),
// `world.rs` (`request_path_async`).

use crate::error::BridgeError;
use crate::pathfinding::{Path, PathRequest};
use crate::snapshot::NavSnapshot;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Runs path searches against snapshots.
pub trait PathExecutor: Send {
    /// Dispatch one request. `Err(WorkerLost)` if the executor can no
    /// longer accept work.
    fn submit(
        &mut self,
        snapshot: Arc<NavSnapshot>,
        request: PathRequest,
    ) -> Result<PendingPath, BridgeError>;

    /// Whether `submit` can still succeed.
    fn is_alive(&self) -> bool;

    /// Whether results arrive later rather than immediately.
    fn is_async(&self) -> bool;
}

// ---------------------------------------------------------------------------
// PendingPath
// ---------------------------------------------------------------------------

/// Observed state of a `PendingPath`.
#[derive(Clone, Debug, PartialEq)]
pub enum PathStatus {
    /// Still being computed.
    Pending,
    /// The search finished; `None` means no path exists.
    Ready(Option<Path>),
    /// The result was already handed out by an earlier `poll`.
    Taken,
}

enum PendingState {
    Ready(Option<Path>),
    Waiting(Receiver<Option<Path>>),
    Taken,
}

/// Handle to a path result that may not exist yet.
pub struct PendingPath {
    state: PendingState,
}

impl PendingPath {
    pub fn ready(path: Option<Path>) -> Self {
        Self {
            state: PendingState::Ready(path),
        }
    }

    pub fn waiting(reply: Receiver<Option<Path>>) -> Self {
        Self {
            state: PendingState::Waiting(reply),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, PendingState::Ready(_))
    }

    /// Non-blocking check. Returns the result once, then `Taken`.
    pub fn poll(&mut self) -> Result<PathStatus, BridgeError> {
        match std::mem::replace(&mut self.state, PendingState::Taken) {
            PendingState::Taken => Ok(PathStatus::Taken),
            PendingState::Ready(path) => Ok(PathStatus::Ready(path)),
            PendingState::Waiting(rx) => match rx.try_recv() {
                Ok(path) => Ok(PathStatus::Ready(path)),
                Err(TryRecvError::Empty) => {
                    self.state = PendingState::Waiting(rx);
                    Ok(PathStatus::Pending)
                }
                Err(TryRecvError::Disconnected) => Err(BridgeError::WorkerLost),
            },
        }
    }

    /// Block until the result arrives.
    pub fn wait(self) -> Result<Option<Path>, BridgeError> {
        match self.state {
            PendingState::Ready(path) => Ok(path),
            PendingState::Waiting(rx) => rx.recv().map_err(|_| BridgeError::WorkerLost),
            PendingState::Taken => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

/// Searches on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncExecutor;

impl PathExecutor for SyncExecutor {
    fn submit(
        &mut self,
        snapshot: Arc<NavSnapshot>,
        request: PathRequest,
    ) -> Result<PendingPath, BridgeError> {
        Ok(PendingPath::ready(snapshot.find_path(&request)))
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn is_async(&self) -> bool {
        false
    }
}

enum WorkerMessage {
    Search {
        snapshot: Arc<NavSnapshot>,
        request: PathRequest,
        reply: Sender<Option<Path>>,
    },
    /// Exit immediately, abandoning queued searches.
    Abort,
}

/// Searches on one dedicated worker thread.
pub struct ThreadedExecutor {
    jobs: Option<Sender<WorkerMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedExecutor {
    /// Spawn the worker. Falls back to a dead executor (every submit fails)
    /// if the OS refuses the thread.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        match thread::Builder::new()
            .name("greenway-path-worker".into())
            .spawn(move || worker_loop(rx))
        {
            Ok(handle) => Self {
                jobs: Some(tx),
                worker: Some(handle),
            },
            Err(e) => {
                warn!("could not spawn path worker: {e}");
                Self {
                    jobs: None,
                    worker: None,
                }
            }
        }
    }

    /// Stop the worker without finishing its queue. Requests still queued
    /// resolve to `BridgeError::WorkerLost`.
    pub fn abort(&mut self) {
        if let Some(jobs) = self.jobs.take() {
            let _ = jobs.send(WorkerMessage::Abort);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl PathExecutor for ThreadedExecutor {
    fn submit(
        &mut self,
        snapshot: Arc<NavSnapshot>,
        request: PathRequest,
    ) -> Result<PendingPath, BridgeError> {
        let jobs = self.jobs.as_ref().ok_or(BridgeError::WorkerLost)?;
        let (reply, rx) = mpsc::channel();
        if jobs
            .send(WorkerMessage::Search {
                snapshot,
                request,
                reply,
            })
            .is_err()
        {
            self.jobs = None;
            return Err(BridgeError::WorkerLost);
        }
        Ok(PendingPath::waiting(rx))
    }

    fn is_alive(&self) -> bool {
        self.jobs.is_some() && self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    fn is_async(&self) -> bool {
        true
    }
}

impl Drop for ThreadedExecutor {
    fn drop(&mut self) {
        // Closing the job channel lets the worker finish its queue and exit.
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(rx: Receiver<WorkerMessage>) {
    for message in rx {
        match message {
            WorkerMessage::Search {
                snapshot,
                request,
                reply,
            } => {
                // A dropped receiver means the requester lost interest.
                let _ = reply.send(snapshot.find_path(&request));
            }
            WorkerMessage::Abort => break,
        }
    }
    debug!("path worker exiting");
}

// ---------------------------------------------------------------------------
// PathBridge
// ---------------------------------------------------------------------------

/// Routes requests to the configured executor, degrading to synchronous
/// searches for good once that executor is lost.
pub struct PathBridge {
    executor: Box<dyn PathExecutor>,
    fell_back: bool,
}

impl PathBridge {
    pub fn new(executor: Box<dyn PathExecutor>) -> Self {
        Self {
            executor,
            fell_back: false,
        }
    }

    pub fn sync() -> Self {
        Self::new(Box::new(SyncExecutor))
    }

    pub fn threaded() -> Self {
        Self::new(Box::new(ThreadedExecutor::spawn()))
    }

    /// True while requests are still going to an off-thread executor.
    pub fn is_async(&self) -> bool {
        !self.fell_back && self.executor.is_async()
    }

    pub fn request(&mut self, snapshot: Arc<NavSnapshot>, request: PathRequest) -> PendingPath {
        if !self.fell_back {
            if self.executor.is_alive() {
                match self.executor.submit(Arc::clone(&snapshot), request.clone()) {
                    Ok(pending) => return pending,
                    Err(e) => self.fall_back(e),
                }
            } else {
                self.fall_back(BridgeError::WorkerLost);
            }
        }
        PendingPath::ready(snapshot.find_path(&request))
    }

    fn fall_back(&mut self, cause: BridgeError) {
        warn!("path executor unavailable ({cause}), searching synchronously from now on");
        self.fell_back = true;
    }
}

impl Default for PathBridge {
    fn default() -> Self {
        Self::sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::nav_grid::NavGrid;
    use crate::obstacle::ObstacleSet;
    use crate::rebuild::{RebuildContext, full_rebuild};
    use crate::regions::ConnectivityIndex;
    use crate::terrain::TerrainLayer;
    use crate::types::{Movement, WorldPos};

    fn snapshot() -> Arc<NavSnapshot> {
        let config = NavConfig {
            cols: 16,
            rows: 16,
            cell_size: 1.0,
            section_size: 4,
            ..NavConfig::default()
        };
        let terrain = TerrainLayer::new(16, 16, &config.costs);
        let mut grid = NavGrid::new(&config);
        let mut regions = ConnectivityIndex::new(&grid);
        full_rebuild(&mut RebuildContext {
            grid: &mut grid,
            regions: &mut regions,
            terrain: &terrain,
            obstacles: &ObstacleSet::new(),
            costs: &config.costs,
        });
        Arc::new(NavSnapshot::capture(&grid, &regions, Movement::Cardinal))
    }

    fn request() -> PathRequest {
        PathRequest::new(WorldPos::new(0.5, 0.5), WorldPos::new(12.5, 9.5))
    }

    #[test]
    fn sync_executor_is_ready_immediately() {
        let snap = snapshot();
        let mut pending = SyncExecutor.submit(Arc::clone(&snap), request()).unwrap();
        assert!(pending.is_ready());
        let expected = snap.find_path(&request());
        assert_eq!(pending.poll(), Ok(PathStatus::Ready(expected)));
        assert_eq!(pending.poll(), Ok(PathStatus::Taken));
    }

    #[test]
    fn threaded_matches_sync() {
        let snap = snapshot();
        let mut executor = ThreadedExecutor::spawn();
        assert!(executor.is_alive());
        let pending = executor.submit(Arc::clone(&snap), request()).unwrap();
        assert_eq!(pending.wait(), Ok(snap.find_path(&request())));
    }

    #[test]
    fn dropped_handles_do_not_stall_the_worker() {
        let snap = snapshot();
        let mut executor = ThreadedExecutor::spawn();
        for _ in 0..50 {
            let pending = executor.submit(Arc::clone(&snap), request()).unwrap();
            drop(pending);
        }
        let pending = executor.submit(Arc::clone(&snap), request()).unwrap();
        let path = pending.wait().unwrap();
        assert!(path.is_some());
        assert_eq!(path, snap.find_path(&request()));
        assert!(executor.is_alive());
    }

    #[test]
    fn poll_eventually_delivers() {
        let snap = snapshot();
        let mut executor = ThreadedExecutor::spawn();
        let mut pending = executor.submit(snap, request()).unwrap();
        loop {
            match pending.poll() {
                Ok(PathStatus::Pending) => thread::yield_now(),
                Ok(PathStatus::Ready(path)) => {
                    assert!(path.is_some());
                    break;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn lost_channel_rejects_in_flight_request() {
        let (tx, rx) = mpsc::channel::<Option<Path>>();
        let mut pending = PendingPath::waiting(rx);
        assert_eq!(pending.poll(), Ok(PathStatus::Pending));
        drop(tx);
        assert_eq!(pending.poll(), Err(BridgeError::WorkerLost));

        let (tx, rx) = mpsc::channel::<Option<Path>>();
        drop(tx);
        assert_eq!(PendingPath::waiting(rx).wait(), Err(BridgeError::WorkerLost));
    }

    #[test]
    fn aborted_worker_never_drops_requests_silently() {
        let snap = snapshot();
        let mut executor = ThreadedExecutor::spawn();
        let pendings: Vec<PendingPath> = (0..20)
            .map(|_| executor.submit(Arc::clone(&snap), request()).unwrap())
            .collect();
        executor.abort();
        assert!(!executor.is_alive());
        for pending in pendings {
            match pending.wait() {
                Ok(path) => assert!(path.is_some()),
                Err(e) => assert_eq!(e, BridgeError::WorkerLost),
            }
        }
        assert_eq!(
            executor.submit(snap, request()).err(),
            Some(BridgeError::WorkerLost)
        );
    }

    #[test]
    fn bridge_falls_back_after_worker_loss() {
        let snap = snapshot();
        let mut executor = ThreadedExecutor::spawn();
        executor.abort();
        let mut bridge = PathBridge::new(Box::new(executor));
        let pending = bridge.request(Arc::clone(&snap), request());
        assert!(pending.is_ready());
        assert!(!bridge.is_async());
        assert_eq!(pending.wait(), Ok(snap.find_path(&request())));
    }

    #[test]
    fn threaded_bridge_stays_async_while_alive() {
        let snap = snapshot();
        let mut bridge = PathBridge::threaded();
        assert!(bridge.is_async());
        let results: Vec<_> = (0..4)
            .map(|_| bridge.request(Arc::clone(&snap), request()))
            .map(PendingPath::wait)
            .collect();
        assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));
    }
}
