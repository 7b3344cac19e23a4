//! Off-thread path queries.
//!
//! [`BackgroundPlanner`] runs pathfinding on a worker thread so a slow
//! search never stalls the movement cadence. Each request gets a generation
//! number; when results arrive, only the one answering the newest request is
//! handed back and everything older is dropped as stale.
//!
//! [`SharedWaypoint`] is the single piece of state a replanning thread and a
//! movement thread need to share.

use crate::follower::Waypoint;
use crate::occupancy::FinePoint;
use crate::pathfinding::{PathResult, PathfindingService};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

struct PlanRequest {
    generation: u64,
    start: FinePoint,
    goal: FinePoint,
}

/// Answer to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResponse {
    pub generation: u64,
    pub start: FinePoint,
    pub goal: FinePoint,
    /// `None` when the service found no path.
    pub path: Option<PathResult>,
}

/// Worker thread answering path requests in order.
pub struct BackgroundPlanner {
    requests: Option<Sender<PlanRequest>>,
    responses: Receiver<PlanResponse>,
    worker: Option<JoinHandle<()>>,
    latest_generation: u64,
    discarded: u64,
}

impl BackgroundPlanner {
    /// Start the worker thread.
    pub fn spawn(service: Arc<dyn PathfindingService>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<PlanRequest>();
        let (response_tx, response_rx) = mpsc::channel();

        let worker = std::thread::spawn(move || {
            // Ends when every sender is dropped.
            for request in request_rx {
                let path = service.find_path(
                    request.start.row,
                    request.start.column,
                    request.goal.row,
                    request.goal.column,
                );
                let response = PlanResponse {
                    generation: request.generation,
                    start: request.start,
                    goal: request.goal,
                    path,
                };
                if response_tx.send(response).is_err() {
                    break;
                }
            }
        });

        Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
            latest_generation: 0,
            discarded: 0,
        }
    }

    /// Queue a search and return its generation. Supersedes every earlier request.
    pub fn request(&mut self, start: FinePoint, goal: FinePoint) -> u64 {
        self.latest_generation += 1;
        let generation = self.latest_generation;
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|tx| tx.send(PlanRequest { generation, start, goal }).is_ok());
        if !sent {
            debug!(generation, "planner worker gone; request dropped");
        }
        generation
    }

    /// Drain finished work without blocking. Returns the response to the
    /// latest request if it has arrived; older responses are discarded.
    pub fn poll(&mut self) -> Option<PlanResponse> {
        let mut current = None;
        while let Ok(response) = self.responses.try_recv() {
            if let Some(result) = self.accept(response) {
                current = Some(result);
            }
        }
        current
    }

    /// Block up to `timeout` for the response to the latest request.
    pub fn wait(&mut self, timeout: Duration) -> Option<PlanResponse> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(result) = self.accept(response) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    fn accept(&mut self, response: PlanResponse) -> Option<PlanResponse> {
        if response.generation == self.latest_generation {
            Some(response)
        } else {
            debug!(
                generation = response.generation,
                latest = self.latest_generation,
                "discarding stale path result"
            );
            self.discarded += 1;
            None
        }
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest_generation
    }

    /// Stale responses dropped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl Drop for BackgroundPlanner {
    fn drop(&mut self) {
        // Closing the request channel stops the worker loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Waypoint slot shared between a replanning and a movement thread.
///
/// For hosts that move the pursuer on their own thread. [`crate::MazeWorld`]
/// moves on the caller's thread and applies plans through
/// [`crate::MazeWorld::apply_plan`], so it never uses this slot.
#[derive(Debug, Clone, Default)]
pub struct SharedWaypoint {
    slot: Arc<Mutex<Option<Waypoint>>>,
}

impl SharedWaypoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock still holds a valid `Option<Waypoint>`, so it is read through.
    pub fn get(&self) -> Option<Waypoint> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, waypoint: Option<Waypoint>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = waypoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::OccupancyGrid;
    use crate::pathfinding::GridSolver;
    use std::sync::Condvar;

    fn solver() -> Arc<dyn PathfindingService> {
        Arc::new(GridSolver::new(Arc::new(OccupancyGrid::empty(10, 10))))
    }

    /// Holds every search until `release` is called.
    struct GatedService {
        inner: GridSolver,
        gate: Arc<(Mutex<bool>, Condvar)>,
    }

    impl PathfindingService for GatedService {
        fn find_path(&self, sr: usize, sc: usize, gr: usize, gc: usize) -> Option<PathResult> {
            let (open, cvar) = &*self.gate;
            let mut guard = open.lock().unwrap();
            while !*guard {
                guard = cvar.wait(guard).unwrap();
            }
            self.inner.find_path(sr, sc, gr, gc)
        }
    }

    fn release(gate: &Arc<(Mutex<bool>, Condvar)>) {
        let (open, cvar) = &**gate;
        *open.lock().unwrap() = true;
        cvar.notify_all();
    }

    #[test]
    fn test_single_request_round_trip() {
        let mut planner = BackgroundPlanner::spawn(solver());
        let generation = planner.request(FinePoint::new(1, 1), FinePoint::new(5, 1));
        assert_eq!(generation, 1);

        let response = planner.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(response.generation, 1);
        assert_eq!(response.path.unwrap().marked_count(), 5);
        assert_eq!(planner.discarded(), 0);
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let service = GatedService {
            inner: GridSolver::new(Arc::new(OccupancyGrid::empty(10, 10))),
            gate: gate.clone(),
        };
        let mut planner = BackgroundPlanner::spawn(Arc::new(service));

        planner.request(FinePoint::new(1, 1), FinePoint::new(2, 1));
        planner.request(FinePoint::new(1, 1), FinePoint::new(3, 1));
        let latest = planner.request(FinePoint::new(1, 1), FinePoint::new(8, 8));
        assert_eq!(latest, 3);
        assert!(planner.poll().is_none());

        release(&gate);
        let response = planner.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(response.generation, latest);
        assert_eq!(response.goal, FinePoint::new(8, 8));
        assert_eq!(planner.discarded(), 2);
    }

    #[test]
    fn test_no_path_is_delivered() {
        let mut grid = OccupancyGrid::empty(6, 6);
        for row in 0..6 {
            grid.block(FinePoint::new(3, row));
        }
        let mut planner = BackgroundPlanner::spawn(Arc::new(GridSolver::new(Arc::new(grid))));
        planner.request(FinePoint::new(0, 0), FinePoint::new(5, 5));
        let response = planner.wait(Duration::from_secs(5)).unwrap();
        assert!(response.path.is_none());
    }

    #[test]
    fn test_wait_times_out_without_request() {
        let mut planner = BackgroundPlanner::spawn(solver());
        assert!(planner.wait(Duration::from_millis(20)).is_none());
        assert_eq!(planner.latest_generation(), 0);
    }

    #[test]
    fn test_drop_joins_worker() {
        let mut planner = BackgroundPlanner::spawn(solver());
        planner.request(FinePoint::new(0, 0), FinePoint::new(9, 9));
        drop(planner);
    }

    #[test]
    fn test_shared_waypoint_across_threads() {
        let shared = SharedWaypoint::new();
        assert_eq!(shared.get(), None);

        let writer = shared.clone();
        std::thread::spawn(move || writer.set(Some(Waypoint::new(4.0, 2.0))))
            .join()
            .unwrap();
        assert_eq!(shared.get(), Some(Waypoint::new(4.0, 2.0)));

        shared.set(None);
        assert_eq!(shared.get(), None);
    }
}
