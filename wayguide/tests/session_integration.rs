//! Integration tests for the navigation session lifecycle.
//!
//! These tests verify the complete session flows:
//! - Position stream → first fix → Idle, ready to navigate
//! - Start without a known position → error string, no route request
//! - Start → Routing → Navigating with instructions and progress
//! - Routing failure → Idle with the failure surfaced
//! - Arrival detection at the destination radius
//! - Stop idempotence and stale route results after stop
//!
//! Run with: `cargo test --test session_integration`

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wayguide::error::RoutingError;
use wayguide::geo::Point;
use wayguide::route::{Leg, Maneuver, Route, Step};
use wayguide::session::{SessionHandle, SessionRuntime, SessionStatus};
use wayguide::{EngineConfig, Position, ProgressSnapshot, RouteProvider};

// ============================================================================
// Test Helpers
// ============================================================================

/// Provider whose responses are fed through a channel, so tests control
/// exactly when and how each route request resolves.
struct MockRouteProvider {
    responses: tokio::sync::Mutex<mpsc::Receiver<Result<Route, RoutingError>>>,
    requests: AtomicUsize,
}

impl MockRouteProvider {
    fn new() -> (Arc<Self>, mpsc::Sender<Result<Route, RoutingError>>) {
        let (tx, rx) = mpsc::channel(8);
        let provider = Arc::new(Self {
            responses: tokio::sync::Mutex::new(rx),
            requests: AtomicUsize::new(0),
        });
        (provider, tx)
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RouteProvider for MockRouteProvider {
    fn compute_route(
        &self,
        _origin: Position,
        _destination: Point,
    ) -> Pin<Box<dyn Future<Output = Result<Route, RoutingError>> + Send + '_>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let mut responses = self.responses.lock().await;
            responses
                .recv()
                .await
                .unwrap_or(Err(RoutingError::NoRouteFound))
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Two eastbound steps along the equator, ~1.1 km each.
fn two_step_route() -> Route {
    let first = Step {
        instruction: "Head out onto First Avenue".to_owned(),
        name: "First Avenue".to_owned(),
        maneuver: Maneuver::new("depart", None, Point::new(0.0, 0.0)),
        polyline: vec![Point::new(0.0, 0.0), Point::new(0.0, 0.01)],
        distance_m: 1112.0,
        duration_s: 111.0,
    };
    let second = Step {
        instruction: "Turn left onto Second Avenue".to_owned(),
        name: "Second Avenue".to_owned(),
        maneuver: Maneuver::new("turn", Some("left"), Point::new(0.0, 0.01)),
        polyline: vec![Point::new(0.0, 0.01), Point::new(0.0, 0.02)],
        distance_m: 1112.0,
        duration_s: 111.0,
    };
    Route::from_legs(
        vec![Leg {
            steps: vec![first, second],
            distance_m: 2224.0,
            duration_s: 222.0,
        }],
        2224.0,
        222.0,
    )
}

fn destination() -> Point {
    Point::new(0.0, 0.02)
}

/// Spawns a session runtime around a fresh mock provider.
fn spawn_session() -> (
    SessionHandle,
    Arc<MockRouteProvider>,
    mpsc::Sender<Result<Route, RoutingError>>,
    CancellationToken,
) {
    let (provider, responses) = MockRouteProvider::new();
    let (runtime, handle) = SessionRuntime::new(provider.clone(), EngineConfig::default());
    let cancellation = CancellationToken::new();
    tokio::spawn(runtime.run(cancellation.clone()));
    (handle, provider, responses, cancellation)
}

/// Waits until the session status reaches the named state.
async fn wait_for_state(handle: &SessionHandle, want: &str) -> SessionStatus {
    let mut status = handle.watch_status();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if status.borrow().state.name() == want {
                return status.borrow().clone();
            }
            status.changed().await.expect("session alive");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {want}"))
}

/// Pushes a fix and waits for the snapshot computed from it.
///
/// Snapshots published by state transitions (start, stop, route arrival)
/// share the broadcast channel, so this skips forward until it sees the
/// snapshot carrying the pushed coordinates.
async fn push_fix(
    handle: &SessionHandle,
    snapshots: &mut tokio::sync::broadcast::Receiver<ProgressSnapshot>,
    lat: f64,
    lon: f64,
) -> ProgressSnapshot {
    handle.update_position(Position::new(lat, lon));
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = snapshots.recv().await.expect("broadcast alive");
            let from_this_fix = snapshot
                .position
                .is_some_and(|fix| fix.latitude == lat && fix.longitude == lon);
            if from_this_fix {
                return snapshot;
            }
        }
    })
    .await
    .expect("snapshot in time")
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn first_fix_readies_the_session() {
    let (handle, _provider, _responses, cancellation) = spawn_session();
    assert_eq!(handle.status().state.name(), "Searching");

    let mut snapshots = handle.subscribe();
    let snapshot = push_fix(&handle, &mut snapshots, 37.7749, -122.4194).await;
    assert_eq!(snapshot.state.name(), "Idle");

    cancellation.cancel();
}

#[tokio::test]
async fn start_without_position_surfaces_location_error() {
    let (handle, provider, _responses, cancellation) = spawn_session();

    // Stop first so the session sits in Idle with no fix ever received.
    handle.stop_navigation().await;
    wait_for_state(&handle, "Idle").await;

    handle.start_navigation(destination()).await;
    let mut status = handle.watch_status();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if status.borrow().last_error.is_some() {
                return;
            }
            status.changed().await.expect("session alive");
        }
    })
    .await
    .expect("error surfaced");

    let status = handle.status();
    assert_eq!(status.state.name(), "Idle");
    assert_eq!(
        status.last_error.as_deref(),
        Some("Location not available. Please enable GPS.")
    );
    assert_eq!(provider.request_count(), 0);

    cancellation.cancel();
}

#[tokio::test]
async fn valid_route_reaches_navigating_with_instructions() {
    let (handle, provider, responses, cancellation) = spawn_session();
    let mut snapshots = handle.subscribe();

    push_fix(&handle, &mut snapshots, 0.0, 0.0).await;
    handle.start_navigation(destination()).await;
    wait_for_state(&handle, "Routing").await;

    responses.send(Ok(two_step_route())).await.unwrap();
    let status = wait_for_state(&handle, "Navigating").await;

    assert_eq!(provider.request_count(), 1);
    assert!(status.last_error.is_none());
    let snapshot = status.latest.expect("progress snapshot");
    assert_eq!(snapshot.step_index, 0);
    assert!(!snapshot.off_route);
    let current = snapshot.current_instruction.expect("current instruction");
    assert_eq!(current.name, "First Avenue");
    let next = snapshot.next_instruction.expect("next instruction");
    assert_eq!(next.name, "Second Avenue");
    assert!(snapshot.remaining_distance_m > 2000.0);

    cancellation.cancel();
}

#[tokio::test]
async fn routing_failure_returns_to_idle() {
    let (handle, _provider, responses, cancellation) = spawn_session();
    let mut snapshots = handle.subscribe();

    push_fix(&handle, &mut snapshots, 0.0, 0.0).await;
    handle.start_navigation(destination()).await;
    wait_for_state(&handle, "Routing").await;

    responses
        .send(Err(RoutingError::Backend {
            message: "503 service unavailable".to_owned(),
        }))
        .await
        .unwrap();

    let status = wait_for_state(&handle, "Idle").await;
    assert!(status.last_error.expect("error").contains("503"));

    cancellation.cancel();
}

#[tokio::test]
async fn arrival_radius_completes_the_trip() {
    let (handle, _provider, responses, cancellation) = spawn_session();
    let mut snapshots = handle.subscribe();

    push_fix(&handle, &mut snapshots, 0.0, 0.0).await;
    handle.start_navigation(destination()).await;
    responses.send(Ok(two_step_route())).await.unwrap();
    wait_for_state(&handle, "Navigating").await;

    // Progress along the route, then inside the arrival radius.
    push_fix(&handle, &mut snapshots, 0.0, 0.012).await;
    let snapshot = push_fix(&handle, &mut snapshots, 0.0, 0.0199).await;
    assert_eq!(snapshot.state.name(), "Arrived");
    assert!(snapshot.remaining_distance_m < 25.0);

    cancellation.cancel();
}

// ============================================================================
// Stop and cancellation
// ============================================================================

#[tokio::test]
async fn stop_twice_is_idempotent() {
    let (handle, _provider, responses, cancellation) = spawn_session();
    let mut snapshots = handle.subscribe();

    push_fix(&handle, &mut snapshots, 0.0, 0.0).await;
    handle.start_navigation(destination()).await;
    responses.send(Ok(two_step_route())).await.unwrap();
    wait_for_state(&handle, "Navigating").await;

    handle.stop_navigation().await;
    let first = wait_for_state(&handle, "Idle").await;
    assert!(first.last_error.is_none());

    handle.stop_navigation().await;
    // Another fix proves the loop is still processing after the second stop.
    let snapshot = push_fix(&handle, &mut snapshots, 0.0, 0.001).await;
    assert_eq!(snapshot.state.name(), "Idle");
    assert!(handle.status().last_error.is_none());

    cancellation.cancel();
}

#[tokio::test]
async fn route_resolving_after_stop_is_discarded() {
    let (handle, provider, responses, cancellation) = spawn_session();
    let mut snapshots = handle.subscribe();

    push_fix(&handle, &mut snapshots, 0.0, 0.0).await;
    handle.start_navigation(destination()).await;
    wait_for_state(&handle, "Routing").await;
    assert_eq!(provider.request_count(), 1);

    // Stop while the request is still outstanding, then let it resolve.
    handle.stop_navigation().await;
    wait_for_state(&handle, "Idle").await;
    responses.send(Ok(two_step_route())).await.unwrap();

    // The next fix proves the stale result was dropped, not applied.
    let snapshot = push_fix(&handle, &mut snapshots, 0.0, 0.001).await;
    assert_eq!(snapshot.state.name(), "Idle");

    cancellation.cancel();
}
