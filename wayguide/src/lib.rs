//! Wayguide - Turn-by-turn navigation progress and guidance engine
//!
//! This library tracks a traveler's progress along a previously computed
//! route from a stream of position fixes: it resolves which maneuver to
//! announce next, detects departure from the route, decides when to request
//! a replacement route, and estimates time and distance to arrival. It does
//! not render anything, talk to networks, or acquire sensor data; routing
//! backends and position sources plug in as collaborators.
//!
//! # High-Level API
//!
//! For most use cases, the [`session`] module provides the full engine:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use wayguide::{EngineConfig, Point, Position, SessionRuntime};
//!
//! let (runtime, handle) = SessionRuntime::new(provider, EngineConfig::default());
//! let cancellation = CancellationToken::new();
//! tokio::spawn(runtime.run(cancellation.clone()));
//!
//! handle.update_position(Position::new(37.7749, -122.4194));
//! handle.start_navigation(Point::new(37.7849, -122.4094)).await;
//!
//! let mut snapshots = handle.subscribe();
//! while let Ok(snapshot) = snapshots.recv().await {
//!     if let Some(instruction) = &snapshot.current_instruction {
//!         println!("{} ({:.0} m)", instruction.text, instruction.distance_m);
//!     }
//! }
//! ```
//!
//! The lower-level components (geometry projection, instruction resolution,
//! off-route detection, ETA estimation) are plain synchronous modules and
//! can be used on their own.

pub mod config;
pub mod error;
pub mod eta;
pub mod geo;
pub mod instruction;
pub mod position;
pub mod provider;
pub mod reroute;
pub mod route;
pub mod session;
pub mod speed;
pub mod triplog;

pub use config::EngineConfig;
pub use error::{NavigationError, RoutingError};
pub use geo::Point;
pub use position::Position;
pub use provider::RouteProvider;
pub use route::Route;
pub use session::{
    NavigationState, ProgressSnapshot, SessionHandle, SessionRuntime, SessionStatus,
};

/// Version of the wayguide library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
