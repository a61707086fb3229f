//! Navigation Session Module
//!
//! This module owns the orchestrating state machine of the engine: it
//! consumes the position stream, sequences the geometry, instruction,
//! reroute, and ETA components on every fix, and publishes one coherent
//! progress snapshot per update.
//!
//! # Architecture
//!
//! The session is split into a synchronous core and an async runtime:
//!
//! ```text
//! SessionHandle ──commands──> SessionRuntime ──owns──> SessionCore
//!      │                           │                      │
//!      │<──snapshots (broadcast)───┤                  route requests
//!      │<──status (watch)──────────┤                      │
//!                                  │<──route results── spawned provider task
//! ```
//!
//! - [`SessionCore`] holds every piece of per-session state and mutates it
//!   one message at a time, with no async anywhere. All state-machine rules
//!   live here and are unit-tested without a runtime.
//! - [`SessionRuntime`] is the single writer driving the core from a tokio
//!   task. Route computation is the only slow operation; it runs as a
//!   spawned task whose result feeds back into the loop as a message, so
//!   position ingestion never stalls behind the routing collaborator.
//! - [`SessionHandle`] is the cloneable front door: commands in, snapshots
//!   and status out. Observers are passive and can never block the update
//!   path.
//!
//! Stale route results are filtered by generation: stopping or restarting
//! navigation bumps the session generation, and results carrying an old
//! generation are dropped on receipt.
//!
//! # Usage
//!
//! ```ignore
//! use wayguide::session::SessionRuntime;
//!
//! let (runtime, handle) = SessionRuntime::new(provider, config);
//! tokio::spawn(runtime.run(cancellation.clone()));
//!
//! handle.update_position(fix);
//! handle.start_navigation(destination).await;
//!
//! let mut snapshots = handle.subscribe();
//! while let Ok(snapshot) = snapshots.recv().await {
//!     println!("{}: {:.0} m left", snapshot.state, snapshot.remaining_distance_m);
//! }
//! ```
//!
//! # Components
//!
//! - [`state`] - Public types: `NavigationState`, `ProgressSnapshot`, `SessionStatus`
//! - [`core`] - `SessionCore` state machine and its effect types
//! - [`runtime`] - `SessionRuntime` task and `SessionHandle`

pub mod core;
pub mod runtime;
pub mod state;

pub use self::core::{
    RoutePurpose, RouteRequest, RouteResolution, SessionCore, StartEffects, UpdateEffects,
};
pub use self::runtime::{SessionHandle, SessionRuntime};
pub use self::state::{NavigationState, ProgressSnapshot, SessionStatus};
