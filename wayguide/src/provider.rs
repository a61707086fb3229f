//! Route provider trait.
//!
//! This module defines the `RouteProvider` trait that abstracts route
//! computation backends, enabling dependency injection and swappable
//! implementations.
//!
//! # Available Providers
//!
//! - [`StaticRouteProvider`]: Serves pre-parsed routes in order, for
//!   simulation and testing
//! - Network backends (OSRM over HTTP, etc.) are implemented by embedders;
//!   parse their responses with [`parse_osrm_route`](crate::route::parse_osrm_route)
//!
//! # Example
//!
//! ```ignore
//! use wayguide::provider::{RouteProvider, StaticRouteProvider};
//!
//! let provider: Arc<dyn RouteProvider> = Arc::new(
//!     StaticRouteProvider::new(route).with_reroute(detour)
//! );
//!
//! let route = provider.compute_route(origin, destination).await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RoutingError;
use crate::geo::Point;
use crate::position::Position;
use crate::route::Route;

/// Trait for route computation backends.
///
/// Implementations take an origin fix and a destination coordinate and
/// produce a complete [`Route`], however they obtain it.
///
/// The trait uses a boxed future return type to allow trait objects,
/// enabling runtime backend selection. The session holds the provider as
/// `Arc<dyn RouteProvider>` and calls it for the initial route and for
/// every reroute.
pub trait RouteProvider: Send + Sync {
    /// Compute a route from `origin` to `destination`.
    ///
    /// The origin is a full position fix so backends can use heading and
    /// speed to pick a departure direction; the destination is a bare
    /// coordinate.
    fn compute_route(
        &self,
        origin: Position,
        destination: Point,
    ) -> Pin<Box<dyn Future<Output = Result<Route, RoutingError>> + Send + '_>>;

    /// Get a human-readable name for this provider, used in logs.
    fn name(&self) -> &'static str;
}

/// Provider that serves pre-parsed routes in request order.
///
/// The first request gets the primary route; later requests get the reroute
/// alternative when one is configured, otherwise the primary route again.
/// Backs the simulator and the integration tests, where routes come from
/// files rather than a live backend.
pub struct StaticRouteProvider {
    primary: Route,
    reroute: Option<Route>,
    requests: AtomicUsize,
}

impl StaticRouteProvider {
    /// Creates a provider that always serves `primary`.
    pub fn new(primary: Route) -> Self {
        Self {
            primary,
            reroute: None,
            requests: AtomicUsize::new(0),
        }
    }

    /// Serve `route` for every request after the first.
    pub fn with_reroute(mut self, route: Route) -> Self {
        self.reroute = Some(route);
        self
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RouteProvider for StaticRouteProvider {
    fn compute_route(
        &self,
        _origin: Position,
        _destination: Point,
    ) -> Pin<Box<dyn Future<Output = Result<Route, RoutingError>> + Send + '_>> {
        let served = self.requests.fetch_add(1, Ordering::SeqCst);
        let route = match (&self.reroute, served) {
            (Some(reroute), n) if n > 0 => reroute.clone(),
            _ => self.primary.clone(),
        };
        Box::pin(async move { Ok(route) })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
