//! Thread-safe route map keyed by `(provider, canonical_type)`, with a monotonic routing version.

use crate::error::BusError;
use kestrel_schema::{CanonicalType, ProviderId, Route};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

type RouteKey = (ProviderId, CanonicalType);

/// Route map plus the routing-version counter every successful mutation bumps exactly once.
#[derive(Debug, Default)]
pub struct DispatchTable {
    routes: RwLock<HashMap<RouteKey, Route>>,
    version: AtomicI64,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current routing version. Exposed read-only so callers cannot fork it.
    pub fn version(&self) -> i64 {
        self.version.load(Ordering::Acquire)
    }

    /// Validate and insert/replace a route, bumping [`Self::version`] exactly once.
    pub fn upsert(&self, route: Route) -> Result<i64, BusError> {
        kestrel_schema::route::validate_route_type(route.canonical_type.as_str())
            .map_err(BusError::InvalidRoute)?;
        for rest_fn in &route.rest_fns {
            if rest_fn.trim().is_empty() {
                return Err(BusError::InvalidRoute(kestrel_schema::SchemaError::InvalidFilter {
                    field: "rest_fns".to_string(),
                    reason: "rest_fn must not be empty".to_string(),
                }));
            }
        }

        let key = (route.provider, route.canonical_type.clone());
        self.routes.write().insert(key, route);
        Ok(self.bump_version())
    }

    /// Remove a route, bumping [`Self::version`] exactly once. No-op (and no version bump) if
    /// the route did not exist.
    pub fn remove(&self, provider: ProviderId, canonical_type: &CanonicalType) -> Result<i64, BusError> {
        let removed = self
            .routes
            .write()
            .remove(&(provider, canonical_type.clone()));
        match removed {
            Some(_) => Ok(self.bump_version()),
            None => Err(BusError::RouteNotFound {
                provider,
                canonical_type: canonical_type.clone(),
            }),
        }
    }

    /// Bump the version for a control-plane mutation that does not itself touch the route map
    /// (e.g. a trading-mode toggle). The routing version doubles as a global control-plane
    /// clock: every acknowledged mutation advances it exactly once.
    pub fn bump_for_control_mutation(&self) -> i64 {
        self.bump_version()
    }

    pub fn lookup(&self, provider: ProviderId, canonical_type: &CanonicalType) -> Option<Route> {
        self.routes.read().get(&(provider, canonical_type.clone())).cloned()
    }

    /// A shallow copy of every currently registered route.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.read().values().cloned().collect()
    }

    fn bump_version(&self) -> i64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}
