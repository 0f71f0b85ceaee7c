//! Reconciles desired routing state against the dispatch table, pushing the diff out to the
//! provider adapter and serialising concurrent changes to the same `(provider, type)` pair.

use crate::command::SubmitOrderCommand;
use crate::error::ControlError;
use async_trait::async_trait;
use kestrel_bus::DispatchTable;
use kestrel_schema::{CanonicalType, FilterRule, ProviderId, Route};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// What the control plane asks the provider adapter to do. Implemented by `kestrel-adapter`;
/// kept as a trait here so `kestrel-control` never depends on a specific transport.
#[async_trait]
pub trait AdapterHandle: Send + Sync {
    async fn subscribe_route(&self, route: &Route) -> Result<(), ControlError>;
    async fn unsubscribe_route(&self, provider: ProviderId, canonical_type: &CanonicalType) -> Result<(), ControlError>;
    async fn submit_order(&self, order: &SubmitOrderCommand) -> Result<Value, ControlError>;
    async fn query_order(&self, provider: ProviderId, client_order_id: &str) -> Result<Value, ControlError>;
}

type RouteKey = (ProviderId, CanonicalType);

/// Merge `incoming` filters into `existing`, keeping the result sorted and deduplicated by
/// `(field, op)` — a later filter on the same field/op combination replaces the earlier one's
/// value list rather than appending to it (widening an `in` list is the caller's job, done
/// before the filters ever reach here).
fn merge_filters(existing: Vec<FilterRule>, incoming: Vec<FilterRule>) -> Vec<FilterRule> {
    let mut merged: HashMap<(String, String), FilterRule> = existing
        .into_iter()
        .map(|rule| ((rule.field.clone(), rule.op.clone()), rule))
        .collect();
    for rule in incoming {
        merged.insert((rule.field.clone(), rule.op.clone()), rule);
    }
    let mut rules: Vec<FilterRule> = merged.into_values().collect();
    rules.sort_by(|a, b| (a.field.as_str(), a.op.as_str()).cmp(&(b.field.as_str(), b.op.as_str())));
    rules
}

#[derive(Debug)]
pub struct SubscriptionManager {
    dispatch: Arc<DispatchTable>,
    locks: Mutex<HashMap<RouteKey, Arc<AsyncMutex<()>>>>,
}

impl SubscriptionManager {
    pub fn new(dispatch: Arc<DispatchTable>) -> Self {
        Self {
            dispatch,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: &RouteKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }

    /// Widen or create routing for `provider`/`canonical_type`. If a route already exists, its
    /// filters are merged with `filters` rather than replaced. Per §4.10: if the resulting route
    /// is identical to what's already active, this is a no-op (no re-subscribe, no version bump);
    /// if it differs, the adapter is unsubscribed from the old route before it is subscribed to
    /// the new one.
    pub async fn activate(
        &self,
        provider: ProviderId,
        canonical_type: CanonicalType,
        filters: Vec<FilterRule>,
        adapter: &dyn AdapterHandle,
    ) -> Result<i64, ControlError> {
        let key = (provider, canonical_type.clone());
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let existing = self.dispatch.lookup(provider, &canonical_type);
        let route = match &existing {
            Some(existing) => Route::new(
                provider,
                canonical_type.clone(),
                existing.ws_topics.clone(),
                existing.rest_fns.clone(),
                merge_filters(existing.filters.clone(), filters),
            ),
            None => Route::new(provider, canonical_type.clone(), vec![], vec![], filters),
        };

        if existing.as_ref() == Some(&route) {
            return Ok(self.dispatch.version());
        }
        if existing.is_some() {
            adapter.unsubscribe_route(provider, &canonical_type).await?;
        }

        adapter.subscribe_route(&route).await?;
        Ok(self.dispatch.upsert(route)?)
    }

    /// Remove routing for `provider`/`canonical_type` entirely.
    pub async fn deactivate(
        &self,
        provider: ProviderId,
        canonical_type: &CanonicalType,
        adapter: &dyn AdapterHandle,
    ) -> Result<i64, ControlError> {
        let key = (provider, canonical_type.clone());
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        adapter.unsubscribe_route(provider, canonical_type).await?;
        Ok(self.dispatch.remove(provider, canonical_type)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingAdapter {
        subscribed: StdMutex<Vec<Route>>,
        unsubscribed: AtomicUsize,
    }

    #[async_trait]
    impl AdapterHandle for RecordingAdapter {
        async fn subscribe_route(&self, route: &Route) -> Result<(), ControlError> {
            self.subscribed.lock().unwrap().push(route.clone());
            Ok(())
        }

        async fn unsubscribe_route(&self, _provider: ProviderId, _canonical_type: &CanonicalType) -> Result<(), ControlError> {
            self.unsubscribed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn submit_order(&self, _order: &SubmitOrderCommand) -> Result<Value, ControlError> {
            unimplemented!()
        }

        async fn query_order(&self, _provider: ProviderId, _client_order_id: &str) -> Result<Value, ControlError> {
            unimplemented!()
        }
    }

    fn filter(values: &[&str]) -> FilterRule {
        FilterRule::new("symbol", "in", values.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[tokio::test]
    async fn activating_a_new_type_bumps_the_version_once() {
        let dispatch = Arc::new(DispatchTable::new());
        let manager = SubscriptionManager::new(Arc::clone(&dispatch));
        let adapter = RecordingAdapter::default();

        let canonical = CanonicalType::parse("TRADE").unwrap();
        let version = manager
            .activate(ProviderId::Mock, canonical, vec![filter(&["BTC-USDT"])], &adapter)
            .await
            .unwrap();

        assert_eq!(version, 1);
        assert_eq!(adapter.subscribed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn activating_twice_merges_filters_instead_of_replacing() {
        let dispatch = Arc::new(DispatchTable::new());
        let manager = SubscriptionManager::new(Arc::clone(&dispatch));
        let adapter = RecordingAdapter::default();
        let canonical = CanonicalType::parse("TRADE").unwrap();

        manager
            .activate(ProviderId::Mock, canonical.clone(), vec![filter(&["BTC-USDT"])], &adapter)
            .await
            .unwrap();
        let version = manager
            .activate(ProviderId::Mock, canonical.clone(), vec![filter(&["BTC-USDT", "ETH-USDT"])], &adapter)
            .await
            .unwrap();

        assert_eq!(version, 2);
        let route = dispatch.lookup(ProviderId::Mock, &canonical).unwrap();
        assert_eq!(route.filters.len(), 1);
        assert_eq!(route.filters[0].values, vec!["BTC-USDT".to_string(), "ETH-USDT".to_string()]);
    }

    #[tokio::test]
    async fn repeating_an_identical_subscribe_is_a_no_op() {
        let dispatch = Arc::new(DispatchTable::new());
        let manager = SubscriptionManager::new(Arc::clone(&dispatch));
        let adapter = RecordingAdapter::default();
        let canonical = CanonicalType::parse("TRADE").unwrap();

        let first = manager
            .activate(ProviderId::Mock, canonical.clone(), vec![filter(&["BTC-USDT"])], &adapter)
            .await
            .unwrap();
        let second = manager
            .activate(ProviderId::Mock, canonical.clone(), vec![filter(&["BTC-USDT"])], &adapter)
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(adapter.subscribed.lock().unwrap().len(), 1);
        assert_eq!(adapter.unsubscribed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deactivate_removes_the_route_and_calls_the_adapter() {
        let dispatch = Arc::new(DispatchTable::new());
        let manager = SubscriptionManager::new(Arc::clone(&dispatch));
        let adapter = RecordingAdapter::default();
        let canonical = CanonicalType::parse("TRADE").unwrap();

        manager
            .activate(ProviderId::Mock, canonical.clone(), vec![], &adapter)
            .await
            .unwrap();
        let version = manager.deactivate(ProviderId::Mock, &canonical, &adapter).await.unwrap();

        assert_eq!(version, 2);
        assert_eq!(adapter.unsubscribed.load(Ordering::SeqCst), 1);
        assert!(dispatch.lookup(ProviderId::Mock, &canonical).is_none());
    }
}
