//! Per-user drafts (transfer basket, inventory count) kept server-side.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stockhouse_core::UserId;

/// User-keyed store for disposable working state.
pub trait SessionStore<V>: Send + Sync {
    fn get(&self, user: UserId) -> Option<V>;
    fn upsert(&self, user: UserId, value: V);
    fn remove(&self, user: UserId) -> Option<V>;
}

impl<V, S> SessionStore<V> for Arc<S>
where
    S: SessionStore<V> + ?Sized,
{
    fn get(&self, user: UserId) -> Option<V> {
        (**self).get(user)
    }

    fn upsert(&self, user: UserId, value: V) {
        (**self).upsert(user, value)
    }

    fn remove(&self, user: UserId) -> Option<V> {
        (**self).remove(user)
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore<V> {
    inner: RwLock<HashMap<UserId, V>>,
}

impl<V> InMemorySessionStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Default for InMemorySessionStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SessionStore<V> for InMemorySessionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, user: UserId) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&user).cloned()
    }

    fn upsert(&self, user: UserId, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(user, value);
        }
    }

    fn remove(&self, user: UserId) -> Option<V> {
        self.inner.write().ok()?.remove(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drafts_are_isolated_per_user() {
        let store: InMemorySessionStore<String> = InMemorySessionStore::new();
        let a = UserId::new();
        let b = UserId::new();

        store.upsert(a, "basket a".to_string());
        assert_eq!(store.get(a).as_deref(), Some("basket a"));
        assert_eq!(store.get(b), None);

        assert_eq!(store.remove(a).as_deref(), Some("basket a"));
        assert_eq!(store.get(a), None);
    }
}
