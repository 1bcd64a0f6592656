use crate::state::DomainState;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Process-wide table of [`DomainState`]s
///
/// States are created on first use and never removed. One lock guards the
/// whole table so that a check and the update that follows it are atomic.
#[derive(Debug, Default)]
pub struct DomainRegistry {
    domains: Mutex<HashMap<String, DomainState>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on the state of `domain` while holding the lock
    pub fn update<R>(&self, domain: &str, f: impl FnOnce(&mut DomainState) -> R) -> R {
        let mut domains = self.domains.lock();
        let state = domains
            .entry(domain.to_string())
            .or_insert_with(|| DomainState::new(domain));
        f(state)
    }

    /// Copy of the state of `domain`, if it was ever touched
    pub fn snapshot(&self, domain: &str) -> Option<DomainState> {
        self.domains.lock().get(domain).cloned()
    }

    /// Copies of all states, ordered by domain name
    pub fn snapshot_all(&self) -> Vec<DomainState> {
        let mut states: Vec<_> = self.domains.lock().values().cloned().collect();
        states.sort_by(|a, b| a.domain_name.cmp(&b.domain_name));
        states
    }

    pub fn len(&self) -> usize {
        self.domains.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_creates_state_lazily() {
        let registry = DomainRegistry::new();
        assert!(registry.snapshot("example.com").is_none());

        let scheduled = registry.update("example.com", |state| {
            state.record_scheduled();
            state.scheduled
        });

        assert_eq!(scheduled, 1);
        assert_eq!(registry.snapshot("example.com").unwrap().scheduled, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_all_sorted() {
        let registry = DomainRegistry::new();
        for domain in ["b.org", "a.com", "c.net"] {
            registry.update(domain, |_| ());
        }

        let names: Vec<_> = registry
            .snapshot_all()
            .into_iter()
            .map(|s| s.domain_name)
            .collect();
        assert_eq!(names, vec!["a.com", "b.org", "c.net"]);
    }
}
