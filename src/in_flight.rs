//! Registry of namespaces whose upload or transcode has not finished.
//!
//! A namespace is claimed before its directory is created and released when
//! the pipeline is done with it, whatever the outcome. The reaper never
//! touches a claimed namespace, however old its directory is: an upload can
//! spend arbitrarily long streaming in or queued for an engine slot.

use dashmap::DashSet;
use hlsforge_common::Namespace;
use std::sync::Arc;

/// Thread-safe set of namespaces in use by the pipeline.
#[derive(Clone, Default)]
pub struct InFlight {
    namespaces: Arc<DashSet<Namespace>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `namespace` as in use until the returned claim is dropped.
    pub fn claim(&self, namespace: &Namespace) -> Claim {
        self.namespaces.insert(namespace.clone());
        tracing::trace!(%namespace, "namespace claimed");
        Claim {
            namespaces: self.namespaces.clone(),
            namespace: namespace.clone(),
        }
    }

    pub fn contains(&self, namespace: &Namespace) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Number of namespaces currently claimed.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Releases its namespace from the registry on drop.
#[derive(Debug)]
pub struct Claim {
    namespaces: Arc<DashSet<Namespace>>,
    namespace: Namespace,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.namespaces.remove(&self.namespace);
        tracing::trace!(namespace = %self.namespace, "namespace released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_released_on_drop() {
        let in_flight = InFlight::new();
        let ns = Namespace::generate().unwrap();

        let claim = in_flight.claim(&ns);
        assert!(in_flight.contains(&ns));
        assert_eq!(in_flight.len(), 1);

        drop(claim);
        assert!(!in_flight.contains(&ns));
        assert!(in_flight.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let in_flight = InFlight::new();
        let view = in_flight.clone();
        let ns = Namespace::generate().unwrap();

        let _claim = in_flight.claim(&ns);
        assert!(view.contains(&ns));
    }
}
