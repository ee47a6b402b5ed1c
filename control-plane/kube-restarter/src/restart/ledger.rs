use std::collections::HashSet;

use super::ResourceKind;

/// Identity of something restarted during a run.
///
/// Controllers and ownerless pods live in separate variants so a controller
/// can never shadow a pod with the same rendered name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerKey {
    Controller {
        name: String,
        kind: ResourceKind,
        namespace: String,
    },
    Pod {
        name: String,
    },
}

impl LedgerKey {
    pub fn controller(name: &str, kind: ResourceKind, namespace: &str) -> Self {
        LedgerKey::Controller {
            name: name.to_string(),
            kind,
            namespace: namespace.to_string(),
        }
    }

    pub fn pod(name: &str) -> Self {
        LedgerKey::Pod {
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKey::Controller {
                name,
                kind,
                namespace,
            } => write!(f, "{}|{}|{}", name, kind, namespace),
            LedgerKey::Pod { name } => write!(f, "{}", name),
        }
    }
}

/// Run-scoped record of what has already been restarted.
///
/// Keys are only added, never removed. Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct RestartLedger {
    seen: HashSet<LedgerKey>,
    order: Vec<LedgerKey>,
}

impl RestartLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &LedgerKey) -> bool {
        self.seen.contains(key)
    }

    /// Returns false when the key was already present.
    pub fn record(&mut self, key: LedgerKey) -> bool {
        if self.seen.insert(key.clone()) {
            self.order.push(key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerKey> {
        self.order.iter()
    }
}
