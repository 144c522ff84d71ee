//! Triple registry: the process-wide map from `(subject, predicate)` to triple.
//!
//! The [`TripleRegistry`] owns every [`Triple`] in a `DashMap`. Mutation
//! goes through a [`TripleGuard`], an exclusive handle on one entry: while a
//! guard is alive no other caller can read or write that triple, so the
//! at-most-one-mutator rule is enforced by the borrow checker and the map's
//! shard locks rather than by caller discipline.
//!
//! Do not call registry-wide scans ([`TripleRegistry::keys`],
//! [`TripleRegistry::dependents_of`], the planners in
//! [`invalidation`](crate::invalidation)) or take a second guard on the same
//! thread while holding a guard. The shard locks are not reentrant.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, TmsError, TmsResult};
use crate::triple::{Triple, TripleRef};

/// Which edge list of a triple a reference lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Dependency,
    Support,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Dependency => write!(f, "dependency"),
            EdgeKind::Support => write!(f, "support"),
        }
    }
}

/// An edge whose target is not (or no longer) registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingRef {
    /// Triple holding the edge.
    pub owner: TripleRef,
    /// Unregistered key the edge points at.
    pub target: TripleRef,
    pub kind: EdgeKind,
}

/// Exclusive handle on one registered triple.
///
/// Derefs to [`Triple`], so the edge primitives are called directly on it.
/// The entry stays locked until the guard is dropped.
pub struct TripleGuard<'a> {
    inner: RefMut<'a, TripleRef, Triple>,
}

impl Deref for TripleGuard<'_> {
    type Target = Triple;

    fn deref(&self) -> &Triple {
        &self.inner
    }
}

impl DerefMut for TripleGuard<'_> {
    fn deref_mut(&mut self) -> &mut Triple {
        &mut self.inner
    }
}

/// Owner of all triples and their dependency/support edges.
///
/// An explicit object with a session lifetime: construct it when the
/// evaluator starts, share it (e.g. via `Arc`) with evaluation threads,
/// drop it at the end.
#[derive(Debug)]
pub struct TripleRegistry {
    triples: DashMap<TripleRef, Triple>,
    config: RegistryConfig,
}

impl TripleRegistry {
    /// Create an empty registry with the given configuration.
    pub fn new(config: RegistryConfig) -> TmsResult<Self> {
        config.validate()?;
        tracing::info!(
            capacity = config.initial_capacity,
            max_cascade_depth = config.max_cascade_depth,
            "initializing triple registry"
        );
        Ok(Self {
            triples: DashMap::with_capacity(config.initial_capacity),
            config,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a fully built triple. Errors if its key is already taken.
    pub fn insert(&self, triple: Triple) -> TmsResult<()> {
        match self.triples.entry(triple.key().clone()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateTriple {
                subject: entry.key().subject().to_string(),
                predicate: entry.key().predicate().to_string(),
            }
            .into()),
            Entry::Vacant(entry) => {
                tracing::debug!(triple = %entry.key(), "registering triple");
                entry.insert(triple);
                Ok(())
            }
        }
    }

    /// Exclusive handle on `key`, creating an empty triple the first time
    /// the key is computed.
    pub fn get_or_create(&self, key: TripleRef) -> TripleGuard<'_> {
        let inner = match self.triples.entry(key) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                tracing::debug!(triple = %entry.key(), "creating triple");
                let triple = Triple::new(entry.key().clone());
                entry.insert(triple)
            }
        };
        TripleGuard { inner }
    }

    /// Exclusive handle on an existing triple.
    pub fn lock(&self, key: &TripleRef) -> Option<TripleGuard<'_>> {
        self.triples.get_mut(key).map(|inner| TripleGuard { inner })
    }

    /// Snapshot of a triple.
    pub fn get(&self, key: &TripleRef) -> Option<Triple> {
        self.triples.get(key).map(|r| r.value().clone())
    }

    /// Record a dependency on the triple registered under `owner`.
    pub fn add_dependency(&self, owner: &TripleRef, dependency: TripleRef) -> TmsResult<TripleRef> {
        let mut triple = self.lock(owner).ok_or_else(|| not_found(owner))?;
        Ok(triple.add_dependency(dependency))
    }

    /// Remove a dependency from the triple registered under `owner`.
    ///
    /// A dependency that was never recorded is a no-op; only a missing
    /// owner is an error.
    pub fn remove_dependency(
        &self,
        owner: &TripleRef,
        dependency: TripleRef,
    ) -> TmsResult<TripleRef> {
        let mut triple = self.lock(owner).ok_or_else(|| not_found(owner))?;
        Ok(triple.remove_dependency(dependency))
    }

    /// Replace the support set of the triple registered under `owner`.
    pub fn set_supports(&self, owner: &TripleRef, supports: Vec<TripleRef>) -> TmsResult<()> {
        let mut triple = self.lock(owner).ok_or_else(|| not_found(owner))?;
        triple.set_supports(supports);
        Ok(())
    }

    /// Remove a retracted triple and return it.
    ///
    /// Edges in other triples that name `key` are left as they are; they
    /// become dangling and are resolved by the evaluator's recomputation.
    pub fn retract(&self, key: &TripleRef) -> Option<Triple> {
        let removed = self.triples.remove(key).map(|(_, triple)| triple);
        if removed.is_some() {
            tracing::debug!(triple = %key, "retracted triple");
        }
        removed
    }

    pub fn contains(&self, key: &TripleRef) -> bool {
        self.triples.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// All registered keys, sorted (snapshot, not a consistent view under
    /// concurrent writes).
    pub fn keys(&self) -> Vec<TripleRef> {
        let mut keys: Vec<_> = self.triples.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Clones of all registered triples, sorted by key.
    pub fn snapshot(&self) -> Vec<Triple> {
        let mut triples: Vec<_> = self.triples.iter().map(|entry| entry.value().clone()).collect();
        triples.sort_by(|a, b| a.key().cmp(b.key()));
        triples
    }

    /// Triples that read `key` while computing their current value.
    pub fn dependents_of(&self, key: &TripleRef) -> Vec<TripleRef> {
        self.scan(|triple| triple.depends_on(key))
    }

    /// Triples currently justified (among others) by `key`.
    pub fn supported_by(&self, key: &TripleRef) -> Vec<TripleRef> {
        self.scan(|triple| triple.is_supported_by(key))
    }

    /// Every edge whose target is not registered, sorted by owner.
    pub fn dangling_references(&self) -> Vec<DanglingRef> {
        let triples = self.snapshot();
        let live: HashSet<&TripleRef> = triples.iter().map(|t| t.key()).collect();

        let mut dangling = Vec::new();
        for triple in &triples {
            let edges = triple
                .dependencies()
                .iter()
                .map(|r| (r, EdgeKind::Dependency))
                .chain(triple.supports().iter().map(|r| (r, EdgeKind::Support)));
            for (target, kind) in edges {
                if !live.contains(target) {
                    dangling.push(DanglingRef {
                        owner: triple.key().clone(),
                        target: target.clone(),
                        kind,
                    });
                }
            }
        }
        dangling
    }

    /// Remove every triple. Called at session teardown.
    pub fn clear(&self) {
        tracing::info!(count = self.triples.len(), "clearing triple registry");
        self.triples.clear();
    }

    fn scan(&self, predicate: impl Fn(&Triple) -> bool) -> Vec<TripleRef> {
        let mut found: Vec<_> = self
            .triples
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();
        found.sort();
        found
    }
}

impl Default for TripleRegistry {
    fn default() -> Self {
        let config = RegistryConfig::default();
        Self {
            triples: DashMap::with_capacity(config.initial_capacity),
            config,
        }
    }
}

fn not_found(key: &TripleRef) -> TmsError {
    RegistryError::TripleNotFound {
        subject: key.subject().to_string(),
        predicate: key.predicate().to_string(),
    }
    .into()
}
