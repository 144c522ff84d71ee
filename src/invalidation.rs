//! Invalidation planning: what must be recomputed when a triple changes.
//!
//! The planners walk the reverse of the recorded edges:
//!
//! - **Recompute** follows dependencies. When a triple's value changes,
//!   every triple that read it is stale, and so is everything that read
//!   those, transitively.
//! - **Retraction** follows supports. When a triple is retracted, a triple
//!   justified by it survives only if one of its other supports is still
//!   live. A triple left without live support is retracted in turn.
//!
//! Both are read-only. They report a plan; the evaluator applies it in its
//! own recomputation loop. The registry is snapshotted into a
//! [`DependencyIndex`] first, so no map locks are held during the walk.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::registry::TripleRegistry;
use crate::triple::{Triple, TripleRef};

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// A triple reached by a cascade, with its distance from the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedTriple {
    pub key: TripleRef,
    pub depth: usize,
}

/// Triples to recompute after `changed` took a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationPlan {
    pub changed: TripleRef,
    /// Stale triples in breadth-first order, each listed once. Excludes `changed`.
    pub affected: Vec<AffectedTriple>,
    /// Maximum depth reached.
    pub cascade_depth: usize,
    /// Whether `max_cascade_depth` cut the walk short.
    pub truncated: bool,
}

impl InvalidationPlan {
    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }

    pub fn contains(&self, key: &TripleRef) -> bool {
        self.affected.iter().any(|a| a.key == *key)
    }

    /// Stale keys in recomputation order.
    pub fn keys(&self) -> impl Iterator<Item = &TripleRef> {
        self.affected.iter().map(|a| &a.key)
    }
}

/// Consequences of retracting `retracted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetractionPlan {
    pub retracted: TripleRef,
    /// Triples left without live support, in breadth-first order. Excludes `retracted`.
    pub unsupported: Vec<AffectedTriple>,
    /// Triples that lost a support but keep at least one live alternative.
    pub still_supported: Vec<TripleRef>,
    pub cascade_depth: usize,
    /// Whether `max_cascade_depth` cut the walk short. Triples found
    /// unsupported past the limit appear in neither list.
    pub truncated: bool,
}

impl RetractionPlan {
    pub fn is_unsupported(&self, key: &TripleRef) -> bool {
        self.unsupported.iter().any(|a| a.key == *key)
    }
}

// ---------------------------------------------------------------------------
// Dependency index
// ---------------------------------------------------------------------------

/// Reverse view of the registry's edges, built in one pass.
///
/// Useful on its own when an evaluator plans several changes against the
/// same state: build once, plan many.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    /// Key → triples that read it.
    dependents: HashMap<TripleRef, Vec<TripleRef>>,
    /// Key → triples it justifies.
    justifies: HashMap<TripleRef, Vec<TripleRef>>,
    /// Registered key → its support set.
    supports: HashMap<TripleRef, Vec<TripleRef>>,
}

impl DependencyIndex {
    /// Snapshot the registry.
    pub fn build(registry: &TripleRegistry) -> Self {
        Self::from_triples(&registry.snapshot())
    }

    /// Index an arbitrary set of triples. Reverse lists follow the order of
    /// `triples`.
    pub fn from_triples<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> Self {
        let mut index = Self::default();
        for triple in triples {
            let key = triple.key();
            for dependency in triple.dependencies() {
                index
                    .dependents
                    .entry(dependency.clone())
                    .or_default()
                    .push(key.clone());
            }
            for support in triple.supports() {
                index
                    .justifies
                    .entry(support.clone())
                    .or_default()
                    .push(key.clone());
            }
            index
                .supports
                .insert(key.clone(), triple.supports().to_vec());
        }
        index
    }

    /// Triples that read `key`.
    pub fn dependents(&self, key: &TripleRef) -> &[TripleRef] {
        self.dependents.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Triples whose support set contains `key`.
    pub fn justified_by(&self, key: &TripleRef) -> &[TripleRef] {
        self.justifies.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether `key` was registered when the index was built.
    pub fn is_registered(&self, key: &TripleRef) -> bool {
        self.supports.contains_key(key)
    }

    /// Breadth-first walk over dependents of `changed`.
    pub fn plan_recompute(&self, changed: &TripleRef, max_cascade_depth: usize) -> InvalidationPlan {
        let mut affected = Vec::new();
        let mut cascade_depth = 0;
        let mut truncated = false;

        let mut queue: VecDeque<(&TripleRef, usize)> = VecDeque::new();
        queue.push_back((changed, 0));
        let mut visited: HashSet<&TripleRef> = HashSet::new();
        visited.insert(changed);

        while let Some((current, depth)) = queue.pop_front() {
            for dependent in self.dependents(current) {
                if visited.contains(dependent) {
                    continue;
                }
                if depth + 1 > max_cascade_depth {
                    truncated = true;
                    continue;
                }
                visited.insert(dependent);
                affected.push(AffectedTriple {
                    key: dependent.clone(),
                    depth: depth + 1,
                });
                cascade_depth = cascade_depth.max(depth + 1);
                queue.push_back((dependent, depth + 1));
            }
        }

        tracing::debug!(
            changed = %changed,
            affected = affected.len(),
            cascade_depth,
            truncated,
            "planned recomputation"
        );

        InvalidationPlan {
            changed: changed.clone(),
            affected,
            cascade_depth,
            truncated,
        }
    }

    /// Simulate retracting `retracted` and cascade through support sets.
    ///
    /// A support is live if it was registered when the index was built and
    /// is not retracted by this plan. Triples with an empty support set are
    /// never affected.
    pub fn plan_retraction(&self, retracted: &TripleRef, max_cascade_depth: usize) -> RetractionPlan {
        let mut unsupported = Vec::new();
        let mut touched: Vec<&TripleRef> = Vec::new();
        let mut seen: HashSet<&TripleRef> = HashSet::new();
        let mut cut_off: HashSet<&TripleRef> = HashSet::new();
        let mut cascade_depth = 0;
        let mut truncated = false;

        let mut gone: HashSet<&TripleRef> = HashSet::new();
        gone.insert(retracted);
        let mut queue: VecDeque<(&TripleRef, usize)> = VecDeque::new();
        queue.push_back((retracted, 0));

        while let Some((current, depth)) = queue.pop_front() {
            for dependent in self.justified_by(current) {
                if gone.contains(dependent) {
                    continue;
                }

                let has_live_support = self
                    .supports
                    .get(dependent)
                    .is_some_and(|supports| {
                        supports
                            .iter()
                            .any(|s| !gone.contains(s) && self.is_registered(s))
                    });
                if has_live_support {
                    if seen.insert(dependent) {
                        touched.push(dependent);
                    }
                    continue;
                }
                if depth + 1 > max_cascade_depth {
                    // Unsupported but beyond the limit: neither retracted nor surviving.
                    cut_off.insert(dependent);
                    truncated = true;
                    continue;
                }

                gone.insert(dependent);
                unsupported.push(AffectedTriple {
                    key: dependent.clone(),
                    depth: depth + 1,
                });
                cascade_depth = cascade_depth.max(depth + 1);
                queue.push_back((dependent, depth + 1));
            }
        }

        // A triple may have kept an alternative early on and lost it later in the cascade.
        let still_supported: Vec<TripleRef> = touched
            .into_iter()
            .filter(|key| !gone.contains(key) && !cut_off.contains(key))
            .cloned()
            .collect();

        tracing::debug!(
            retracted = %retracted,
            unsupported = unsupported.len(),
            still_supported = still_supported.len(),
            cascade_depth,
            truncated,
            "planned retraction"
        );

        RetractionPlan {
            retracted: retracted.clone(),
            unsupported,
            still_supported,
            cascade_depth,
            truncated,
        }
    }
}

/// Plan recomputation after `changed` took a new value, bounded by the
/// registry's `max_cascade_depth`.
pub fn plan_recompute(registry: &TripleRegistry, changed: &TripleRef) -> InvalidationPlan {
    DependencyIndex::build(registry).plan_recompute(changed, registry.config().max_cascade_depth)
}

/// Plan the support cascade of retracting `retracted`, bounded by the
/// registry's `max_cascade_depth`.
pub fn plan_retraction(registry: &TripleRegistry, retracted: &TripleRef) -> RetractionPlan {
    DependencyIndex::build(registry).plan_retraction(retracted, registry.config().max_cascade_depth)
}
