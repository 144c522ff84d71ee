//! Triple records and the edge primitives that keep them consistent.
//!
//! A [`Triple`] is identified by its `(subject, predicate)` [`TripleRef`].
//! It records which triples were read to compute its value (dependencies)
//! and which triples currently justify that value (supports). References
//! are plain key values, never live handles: a dependency may name a
//! triple that does not exist yet, or no longer exists.

use serde::{Deserialize, Serialize};

use crate::error::{ReferenceError, TmsError, TmsResult};

/// Key of a triple: a `(subject, predicate)` pair.
///
/// Always well formed: [`TripleRef::new`] rejects an empty subject or
/// predicate, so the edge primitives never need to check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTripleRef")]
pub struct TripleRef {
    subject: String,
    predicate: String,
}

/// Unvalidated wire shape of a [`TripleRef`].
#[derive(Deserialize)]
struct RawTripleRef {
    subject: String,
    predicate: String,
}

impl TryFrom<RawTripleRef> for TripleRef {
    type Error = TmsError;

    fn try_from(raw: RawTripleRef) -> TmsResult<Self> {
        TripleRef::new(raw.subject, raw.predicate)
    }
}

impl TripleRef {
    /// Create a reference, rejecting blank subjects and predicates.
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>) -> TmsResult<Self> {
        let subject = subject.into();
        let predicate = predicate.into();
        if subject.trim().is_empty() {
            return Err(ReferenceError::EmptySubject { predicate }.into());
        }
        if predicate.trim().is_empty() {
            return Err(ReferenceError::EmptyPredicate { subject }.into());
        }
        Ok(Self { subject, predicate })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }
}

impl std::fmt::Display for TripleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subject, self.predicate)
    }
}

/// A derived fact together with its dependency and support edges.
///
/// Edge lists are private so that every mutation goes through the
/// primitives below; that is what keeps `dependencies` free of duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTriple")]
pub struct Triple {
    key: TripleRef,
    value: Option<serde_json::Value>,
    dependencies: Vec<TripleRef>,
    supports: Vec<TripleRef>,
}

#[derive(Deserialize)]
struct RawTriple {
    key: TripleRef,
    value: Option<serde_json::Value>,
    #[serde(default)]
    dependencies: Vec<TripleRef>,
    #[serde(default)]
    supports: Vec<TripleRef>,
}

impl From<RawTriple> for Triple {
    fn from(raw: RawTriple) -> Self {
        let mut triple = Triple::new(raw.key);
        triple.value = raw.value;
        for dependency in raw.dependencies {
            triple.add_dependency(dependency);
        }
        triple.supports = raw.supports;
        triple
    }
}

impl Triple {
    /// Create an empty triple: no value, no edges.
    pub fn new(key: TripleRef) -> Self {
        Self {
            key,
            value: None,
            dependencies: Vec::new(),
            supports: Vec::new(),
        }
    }

    /// Attach an initial value.
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Identity within the registry.
    pub fn key(&self) -> &TripleRef {
        &self.key
    }

    /// Current computed payload. `None` means the fact is absent.
    pub fn value(&self) -> Option<&serde_json::Value> {
        self.value.as_ref()
    }

    /// Triples consulted to compute the value, in first-read order.
    pub fn dependencies(&self) -> &[TripleRef] {
        &self.dependencies
    }

    /// Triples currently justifying the value (alternative justifications).
    pub fn supports(&self) -> &[TripleRef] {
        &self.supports
    }

    /// Replace the computed value, returning the previous one.
    pub fn set_value(&mut self, value: Option<serde_json::Value>) -> Option<serde_json::Value> {
        std::mem::replace(&mut self.value, value)
    }

    /// Record that computing this triple read `dependency`.
    ///
    /// Idempotent: a key already present is not added twice. Returns the
    /// reference unchanged so evaluators can chain the call.
    pub fn add_dependency(&mut self, dependency: TripleRef) -> TripleRef {
        if self.depends_on(&dependency) {
            tracing::trace!(triple = %self.key, dependency = %dependency, "dependency already recorded");
            return dependency;
        }
        tracing::debug!(triple = %self.key, dependency = %dependency, "adding dependency");
        self.dependencies.push(dependency.clone());
        dependency
    }

    /// Forget that computing this triple read `dependency`.
    ///
    /// Removes the first matching entry. A reference that was never
    /// recorded leaves the list untouched.
    pub fn remove_dependency(&mut self, dependency: TripleRef) -> TripleRef {
        match self.dependencies.iter().position(|d| *d == dependency) {
            Some(index) => {
                tracing::debug!(triple = %self.key, dependency = %dependency, "removing dependency");
                self.dependencies.remove(index);
            }
            None => {
                tracing::trace!(triple = %self.key, dependency = %dependency, "dependency not recorded");
            }
        }
        dependency
    }

    /// Replace the whole support set. There is no partial update.
    pub fn set_supports(&mut self, supports: Vec<TripleRef>) {
        tracing::debug!(
            triple = %self.key,
            old = self.supports.len(),
            new = supports.len(),
            "replacing supports"
        );
        self.supports = supports;
    }

    /// Whether `dependency` is recorded as read by this triple.
    pub fn depends_on(&self, dependency: &TripleRef) -> bool {
        self.dependencies.contains(dependency)
    }

    /// Whether `support` is currently one of this triple's justifications.
    pub fn is_supported_by(&self, support: &TripleRef) -> bool {
        self.supports.contains(support)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(subject: &str, predicate: &str) -> TripleRef {
        TripleRef::new(subject, predicate).unwrap()
    }

    fn empty(subject: &str, predicate: &str) -> Triple {
        Triple::new(key(subject, predicate))
    }

    #[test]
    fn reference_rejects_blank_fields() {
        assert!(TripleRef::new("", "p").is_err());
        assert!(TripleRef::new("A", "  ").is_err());
        assert!(TripleRef::new("A", "p").is_ok());
    }

    #[test]
    fn reference_display() {
        assert_eq!(key("A", "p").to_string(), "A/p");
    }

    #[test]
    fn reference_equality_uses_both_fields() {
        assert_eq!(key("A", "p"), key("A", "p"));
        assert_ne!(key("A", "p"), key("A", "q"));
        assert_ne!(key("A", "p"), key("B", "p"));
    }

    #[test]
    fn add_dependency_is_idempotent() {
        let mut t = empty("A", "p");
        t.add_dependency(key("B", "q"));
        let once = t.dependencies().to_vec();
        t.add_dependency(key("B", "q"));
        assert_eq!(t.dependencies(), once);
        assert_eq!(t.dependencies().len(), 1);
    }

    #[test]
    fn add_dependency_returns_reference() {
        let mut t = empty("A", "p");
        assert_eq!(t.add_dependency(key("B", "q")), key("B", "q"));
        assert_eq!(t.add_dependency(key("B", "q")), key("B", "q"));
    }

    #[test]
    fn add_dependency_keeps_first_read_order() {
        let mut t = empty("A", "p");
        t.add_dependency(key("C", "r"));
        t.add_dependency(key("B", "q"));
        t.add_dependency(key("C", "r"));
        assert_eq!(t.dependencies(), vec![key("C", "r"), key("B", "q")]);
    }

    #[test]
    fn remove_then_add_restores_dependencies() {
        let mut t = empty("A", "p");
        t.add_dependency(key("B", "q"));
        t.add_dependency(key("C", "r"));

        let removed = t.remove_dependency(key("B", "q"));
        t.add_dependency(removed);

        let mut deps = t.dependencies().to_vec();
        deps.sort();
        assert_eq!(deps, vec![key("B", "q"), key("C", "r")]);
    }

    #[test]
    fn add_then_remove_restores_dependencies() {
        let mut t = empty("A", "p");
        t.add_dependency(key("C", "r"));
        let before = t.dependencies().to_vec();

        let added = t.add_dependency(key("B", "q"));
        assert_eq!(t.remove_dependency(added), key("B", "q"));
        assert_eq!(t.dependencies(), before);
    }

    #[test]
    fn remove_absent_dependency_is_noop() {
        let mut t = empty("A", "p");
        assert_eq!(t.remove_dependency(key("C", "r")), key("C", "r"));
        assert!(t.dependencies().is_empty());

        t.add_dependency(key("B", "q"));
        t.add_dependency(key("D", "s"));
        t.remove_dependency(key("C", "r"));
        assert_eq!(t.dependencies(), vec![key("B", "q"), key("D", "s")]);
    }

    #[test]
    fn remove_only_matching_entry() {
        let mut t = empty("A", "p");
        t.add_dependency(key("B", "q"));
        t.add_dependency(key("B", "r"));
        t.add_dependency(key("C", "q"));
        t.remove_dependency(key("B", "r"));
        assert_eq!(t.dependencies(), vec![key("B", "q"), key("C", "q")]);
    }

    #[test]
    fn set_supports_replaces_whole_set() {
        let mut t = empty("A", "p");
        t.set_supports(vec![key("D", "s"), key("E", "t")]);
        t.set_supports(vec![key("F", "u")]);
        assert_eq!(t.supports(), vec![key("F", "u")]);
        assert!(!t.is_supported_by(&key("D", "s")));

        t.set_supports(Vec::new());
        assert!(t.supports().is_empty());
    }

    #[test]
    fn edge_primitives_leave_other_fields_alone() {
        let mut t = empty("A", "p").with_value(serde_json::json!(42));
        t.set_supports(vec![key("D", "s")]);
        t.add_dependency(key("B", "q"));
        t.remove_dependency(key("B", "q"));
        assert_eq!(t.supports(), vec![key("D", "s")]);
        assert_eq!(t.value(), Some(&serde_json::json!(42)));

        t.set_supports(vec![key("E", "t")]);
        t.add_dependency(key("C", "r"));
        assert_eq!(t.dependencies(), vec![key("C", "r")]);
    }

    #[test]
    fn dependency_may_name_self() {
        let mut t = empty("A", "p");
        t.add_dependency(key("A", "p"));
        assert!(t.depends_on(&key("A", "p")));
    }

    #[test]
    fn set_value_returns_previous() {
        let mut t = empty("A", "p");
        assert_eq!(t.set_value(Some(serde_json::json!("x"))), None);
        assert_eq!(t.set_value(None), Some(serde_json::json!("x")));
    }

    #[test]
    fn scenario_from_empty_triple() {
        let mut t = empty("A", "p");

        t.add_dependency(key("B", "q"));
        assert_eq!(t.dependencies(), vec![key("B", "q")]);

        t.add_dependency(key("B", "q"));
        assert_eq!(t.dependencies().len(), 1);

        t.remove_dependency(key("B", "q"));
        assert!(t.dependencies().is_empty());

        t.remove_dependency(key("C", "r"));
        assert!(t.dependencies().is_empty());

        t.set_supports(vec![key("D", "s")]);
        assert_eq!(t.supports(), vec![key("D", "s")]);

        t.set_supports(vec![]);
        assert!(t.supports().is_empty());
    }

    #[test]
    fn deserialize_rejects_blank_reference() {
        let err = serde_json::from_str::<TripleRef>(r#"{"subject":"","predicate":"p"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn deserialize_drops_duplicate_dependencies() {
        let json = r#"{
            "key": {"subject": "A", "predicate": "p"},
            "value": null,
            "dependencies": [
                {"subject": "B", "predicate": "q"},
                {"subject": "B", "predicate": "q"}
            ]
        }"#;
        let t: Triple = serde_json::from_str(json).unwrap();
        assert_eq!(t.dependencies(), [key("B", "q")]);
        assert!(t.supports().is_empty());
    }

    #[test]
    fn triple_serde_roundtrip() {
        let mut t = empty("A", "p").with_value(serde_json::json!({"n": 1}));
        t.add_dependency(key("B", "q"));
        t.set_supports(vec![key("D", "s")]);
        let json = serde_json::to_string(&t).unwrap();
        let back: Triple = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
