//! Activity Contexts
//!
//! A context is one reason for the indicator to be busy: a task, a debug
//! session, a manual toggle, a demo run. Contexts overlap freely; the set is
//! ordered by insertion so the most recently begun survivor always supplies
//! the displayed reason.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Message shown when the last context ends without a completion message
pub const COMPLETION_FALLBACK: &str = "All clear!";

/// Reason used when a caller supplies none
pub const WORKING_FALLBACK: &str = "Working\u{2026}";

/// Reason of the manual (user-toggled) context
pub const MANUAL_REASON: &str = "Manual launch";

/// Completion message when the manual context is toggled off
pub const MANUAL_STOP: &str = "Manual stop";

/// Reason of the demo context
pub const DEMO_REASON: &str = "Demo flight";

/// Completion message of the demo context
pub const DEMO_COMPLETE: &str = "Demo complete";

/// Reason attributed to the "stop" command
pub const STOPPED_BY_USER: &str = "Stopped by user";

/// Reason shown when the controller is disposed
pub const DEACTIVATED: &str = "Extension deactivated";

const MANUAL_ID: &str = "manual";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Context identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub String);

impl ContextId {
    /// Create a context ID from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh unique context ID
    ///
    /// Format: `ctx-<base36 millis>-<6 random base36 chars>`.
    #[must_use]
    pub fn generate() -> Self {
        let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
            .collect();

        Self(format!("ctx-{}-{suffix}", to_base36(millis)))
    }

    /// The reserved ID of the manual context
    #[must_use]
    pub fn manual() -> Self {
        Self(MANUAL_ID.to_string())
    }

    /// Whether this is the reserved manual ID
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.0 == MANUAL_ID
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Insertion-ordered set of active contexts
#[derive(Clone, Debug, Default)]
pub struct ContextSet {
    /// Reasons, keyed by ID
    reasons: HashMap<ContextId, String>,
    /// Insertion order
    order: Vec<ContextId>,
}

impl ContextSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a context
    ///
    /// Re-inserting a tracked ID replaces its reason but keeps its position.
    pub fn insert(&mut self, id: ContextId, reason: impl Into<String>) {
        let reason = reason.into();
        if let Some(existing) = self.reasons.get_mut(&id) {
            *existing = reason;
            return;
        }
        self.order.push(id.clone());
        self.reasons.insert(id, reason);
    }

    /// Remove a context, returning its reason if it was tracked
    pub fn remove(&mut self, id: &ContextId) -> Option<String> {
        let reason = self.reasons.remove(id)?;
        self.order.retain(|other| other != id);
        Some(reason)
    }

    /// Whether `id` is tracked
    #[must_use]
    pub fn contains(&self, id: &ContextId) -> bool {
        self.reasons.contains_key(id)
    }

    /// Reason of the most recently inserted surviving context
    #[must_use]
    pub fn latest_reason(&self) -> Option<&str> {
        self.order
            .last()
            .and_then(|id| self.reasons.get(id))
            .map(String::as_str)
    }

    /// Reason of a specific context
    #[must_use]
    pub fn reason(&self, id: &ContextId) -> Option<&str> {
        self.reasons.get(id).map(String::as_str)
    }

    /// Number of active contexts
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no context is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every context
    pub fn clear(&mut self) {
        self.reasons.clear();
        self.order.clear();
    }

    /// Iterate `(id, reason)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&ContextId, &str)> {
        self.order
            .iter()
            .filter_map(|id| self.reasons.get(id).map(|reason| (id, reason.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ContextId::generate();
        let b = ContextId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("ctx-"));
        assert_eq!(a.as_str().rsplit('-').next().map(str::len), Some(6));
    }

    #[test]
    fn test_manual_id_is_reserved() {
        assert!(ContextId::manual().is_manual());
        assert_eq!(ContextId::manual(), ContextId::manual());
        assert!(!ContextId::generate().is_manual());
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_latest_reason_follows_insertion_order() {
        let mut set = ContextSet::new();
        let build = ContextId::new("build");
        let test = ContextId::new("test");

        set.insert(build.clone(), "Task: build");
        set.insert(test.clone(), "Task: test");
        assert_eq!(set.latest_reason(), Some("Task: test"));

        assert_eq!(set.remove(&test), Some("Task: test".to_string()));
        assert_eq!(set.latest_reason(), Some("Task: build"));

        set.remove(&build);
        assert!(set.is_empty());
        assert_eq!(set.latest_reason(), None);
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut set = ContextSet::new();
        set.insert(ContextId::new("a"), "first");
        set.insert(ContextId::new("b"), "second");
        set.insert(ContextId::new("a"), "renamed");

        assert_eq!(set.len(), 2);
        assert_eq!(set.latest_reason(), Some("second"));
        let ids: Vec<&str> = set.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(set.reason(&ContextId::new("a")), Some("renamed"));
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut set = ContextSet::new();
        set.insert(ContextId::new("a"), "only");
        assert_eq!(set.remove(&ContextId::new("zzz")), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut set = ContextSet::new();
        set.insert(ContextId::new("a"), "one");
        set.insert(ContextId::new("b"), "two");
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(&ContextId::new("a")));
    }
}
