use std::hash::{Hash, Hasher};

use imbl::{HashMap, Vector};

use crate::value::{Fingerprint, Value};

/// A partial assignment of declared state variables to values.
///
/// Every declared variable is a key of [`State::declared`]; whether it
/// currently holds a value is tracked separately in `unprimed` (and, during
/// next-state evaluation, `primed`) so that "declared but unassigned" is
/// distinguishable from "assigned". Both maps are [`imbl::HashMap`]s so
/// cloning a `State` to fork an evaluation branch is O(1) plus O(log n) per
/// subsequent write.
#[derive(Debug, Clone, Default)]
pub struct State {
    declared: Vector<String>,
    unprimed: HashMap<String, Value>,
    primed: HashMap<String, Value>,
}

impl State {
    /// A state with every name in `vars` declared and unassigned.
    pub fn new(vars: impl IntoIterator<Item = String>) -> Self {
        State {
            declared: vars.into_iter().collect(),
            unprimed: HashMap::new(),
            primed: HashMap::new(),
        }
    }

    /// The declared variable names, in declaration order.
    pub fn declared(&self) -> &Vector<String> {
        &self.declared
    }

    /// Whether `name` (without a trailing prime) is a declared variable.
    pub fn has(&self, name: &str) -> bool {
        self.declared.iter().any(|v| v == name)
    }

    /// The current value of `name`, which may carry a trailing `'`.
    ///
    /// Returns `None` both when `name` is undeclared and when it is
    /// declared but not yet assigned in this branch.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match name.strip_suffix('\'') {
            Some(base) => self.primed.get(base),
            None => self.unprimed.get(name),
        }
    }

    /// Whether `name` (base or primed) is currently assigned.
    pub fn is_assigned(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns a new `State` with `name` bound to `value`.
    ///
    /// `name` may carry a trailing `'`, in which case the primed slot is
    /// written, leaving the unprimed value (if any) untouched.
    pub fn with_var(&self, name: &str, value: Value) -> Self {
        let mut next = self.clone();
        match name.strip_suffix('\'') {
            Some(base) => {
                next.primed.insert(base.to_string(), value);
            }
            None => {
                next.unprimed.insert(name.to_string(), value);
            }
        }
        next
    }

    /// Adds an unassigned primed slot for every declared variable, in
    /// preparation for evaluating `Next`.
    pub fn with_fresh_primed_slots(&self) -> Self {
        let mut next = self.clone();
        next.primed = HashMap::new();
        next
    }

    /// Whether every declared variable has a primed assignment.
    pub fn all_primed_assigned(&self) -> bool {
        self.declared.iter().all(|v| self.primed.contains_key(v))
    }

    /// The total number of assigned slots (primed plus unprimed).
    ///
    /// Since [`State::with_var`] only ever inserts, never removes, this
    /// grows monotonically as a branch assigns more variables — used by the
    /// disjunction branch-merging policy to detect whether a sub-branch
    /// assigned something the parent hadn't.
    pub fn assigned_slot_count(&self) -> usize {
        self.unprimed.len() + self.primed.len()
    }

    /// Drops all unprimed entries and renames the primed entries back to
    /// their base names, yielding the successor state.
    pub fn deprime(&self) -> Self {
        State {
            declared: self.declared.clone(),
            unprimed: self.primed.clone(),
            primed: HashMap::new(),
        }
    }

    /// An iterator over `(name, value)` for every currently-assigned
    /// unprimed variable, in declaration order.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.declared
            .iter()
            .filter_map(|name| self.unprimed.get(name).map(|v| (name.as_str(), v)))
    }

    /// The canonical fingerprint of this state's unprimed assignments:
    /// the sorted-by-name concatenation of (name, value-fingerprint) pairs.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut pairs: Vec<(&str, Fingerprint)> = self
            .assignments()
            .map(|(n, v)| (n, v.fingerprint()))
            .collect();
        pairs.sort_by_key(|(n, _)| *n);

        let mut h = std::collections::hash_map::DefaultHasher::new();
        pairs.hash(&mut h);
        Fingerprint::from_hash(h.finish())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fresh_state_has_declared_vars_unassigned() {
        let s = State::new(["x".to_string(), "y".to_string()]);
        assert!(s.has("x"));
        assert!(!s.is_assigned("x"));
        assert!(!s.has("z"));
    }

    #[test]
    fn with_var_assigns_without_mutating_parent() {
        let s0 = State::new(["x".to_string()]);
        let s1 = s0.with_var("x", Value::Int(1));
        assert!(!s0.is_assigned("x"));
        assert_eq!(s1.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn primed_and_unprimed_are_independent() {
        let s0 = State::new(["x".to_string()]).with_var("x", Value::Int(1));
        let s1 = s0.with_var("x'", Value::Int(2));
        assert_eq!(s1.get("x"), Some(&Value::Int(1)));
        assert_eq!(s1.get("x'"), Some(&Value::Int(2)));
    }

    #[test]
    fn deprime_promotes_primed_to_unprimed() {
        let s = State::new(["x".to_string()]).with_var("x'", Value::Int(5));
        let deprimed = s.deprime();
        assert_eq!(deprimed.get("x"), Some(&Value::Int(5)));
        assert_eq!(deprimed.get("x'"), None);
    }

    #[test]
    fn all_primed_assigned_requires_every_declared_var() {
        let s = State::new(["x".to_string(), "y".to_string()]);
        assert!(!s.all_primed_assigned());
        let s = s.with_var("x'", Value::Int(1));
        assert!(!s.all_primed_assigned());
        let s = s.with_var("y'", Value::Int(2));
        assert!(s.all_primed_assigned());
    }

    #[test]
    fn fingerprint_ignores_assignment_order() {
        let a = State::new(["x".to_string(), "y".to_string()])
            .with_var("x", Value::Int(1))
            .with_var("y", Value::Int(2));
        let b = State::new(["x".to_string(), "y".to_string()])
            .with_var("y", Value::Int(2))
            .with_var("x", Value::Int(1));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
