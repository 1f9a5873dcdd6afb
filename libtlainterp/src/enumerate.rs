//! State enumeration: driving the evaluator over `Init` and `Next` to
//! produce concrete states, and BFS over `Next` to compute reachability.

use std::collections::{HashSet, VecDeque};

use imbl::HashMap;
use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::eval::eval;
use crate::module::Module;
use crate::state::State;
use crate::value::{Fingerprint, Value};

/// Evaluates `module`'s `Init` predicate, returning every satisfying state,
/// de-duplicated by fingerprint.
pub(crate) fn initial_states<'t>(module: &Module<'t>, input: &str, constants: HashMap<String, Value>) -> Result<Vec<State>, Error> {
    let ctx = Context::for_init(module.variables.clone(), &module.defs, constants);
    let branches = eval(module.init()?, input, &ctx)?;

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for b in branches {
        if b.result_bool() != Some(true) {
            continue;
        }
        let fp = b.state.fingerprint();
        if seen.insert(fp) {
            out.push(b.state);
        }
    }
    debug!(count = out.len(), "computed initial states");
    Ok(out)
}

/// Evaluates `module`'s `Next` action from `from`, returning every successor
/// state (deprimed), de-duplicated by fingerprint. A branch only counts as a
/// successor if it assigned every primed variable and its result is `TRUE`.
pub(crate) fn next_states<'t>(
    module: &Module<'t>,
    input: &str,
    constants: &HashMap<String, Value>,
    from: &State,
) -> Result<Vec<State>, Error> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for action in module.next_actions()? {
        let ctx = Context::for_next(from, &module.defs, constants.clone());
        let branches = eval(action, input, &ctx)?;
        for b in branches {
            if b.result_bool() != Some(true) || !b.state.all_primed_assigned() {
                continue;
            }
            let successor = b.state.deprime();
            let fp = successor.fingerprint();
            if seen.insert(fp) {
                out.push(successor);
            }
        }
    }

    debug!(count = out.len(), "computed successor states");
    Ok(out)
}

/// The result of a bounded reachability search.
#[derive(Debug, Clone)]
pub struct ReachableStates {
    /// Every state discovered, in BFS discovery order.
    pub states: Vec<State>,
    /// `(from, to)` fingerprint pairs recording the transition graph.
    pub edges: Vec<(Fingerprint, Fingerprint)>,
    /// Set once `max_states` was reached before the frontier was exhausted:
    /// the result is a partial prefix of the true reachable set.
    pub truncated: bool,
}

/// BFS over `Next` from `module`'s initial states, optionally bounded by
/// `max_states`.
pub(crate) fn reachable_states<'t>(
    module: &Module<'t>,
    input: &str,
    constants: &HashMap<String, Value>,
    max_states: Option<usize>,
) -> Result<ReachableStates, Error> {
    let init = initial_states(module, input, constants.clone())?;

    let mut discovered: HashSet<Fingerprint> = HashSet::new();
    let mut states = Vec::new();
    let mut edges = Vec::new();
    let mut queue = VecDeque::new();
    let mut truncated = false;

    for s in init {
        let fp = s.fingerprint();
        if discovered.insert(fp) {
            queue.push_back(s.clone());
            states.push(s);
        }
    }

    while let Some(current) = queue.pop_front() {
        if let Some(max) = max_states {
            if states.len() >= max {
                truncated = !queue.is_empty();
                break;
            }
        }

        let current_fp = current.fingerprint();
        for successor in next_states(module, input, constants, &current)? {
            let successor_fp = successor.fingerprint();
            edges.push((current_fp, successor_fp));
            if discovered.insert(successor_fp) {
                if let Some(max) = max_states {
                    if states.len() >= max {
                        truncated = true;
                        continue;
                    }
                }
                queue.push_back(successor.clone());
                states.push(successor);
            }
        }
    }

    debug!(states = states.len(), edges = edges.len(), truncated, "computed reachable states");
    Ok(ReachableStates { states, edges, truncated })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::module::extract;
    use crate::rewrite::rewrite;

    const COUNTER: &str = "\
---- MODULE Counter ----
VARIABLE x

Init == x = 0
Next == x' = x + 1
====";

    #[test]
    fn init_produces_a_single_state() {
        let (rewritten, tree) = rewrite(COUNTER).unwrap();
        let module = extract(&tree, &rewritten).unwrap();
        let states = initial_states(&module, &rewritten, HashMap::new()).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].get("x"), Some(&Value::Int(0)));
    }

    #[test]
    fn next_increments_x() {
        let (rewritten, tree) = rewrite(COUNTER).unwrap();
        let module = extract(&tree, &rewritten).unwrap();
        let init = initial_states(&module, &rewritten, HashMap::new()).unwrap();
        let successors = next_states(&module, &rewritten, &HashMap::new(), &init[0]).unwrap();
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn reachability_is_bounded_by_max_states() {
        let (rewritten, tree) = rewrite(COUNTER).unwrap();
        let module = extract(&tree, &rewritten).unwrap();
        let reached = reachable_states(&module, &rewritten, &HashMap::new(), Some(3)).unwrap();
        assert_eq!(reached.states.len(), 3);
        assert!(reached.truncated);
    }

    #[test]
    fn nondeterministic_next_forks_into_two_successors() {
        let src = "\
---- MODULE Flip ----
VARIABLE x

Init == x = 0
Next == \\/ x' = x + 1
        \\/ x' = x - 1
====";
        let (rewritten, tree) = rewrite(src).unwrap();
        let module = extract(&tree, &rewritten).unwrap();
        let init = initial_states(&module, &rewritten, HashMap::new()).unwrap();
        let successors = next_states(&module, &rewritten, &HashMap::new(), &init[0]).unwrap();
        assert_eq!(successors.len(), 2);
    }

    #[test]
    fn shared_domain_quantifier_binds_every_identifier() {
        let src = "\
---- MODULE SharedDomain ----
VARIABLE x

Init == x = 0
Next == \\E a, b \\in {0, 1} : a # b /\\ x' = a + b
====";
        let (rewritten, tree) = rewrite(src).unwrap();
        let module = extract(&tree, &rewritten).unwrap();
        let init = initial_states(&module, &rewritten, HashMap::new()).unwrap();
        let successors = next_states(&module, &rewritten, &HashMap::new(), &init[0]).unwrap();
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn not_equals_compares_an_already_assigned_primed_variable_by_value() {
        let src = "\
---- MODULE NotEquals ----
VARIABLE x

Init == x = 0
Next == x' = 5 /\\ x' # 5
====";
        let (rewritten, tree) = rewrite(src).unwrap();
        let module = extract(&tree, &rewritten).unwrap();
        let init = initial_states(&module, &rewritten, HashMap::new()).unwrap();
        let successors = next_states(&module, &rewritten, &HashMap::new(), &init[0]).unwrap();
        assert!(successors.is_empty());
    }

    #[test]
    fn not_equals_never_treats_an_unassigned_primed_variable_as_an_assignment() {
        let src = "\
---- MODULE NotEqualsUnassigned ----
VARIABLE x

Init == x = 0
Next == x' # 5
====";
        let (rewritten, tree) = rewrite(src).unwrap();
        let module = extract(&tree, &rewritten).unwrap();
        let init = initial_states(&module, &rewritten, HashMap::new()).unwrap();
        let err = next_states(&module, &rewritten, &HashMap::new(), &init[0]).unwrap_err();
        assert!(matches!(err, Error::UnboundIdentifier { .. }));
    }
}
