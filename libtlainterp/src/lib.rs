//! A state-enumeration interpreter for a subset of the TLA+ specification
//! language.
//!
//! Given a TLA+ module's source text and a table of values for its declared
//! constants, this crate can:
//!
//! - evaluate `Init` to enumerate every state satisfying it
//!   ([`compute_initial_states`]),
//! - evaluate `Next` from a given state to enumerate its successors
//!   ([`compute_next_states`]), and
//! - drive reachability by repeatedly applying `Next` until closure
//!   ([`compute_reachable_states`]).
//!
//! The evaluator itself never forks a thread or suspends: a "branch" of
//! nondeterministic evaluation (a disjunct, an existential witness) is an
//! element of the `Vec<Context>` an evaluator function returns, not a
//! coroutine. See [`mod@eval`] for the dispatcher these three entry points
//! sit on top of.
//!
//! This crate does not parse TLA+ itself; it hands source text to the
//! `tree-sitter-tlaplus` grammar and walks the resulting tree. It does not
//! initialize a `tracing` subscriber — only emits through the facade — so
//! an embedding binary controls how (or whether) diagnostics are rendered.

mod context;
mod enumerate;
mod error;
mod eval;
mod itf;
mod module;
mod rewrite;
mod state;
mod value;

use imbl::HashMap;
use tracing::instrument;
use tree_sitter::Node;

use context::Context;

pub use enumerate::ReachableStates;
pub use error::{Error, Position};
pub use itf::{state_from_itf, state_to_itf, states_to_itf, value_from_itf, value_to_itf};
pub use state::State;
pub use value::{Fingerprint, Value};

/// Evaluates `module_source`'s `Init` predicate under `constants`, returning
/// every state it is satisfied by, de-duplicated by state fingerprint.
///
/// `constants` maps each declared constant's name to a TLA+ expression
/// text, evaluated in an otherwise-empty context to produce its value.
#[instrument(skip(module_source))]
pub fn compute_initial_states(module_source: &str, constants: &HashMap<String, String>) -> Result<Vec<State>, Error> {
    let (rewritten, tree) = rewrite::rewrite(module_source)?;
    let module = module::extract(&tree, &rewritten)?;
    let constants = evaluate_constants(constants)?;
    enumerate::initial_states(&module, &rewritten, constants)
}

/// Evaluates `module_source`'s `Next` action from `from` under `constants`,
/// returning every successor state, de-duplicated by state fingerprint.
///
/// A branch only yields a successor if it left every primed variable
/// assigned and its overall value was `TRUE`; branches that don't are
/// silently dropped, not treated as an error.
#[instrument(skip(module_source))]
pub fn compute_next_states(module_source: &str, constants: &HashMap<String, String>, from: &State) -> Result<Vec<State>, Error> {
    let (rewritten, tree) = rewrite::rewrite(module_source)?;
    let module = module::extract(&tree, &rewritten)?;
    let constants = evaluate_constants(constants)?;
    enumerate::next_states(&module, &rewritten, &constants, from)
}

/// Breadth-first enumerates every state reachable from `module_source`'s
/// initial states by repeated application of `Next`, optionally bounded by
/// `max_states`.
///
/// If the state graph is infinite (or merely large), `max_states` is the
/// caller's only defense against non-termination; the search returns early
/// with [`ReachableStates::truncated`] set once the bound is hit.
#[instrument(skip(module_source))]
pub fn compute_reachable_states(
    module_source: &str,
    constants: &HashMap<String, String>,
    max_states: Option<usize>,
) -> Result<ReachableStates, Error> {
    let (rewritten, tree) = rewrite::rewrite(module_source)?;
    let module = module::extract(&tree, &rewritten)?;
    let constants = evaluate_constants(constants)?;
    enumerate::reachable_states(&module, &rewritten, &constants, max_states)
}

/// Evaluates every entry of `constants` (a constant name to TLA+ expression
/// text mapping) into a `Value`, each expression evaluated in an otherwise-
/// empty context with no declared variables or bindings in scope.
fn evaluate_constants(constants: &HashMap<String, String>) -> Result<HashMap<String, Value>, Error> {
    let mut out = HashMap::new();
    for (name, expr) in constants {
        let value = eval_constant_expr(expr).map_err(|source| Error::ConstantExpr {
            name: name.clone(),
            source: Box::new(source),
        })?;
        out.insert(name.clone(), value);
    }
    Ok(out)
}

/// Evaluates a single constant-value expression, by wrapping it in a
/// throwaway single-operator module so the grammar (which only parses whole
/// modules) can produce a tree for it, then evaluating that operator's body
/// against an empty [`Context`].
fn eval_constant_expr(expr_source: &str) -> Result<Value, Error> {
    let wrapped = format!("---- MODULE ConstExpr ----\nConstExprValue == {expr_source}\n====");
    let (rewritten, tree) = rewrite::rewrite(&wrapped)?;
    let module = module::extract(&tree, &rewritten)?;
    let def = module
        .defs
        .operators
        .get("ConstExprValue")
        .ok_or(Error::AssertionFailure {
            message: "constant expression wrapper produced no definition",
        })?;

    let ctx = Context::for_constant_expr(&module.defs);
    let mut branches = eval::eval(def.body, &rewritten, &ctx)?;
    let branch = branches.pop().ok_or(Error::AssertionFailure {
        message: "constant expression evaluation produced no branch",
    })?;
    branch.result.ok_or(Error::AssertionFailure {
        message: "constant expression produced no value",
    })
}

/// Returns the content in `input` spanned by `node`.
fn get_str<'a>(node: &Node<'_>, input: &'a str) -> &'a str {
    &input[node.byte_range()]
}
