use imbl::HashMap;
use tree_sitter::Node;

use crate::{module::Definitions, state::State, value::Value};

/// A `LET`-local parameterized operator definition in scope. Zero-arity
/// `LET` operators are evaluated eagerly instead and carried as a plain
/// [`Context::bindings`] entry; only parameterized ones need to stay
/// unevaluated until applied.
#[derive(Debug, Clone)]
pub struct LocalOp<'d> {
    /// Parameter names, in declaration order.
    pub params: Vec<String>,
    /// The operator's body, evaluated fresh at each call site.
    pub body: Node<'d>,
}

/// The bundle of (result, state, bindings, flags) threaded through
/// evaluation.
///
/// `Context` is immutable by convention: every evaluator function that would
/// "mutate" one instead returns a fresh [`Context`] (or several, for
/// disjunctive branches). Bindings and state are backed by [`imbl`]'s
/// persistent maps so a fork is O(log n) rather than a full copy.
#[derive(Debug, Clone)]
pub struct Context<'d> {
    /// The result of the most recently evaluated (sub)expression.
    pub result: Option<Value>,
    /// The state under construction (or consulted) in this branch.
    pub state: State,
    /// Operator and function definitions extracted from the module.
    pub defs: &'d Definitions<'d>,
    /// Quantifier / `LET` / operator-parameter bindings in scope.
    pub bindings: HashMap<String, Value>,
    /// Parameterized `LET`-local operator definitions in scope.
    pub local_ops: HashMap<String, LocalOp<'d>>,
    /// The evaluated constants table.
    pub constants: HashMap<String, Value>,
    /// The value `@` resolves to while evaluating an `EXCEPT` RHS.
    pub prev_func_val: Option<Value>,
    /// Set while evaluating inside a `'` (primed) subtree: identifier
    /// resolution looks up `X'` in `state` rather than `X`.
    pub primed_scope: bool,
    /// Set only during `Init` evaluation: permits `=` against an unprimed,
    /// unassigned variable to bind it, the way `=` against a primed
    /// variable always does.
    pub unprimed_assignment_allowed: bool,
}

impl<'d> Context<'d> {
    /// A fresh root context for evaluating `Init`: every declared variable
    /// unassigned, unprimed assignment permitted.
    pub fn for_init(
        vars: impl IntoIterator<Item = String>,
        defs: &'d Definitions<'d>,
        constants: HashMap<String, Value>,
    ) -> Self {
        Context {
            result: None,
            state: State::new(vars),
            defs,
            bindings: HashMap::new(),
            local_ops: HashMap::new(),
            constants,
            prev_func_val: None,
            primed_scope: false,
            unprimed_assignment_allowed: true,
        }
    }

    /// A fresh root context for evaluating `Next` from `from`: `from`
    /// extended with unassigned primed slots, unprimed assignment
    /// forbidden.
    pub fn for_next(from: &State, defs: &'d Definitions<'d>, constants: HashMap<String, Value>) -> Self {
        Context {
            result: None,
            state: from.with_fresh_primed_slots(),
            defs,
            bindings: HashMap::new(),
            local_ops: HashMap::new(),
            constants,
            prev_func_val: None,
            primed_scope: false,
            unprimed_assignment_allowed: false,
        }
    }

    /// A minimal context for evaluating a standalone constant expression,
    /// with no state variables, bindings or constants in scope.
    pub fn for_constant_expr(defs: &'d Definitions<'d>) -> Self {
        Context {
            result: None,
            state: State::new(Vec::new()),
            defs,
            bindings: HashMap::new(),
            local_ops: HashMap::new(),
            constants: HashMap::new(),
            prev_func_val: None,
            primed_scope: false,
            unprimed_assignment_allowed: false,
        }
    }

    /// Returns a copy of `self` with `result` set to `value`, state
    /// unchanged.
    pub fn with_result(&self, value: Value) -> Self {
        Context {
            result: Some(value),
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with `state` replaced.
    pub fn with_state(&self, state: State) -> Self {
        Context {
            state,
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with `name` bound to `value` for the
    /// duration of evaluating a subtree (quantifier body, `LET` body,
    /// operator body).
    pub fn with_binding(&self, name: impl Into<String>, value: Value) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.insert(name.into(), value);
        Context {
            bindings,
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with an empty binding set, for entering a
    /// callee's lexical scope (an operator body, a `LET` body) without
    /// leaking the caller's quantifier/`LET` bindings or local operators into
    /// it.
    pub fn with_bindings_cleared(&self) -> Self {
        Context {
            bindings: HashMap::new(),
            local_ops: HashMap::new(),
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with a parameterized `LET`-local operator
    /// added to scope.
    pub fn with_local_op(&self, name: impl Into<String>, params: Vec<String>, body: Node<'d>) -> Self {
        let mut local_ops = self.local_ops.clone();
        local_ops.insert(name.into(), LocalOp { params, body });
        Context {
            local_ops,
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with the primed-scope flag set.
    pub fn entering_primed_scope(&self) -> Self {
        Context {
            primed_scope: true,
            ..self.clone()
        }
    }

    /// Returns a copy of `self` with `prev_func_val` set, for evaluating an
    /// `EXCEPT` RHS.
    pub fn with_prev_func_val(&self, value: Value) -> Self {
        Context {
            prev_func_val: Some(value),
            ..self.clone()
        }
    }

    /// The boolean result, or `None` if the last evaluation did not produce
    /// one (e.g. it only performed a state assignment).
    pub fn result_bool(&self) -> Option<bool> {
        match &self.result {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}
