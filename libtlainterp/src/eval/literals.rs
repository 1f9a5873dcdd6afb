use imbl::HashMap;
use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::{eval, eval_one, named_children};
use crate::get_str;
use crate::value::Value;

pub(super) fn number<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let text = get_str(&node, input);
    let n: i64 = text.parse().map_err(|_| Error::TypeMismatch {
        expected: "Int literal",
        got: "malformed number",
        at: Position::from(&node),
    })?;
    Ok(vec![ctx.with_result(Value::Int(n))])
}

pub(super) fn boolean<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let b = match get_str(&node, input).trim() {
        "TRUE" => true,
        "FALSE" => false,
        other => {
            return Err(Error::UnsupportedConstruct {
                kind: format!("boolean literal `{other}`"),
                at: Position::from(&node),
            })
        }
    };
    Ok(vec![ctx.with_result(Value::Bool(b))])
}

pub(super) fn boolean_set<'d>(ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    Ok(vec![ctx.with_result(Value::boolean_set())])
}

pub(super) fn string<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let raw = get_str(&node, input);
    let trimmed = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(raw);
    Ok(vec![ctx.with_result(Value::Str(trimmed.to_string()))])
}

/// Resolves an identifier by checking, in order: state variable,
/// quantifier/`LET` binding, operator/function definition, constant.
pub(super) fn identifier<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let name = get_str(&node, input);
    let at = Position::from(&node);

    let lookup_name = if ctx.primed_scope { format!("{name}'") } else { name.to_string() };

    if ctx.state.has(name) {
        if let Some(v) = ctx.state.get(&lookup_name) {
            return Ok(vec![ctx.with_result(v.clone())]);
        }
        // Declared but unassigned: only valid as an assignment target,
        // handled by the `=` operator directly rather than here.
        return Err(Error::UnboundIdentifier {
            name: lookup_name,
            at,
        });
    }

    if let Some(v) = ctx.bindings.get(name) {
        return Ok(vec![ctx.with_result(v.clone())]);
    }

    if let Some(op) = ctx.local_ops.get(name) {
        if !op.params.is_empty() {
            return Err(Error::ArityMismatch {
                name: name.to_string(),
                expected: op.params.len(),
                got: 0,
                at,
            });
        }
        let callee_ctx = ctx.with_bindings_cleared();
        return eval(op.body, input, &callee_ctx);
    }

    if let Some(def) = ctx.defs.operators.get(name) {
        if !def.params.is_empty() {
            return Err(Error::ArityMismatch {
                name: name.to_string(),
                expected: def.params.len(),
                got: 0,
                at,
            });
        }
        let callee_ctx = ctx.with_bindings_cleared();
        return eval(def.body, input, &callee_ctx);
    }

    if let Some(def) = ctx.defs.functions.get(name) {
        return super::functions::from_def(&def.bounds, def.body, input, ctx);
    }

    if let Some(v) = ctx.constants.get(name) {
        return Ok(vec![ctx.with_result(v.clone())]);
    }

    Err(Error::UnboundIdentifier {
        name: name.to_string(),
        at,
    })
}

/// `X'`: evaluates the sole operand with the primed-scope flag set.
pub(super) fn postfix<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let operand = children
        .iter()
        .find(|c| c.kind() != "prime")
        .copied()
        .ok_or(Error::AssertionFailure {
            message: "postfix operator missing operand",
        })?;

    let symbol = children.iter().find(|c| c.kind() == "prime");
    if symbol.is_none() {
        return Err(Error::UnsupportedConstruct {
            kind: "non-prime postfix operator".to_string(),
            at: Position::from(&node),
        });
    }

    eval(operand, input, &ctx.entering_primed_scope())
}

pub(super) fn prev_func_val<'d>(node: Node<'d>, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let v = ctx.prev_func_val.clone().ok_or(Error::UnboundIdentifier {
        name: "@".to_string(),
        at: Position::from(&node),
    })?;
    Ok(vec![ctx.with_result(v)])
}

/// `Foo(a1, ..., an)`: a call to a user-defined operator.
pub(super) fn bound_op<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (name_node, arg_nodes) = children.split_first().ok_or(Error::AssertionFailure {
        message: "operator application missing a name",
    })?;
    let name = get_str(name_node, input);
    let at = Position::from(name_node);

    if let Some(result) = builtin_op(name, arg_nodes, input, ctx, at)? {
        return Ok(result);
    }

    if let Some(op) = ctx.local_ops.get(name) {
        if op.params.len() != arg_nodes.len() {
            return Err(Error::ArityMismatch {
                name: name.to_string(),
                expected: op.params.len(),
                got: arg_nodes.len(),
                at,
            });
        }
        return call_with_args(&op.params, op.body, arg_nodes, input, ctx);
    }

    let def = ctx.defs.operators.get(name).ok_or_else(|| Error::UnboundIdentifier {
        name: name.to_string(),
        at,
    })?;

    if def.params.len() != arg_nodes.len() {
        return Err(Error::ArityMismatch {
            name: name.to_string(),
            expected: def.params.len(),
            got: arg_nodes.len(),
            at,
        });
    }

    call_with_args(&def.params, def.body, arg_nodes, input, ctx)
}

/// Evaluates `arg_nodes` left-to-right against `ctx`, threading any state
/// assignments between them, then binds the results to `params` in a fresh
/// callee scope and evaluates `body` there.
fn call_with_args<'d>(
    params: &[String],
    body: Node<'d>,
    arg_nodes: &[Node<'d>],
    input: &str,
    ctx: &Context<'d>,
) -> Result<Vec<Context<'d>>, Error> {
    let mut running = ctx.clone();
    let mut args = Vec::with_capacity(arg_nodes.len());
    for arg in arg_nodes {
        let branch = eval_one(*arg, input, &running)?;
        running = ctx.with_state(branch.state.clone());
        let value = branch.result.ok_or(Error::AssertionFailure {
            message: "operator argument produced no value",
        })?;
        args.push(value);
    }

    let mut callee_ctx = running.with_bindings_cleared();
    let mut bound: HashMap<String, Value> = HashMap::new();
    for (param, value) in params.iter().zip(args) {
        bound.insert(param.clone(), value);
    }
    callee_ctx.bindings = bound;

    eval(body, input, &callee_ctx)
}

/// The standard-module operators (`Cardinality`, `Len`, `Head`, `Tail`,
/// `Append`) share `bound_op`'s call syntax with user-defined operators, so
/// they're recognized by name here rather than a dedicated grammar kind.
/// Returns `None` for any other name, falling through to the definitions
/// table.
fn builtin_op<'d>(
    name: &str,
    args: &[Node<'d>],
    input: &str,
    ctx: &Context<'d>,
    at: Position,
) -> Result<Option<Vec<Context<'d>>>, Error> {
    let arity_error = |expected| {
        Error::ArityMismatch {
            name: name.to_string(),
            expected,
            got: args.len(),
            at,
        }
    };

    match (name, args) {
        ("Cardinality", [s]) => {
            let b = eval_one(*s, input, ctx)?;
            let n = b
                .result
                .as_ref()
                .ok_or(Error::AssertionFailure {
                    message: "Cardinality argument produced no value",
                })?
                .cardinality(at)?;
            Ok(Some(vec![b.with_result(Value::Int(n))]))
        }
        ("Cardinality", _) => Err(arity_error(1)),
        ("Len", [s]) => super::sequences::len(*s, input, ctx).map(Some),
        ("Len", _) => Err(arity_error(1)),
        ("Head", [s]) => super::sequences::head(*s, input, ctx).map(Some),
        ("Head", _) => Err(arity_error(1)),
        ("Tail", [s]) => super::sequences::tail(*s, input, ctx).map(Some),
        ("Tail", _) => Err(arity_error(1)),
        ("Append", [s, v]) => super::sequences::append(*s, *v, input, ctx).map(Some),
        ("Append", _) => Err(arity_error(2)),
        _ => Ok(None),
    }
}
