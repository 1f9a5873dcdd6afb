use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::{eval, named_children};
use crate::get_str;
use crate::module::list_item_expr;
use crate::value::Value;

/// Merges the branches of a disjunction: if any sub-branch assigned a
/// variable the parent hadn't, the branches are kept distinct (the choice of
/// disjunct is itself part of the resulting state); otherwise they collapse
/// into one context carrying the existential-OR of their results.
pub(crate) fn merge_disjunction<'d>(parent: &Context<'d>, branches: Vec<Context<'d>>) -> Vec<Context<'d>> {
    let parent_slots = parent.state.assigned_slot_count();
    let any_new_assignment = branches.iter().any(|b| b.state.assigned_slot_count() > parent_slots);
    if any_new_assignment {
        return branches;
    }
    let any_true = branches.iter().any(|b| b.result_bool().unwrap_or(false));
    vec![parent.with_result(Value::Bool(any_true))]
}

pub(super) fn not<'d>(operand: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&operand);
    let branches = eval(operand, input, ctx)?;
    branches
        .into_iter()
        .map(|b| {
            let v = b.result.as_ref().ok_or(Error::AssertionFailure {
                message: "lnot operand produced no value",
            })?;
            let b_val = v.as_bool(at)?;
            Ok(b.with_result(Value::Bool(!b_val)))
        })
        .collect()
}

pub(super) fn infix<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    if children.len() != 3 {
        return Err(Error::AssertionFailure {
            message: "infix operator missing an operand",
        });
    }
    let (lhs, symbol, rhs) = (children[0], children[1], children[2]);
    let at = Position::from(&node);

    match symbol.kind() {
        "land" | "/\\" => conjunction(lhs, rhs, input, ctx),
        "lor" | "\\/" => disjunction(lhs, rhs, input, ctx),
        "implies" => implies(lhs, rhs, input, ctx),
        "eq" | "=" => equals(lhs, rhs, input, ctx),
        "neq" | "#" => not_equals(lhs, rhs, input, ctx),
        "lt" => compare(lhs, rhs, input, ctx, |o| o.is_lt()),
        "leq" => compare(lhs, rhs, input, ctx, |o| o.is_le()),
        "gt" => compare(lhs, rhs, input, ctx, |o| o.is_gt()),
        "geq" => compare(lhs, rhs, input, ctx, |o| o.is_ge()),
        "plus" => super::arithmetic::add(lhs, rhs, input, ctx),
        "minus" => super::arithmetic::sub(lhs, rhs, input, ctx),
        "mul" => super::arithmetic::mul(lhs, rhs, input, ctx),
        "mod" => super::arithmetic::modulo(lhs, rhs, input, ctx),
        "dots_2" => super::arithmetic::range(lhs, rhs, input, ctx),
        "cup" => super::sets::binop(lhs, rhs, input, ctx, Value::union),
        "cap" => super::sets::binop(lhs, rhs, input, ctx, Value::intersection),
        "setminus" => super::sets::binop(lhs, rhs, input, ctx, Value::difference),
        "times" => super::sets::binop(lhs, rhs, input, ctx, Value::cartesian),
        "circ" => super::sequences::binop(lhs, rhs, input, ctx, Value::concat),
        "compose" => super::sets::binop(lhs, rhs, input, ctx, Value::compose),
        "all_map_to" => super::functions::singleton_function(lhs, rhs, input, ctx),
        other => Err(Error::UnsupportedConstruct {
            kind: format!("infix operator `{other}`"),
            at,
        }),
    }
}

fn implies<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);
    let lhs_branches = eval(lhs, input, ctx)?;
    let mut out = Vec::new();
    for lb in lhs_branches {
        let l = lb
            .result
            .as_ref()
            .ok_or(Error::AssertionFailure {
                message: "implies LHS produced no value",
            })?
            .as_bool(at)?;
        if !l {
            out.push(ctx.with_result(Value::Bool(true)));
            continue;
        }
        let next_ctx = ctx.with_state(lb.state.clone());
        out.extend(eval(rhs, input, &next_ctx)?);
    }
    Ok(out)
}

fn conjunction<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);
    let lhs_branches = eval(lhs, input, ctx)?;
    let mut out = Vec::new();
    for lb in lhs_branches {
        let l = lb.result.as_ref().and_then(|v| v.as_bool(at).ok());
        if l == Some(false) {
            out.push(lb);
            continue;
        }
        let next_ctx = ctx.with_state(lb.state.clone());
        for rb in eval(rhs, input, &next_ctx)? {
            let r = rb.result.as_ref().ok_or(Error::AssertionFailure {
                message: "conjunction RHS produced no value",
            })?;
            let combined = l.unwrap_or(true) && r.as_bool(at)?;
            out.push(rb.with_result(Value::Bool(combined)));
        }
    }
    Ok(out)
}

fn disjunction<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let lhs_branches = eval(lhs, input, ctx)?;
    let rhs_branches = eval(rhs, input, ctx)?;
    let mut branches = Vec::with_capacity(lhs_branches.len() + rhs_branches.len());
    branches.extend(lhs_branches);
    branches.extend(rhs_branches);
    Ok(merge_disjunction(ctx, branches))
}

/// `=`: either an assignment (when the LHS is a bare, currently-unassigned
/// state variable) or a fingerprint comparison between two already-known
/// values.
fn equals<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);

    if let Some(target) = assignment_target(lhs, input, ctx) {
        let rhs_branches = eval(rhs, input, ctx)?;
        return rhs_branches
            .into_iter()
            .map(|rb| {
                let v = rb.result.clone().ok_or(Error::AssertionFailure {
                    message: "assignment RHS produced no value",
                })?;
                let new_state = rb.state.with_var(&target, v);
                Ok(ctx.with_state(new_state).with_result(Value::Bool(true)))
            })
            .collect();
    }

    let l = crate::eval::eval_one(lhs, input, ctx)?;
    let l_val = l.result.clone().ok_or(Error::AssertionFailure {
        message: "comparison LHS produced no value",
    })?;
    let next_ctx = ctx.with_state(l.state.clone());
    let r = crate::eval::eval_one(rhs, input, &next_ctx)?;
    let r_val = r.result.clone().ok_or(Error::AssertionFailure {
        message: "comparison RHS produced no value",
    })?;
    let _ = at;
    Ok(vec![ctx.with_state(r.state.clone()).with_result(Value::Bool(l_val == r_val))])
}

/// `#` / `/=`: a pure fingerprint comparison. Unlike `=`, this never treats
/// an unassigned variable reference on either side as an assignment target —
/// both sides are evaluated as ordinary expressions and compared directly.
fn not_equals<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let l = crate::eval::eval_one(lhs, input, ctx)?;
    let l_val = l.result.clone().ok_or(Error::AssertionFailure {
        message: "comparison LHS produced no value",
    })?;
    let next_ctx = ctx.with_state(l.state.clone());
    let r = crate::eval::eval_one(rhs, input, &next_ctx)?;
    let r_val = r.result.clone().ok_or(Error::AssertionFailure {
        message: "comparison RHS produced no value",
    })?;
    Ok(vec![ctx.with_state(r.state.clone()).with_result(Value::Bool(l_val != r_val))])
}

fn compare<'d>(
    lhs: Node<'d>,
    rhs: Node<'d>,
    input: &str,
    ctx: &Context<'d>,
    f: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);
    let l = crate::eval::eval_one(lhs, input, ctx)?;
    let next_ctx = ctx.with_state(l.state.clone());
    let r = crate::eval::eval_one(rhs, input, &next_ctx)?;
    let l_val = l.result.as_ref().ok_or(Error::AssertionFailure {
        message: "comparison LHS produced no value",
    })?;
    let r_val = r.result.as_ref().ok_or(Error::AssertionFailure {
        message: "comparison RHS produced no value",
    })?;
    let ord = l_val.cmp_int(r_val, at)?;
    Ok(vec![ctx.with_state(r.state.clone()).with_result(Value::Bool(f(ord)))])
}

/// Returns the state-variable key (`"x"` or `"x'"`) that `node` assigns to,
/// if `node` is a bare reference to a currently-unassigned declared
/// variable: a primed reference always qualifies, an unprimed one only
/// while `unprimed_assignment_allowed` (i.e. during `Init`).
fn assignment_target(node: Node<'_>, input: &str, ctx: &Context<'_>) -> Option<String> {
    if node.kind() == "bound_postfix_op" {
        let children = named_children(node);
        let ident = children.iter().find(|c| c.kind() == "identifier" || c.kind() == "identifier_ref")?;
        let has_prime = children.iter().any(|c| c.kind() == "prime");
        if !has_prime {
            return None;
        }
        let name = get_str(ident, input);
        let key = format!("{name}'");
        if ctx.state.has(name) && !ctx.state.is_assigned(&key) {
            return Some(key);
        }
        return None;
    }

    if (node.kind() == "identifier" || node.kind() == "identifier_ref") && ctx.unprimed_assignment_allowed {
        let name = get_str(&node, input);
        if ctx.state.has(name) && !ctx.state.is_assigned(name) {
            return Some(name.to_string());
        }
    }

    None
}

pub(super) fn conj_list<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    eval_list(node, input, ctx, true)
}

pub(super) fn disj_list<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    eval_list(node, input, ctx, false)
}

pub(super) fn list_item<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let inner = list_item_expr(node).ok_or(Error::AssertionFailure {
        message: "list item has no expression",
    })?;
    eval(inner, input, ctx)
}

fn eval_list<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>, is_conjunction: bool) -> Result<Vec<Context<'d>>, Error> {
    let items: Vec<Node<'d>> = named_children(node)
        .into_iter()
        .filter(|n| matches!(n.kind(), "conj_item" | "disj_item"))
        .collect();

    if is_conjunction {
        eval_conjunction(&items, 0, input, ctx)
    } else {
        let mut branches = Vec::new();
        for item in &items {
            branches.extend(list_item(*item, input, ctx)?);
        }
        Ok(merge_disjunction(ctx, branches))
    }
}

fn eval_conjunction<'d>(items: &[Node<'d>], idx: usize, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let Some(item) = items.get(idx) else {
        return Ok(vec![ctx.clone()]);
    };

    let item_branches = list_item(*item, input, ctx)?;
    let mut out = Vec::new();
    for ib in item_branches {
        let is_false = ib.result_bool() == Some(false);
        if is_false {
            out.push(ib);
            continue;
        }
        let next_ctx = ctx.with_state(ib.state.clone());
        for rest in eval_conjunction(items, idx + 1, input, &next_ctx)? {
            let combined = match (ib.result_bool(), rest.result_bool()) {
                (Some(a), Some(b)) => Some(a && b),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            };
            let mut merged = rest;
            if let Some(v) = combined {
                merged.result = Some(Value::Bool(v));
            }
            out.push(merged);
        }
    }
    Ok(out)
}
