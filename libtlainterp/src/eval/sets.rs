use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::{bind_pattern, eval_one, named_children};
use crate::get_str;
use crate::module::quantifier_bound;
use crate::value::Value;

/// Shared shape for the binary set operators (`\cup`, `\cap`, `\`, `\X`,
/// `@@`): evaluate both operands, thread state left-to-right, apply `f`.
pub(super) fn binop<'d>(
    lhs: Node<'d>,
    rhs: Node<'d>,
    input: &str,
    ctx: &Context<'d>,
    f: impl Fn(&Value, &Value, Position) -> Result<Value, Error>,
) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);
    let l = eval_one(lhs, input, ctx)?;
    let next_ctx = ctx.with_state(l.state.clone());
    let r = eval_one(rhs, input, &next_ctx)?;

    let l_val = l.result.as_ref().ok_or(Error::AssertionFailure {
        message: "set operator LHS produced no value",
    })?;
    let r_val = r.result.as_ref().ok_or(Error::AssertionFailure {
        message: "set operator RHS produced no value",
    })?;

    let v = f(l_val, r_val, at)?;
    Ok(vec![ctx.with_state(r.state.clone()).with_result(v)])
}

pub(super) fn literal<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let elems = named_children(node);
    let mut running = ctx.clone();
    let mut values = Vec::with_capacity(elems.len());
    for e in elems {
        let b = eval_one(e, input, &running)?;
        running = ctx.with_state(b.state.clone());
        values.push(b.result.ok_or(Error::AssertionFailure {
            message: "set element produced no value",
        })?);
    }
    Ok(vec![running.with_result(Value::set(values))])
}

/// `UNION S`: the union of a set of sets.
pub(super) fn union_over_sets<'d>(operand: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&operand);
    let b = eval_one(operand, input, ctx)?;
    let outer = b.result.as_ref().ok_or(Error::AssertionFailure {
        message: "UNION operand produced no value",
    })?;
    let mut elems = Vec::new();
    for s in outer.as_set(at)?.iter() {
        elems.extend(s.as_set(at)?.iter().cloned());
    }
    Ok(vec![b.with_result(Value::set(elems))])
}

/// `{ e : v1 \in S1, v2 \in S2, ... }`.
pub(super) fn map_comprehension<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (value_expr, bound_nodes) = children.split_first().ok_or(Error::AssertionFailure {
        message: "set map comprehension missing a value expression",
    })?;

    let bounds = bound_nodes
        .iter()
        .map(|n| quantifier_bound(*n, input))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::new();
    map_over_bounds(&bounds, 0, *value_expr, input, ctx, &mut out)?;
    Ok(vec![ctx.with_result(Value::set(out))])
}

fn map_over_bounds<'d>(
    bounds: &[(String, Node<'d>)],
    idx: usize,
    value_expr: Node<'d>,
    input: &str,
    ctx: &Context<'d>,
    out: &mut Vec<Value>,
) -> Result<(), Error> {
    let Some((binder, domain_node)) = bounds.get(idx) else {
        let b = eval_one(value_expr, input, ctx)?;
        out.push(b.result.ok_or(Error::AssertionFailure {
            message: "set map value expression produced no value",
        })?);
        return Ok(());
    };

    let at = Position::from(domain_node);
    let d = eval_one(*domain_node, input, ctx)?;
    let domain = d.result.as_ref().ok_or(Error::AssertionFailure {
        message: "set map domain produced no value",
    })?;

    for elem in domain.as_set(at)?.iter() {
        let bound_ctx = bind_pattern(ctx, binder, elem.clone(), at)?;
        map_over_bounds(bounds, idx + 1, value_expr, input, &bound_ctx, out)?;
    }
    Ok(())
}

/// `{ v \in S : p }`.
pub(super) fn filter_comprehension<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (binder, domain_node, predicate) = match children.len() {
        3 => (get_str(&children[0], input).to_string(), children[1], children[2]),
        2 if children[0].kind() == "quantifier_bound" => {
            let (binder, domain) = quantifier_bound(children[0], input)?;
            (binder, domain, children[1])
        }
        _ => {
            return Err(Error::AssertionFailure {
                message: "set filter comprehension has an unexpected shape",
            })
        }
    };

    let at = Position::from(&domain_node);
    let d = eval_one(domain_node, input, ctx)?;
    let domain = d.result.as_ref().ok_or(Error::AssertionFailure {
        message: "set filter domain produced no value",
    })?;

    let mut kept = Vec::new();
    for elem in domain.as_set(at)?.iter() {
        let bound_ctx = bind_pattern(ctx, &binder, elem.clone(), at)?;
        let p = eval_one(predicate, input, &bound_ctx)?;
        let keep = p
            .result
            .as_ref()
            .ok_or(Error::AssertionFailure {
                message: "set filter predicate produced no value",
            })?
            .as_bool(at)?;
        if keep {
            kept.push(elem.clone());
        }
    }
    Ok(vec![d.with_result(Value::set(kept))])
}
