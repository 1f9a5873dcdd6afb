use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::{eval_one, named_children};
use crate::value::Value;

pub(super) fn tuple_literal<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let elems = named_children(node);
    let mut running = ctx.clone();
    let mut values = Vec::with_capacity(elems.len());
    for e in elems {
        let b = eval_one(e, input, &running)?;
        running = ctx.with_state(b.state.clone());
        values.push(b.result.ok_or(Error::AssertionFailure {
            message: "tuple element produced no value",
        })?);
    }
    Ok(vec![running.with_result(Value::tuple(values))])
}

/// Shared shape for the one binary sequence operator, `\o` (concatenation).
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
        message: "\\o LHS produced no value",
    })?;
    let r_val = r.result.as_ref().ok_or(Error::AssertionFailure {
        message: "\\o RHS produced no value",
    })?;

    let v = f(l_val, r_val, at)?;
    Ok(vec![ctx.with_state(r.state.clone()).with_result(v)])
}

/// `Len(s)`.
pub(super) fn len<'d>(arg: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&arg);
    let b = eval_one(arg, input, ctx)?;
    let n = b
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "Len argument produced no value",
        })?
        .len(at)?;
    Ok(vec![b.with_result(Value::Int(n))])
}

/// `Head(s)`.
pub(super) fn head<'d>(arg: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&arg);
    let b = eval_one(arg, input, ctx)?;
    let v = b
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "Head argument produced no value",
        })?
        .head(at)?;
    Ok(vec![b.with_result(v)])
}

/// `Tail(s)`.
pub(super) fn tail<'d>(arg: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&arg);
    let b = eval_one(arg, input, ctx)?;
    let v = b
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "Tail argument produced no value",
        })?
        .tail(at)?;
    Ok(vec![b.with_result(v)])
}

/// `Append(s, v)`.
pub(super) fn append<'d>(seq: Node<'d>, elem: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&seq);
    let s = eval_one(seq, input, ctx)?;
    let next_ctx = ctx.with_state(s.state.clone());
    let e = eval_one(elem, input, &next_ctx)?;

    let s_val = s.result.as_ref().ok_or(Error::AssertionFailure {
        message: "Append sequence argument produced no value",
    })?;
    let e_val = e.result.clone().ok_or(Error::AssertionFailure {
        message: "Append element argument produced no value",
    })?;

    let v = s_val.append(e_val, at)?;
    Ok(vec![ctx.with_state(e.state.clone()).with_result(v)])
}
