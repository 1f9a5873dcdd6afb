use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::eval_one;
use crate::value::Value;

fn binop<'d>(
    lhs: Node<'d>,
    rhs: Node<'d>,
    input: &str,
    ctx: &Context<'d>,
    f: impl Fn(i64, i64) -> Result<i64, Error>,
) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);
    let l = eval_one(lhs, input, ctx)?;
    let next_ctx = ctx.with_state(l.state.clone());
    let r = eval_one(rhs, input, &next_ctx)?;

    let l_val = l.result.as_ref().ok_or(Error::AssertionFailure {
        message: "arithmetic LHS produced no value",
    })?;
    let r_val = r.result.as_ref().ok_or(Error::AssertionFailure {
        message: "arithmetic RHS produced no value",
    })?;

    let n = f(l_val.as_int(at)?, r_val.as_int(at)?)?;
    Ok(vec![ctx.with_state(r.state.clone()).with_result(Value::Int(n))])
}

pub(super) fn add<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    binop(lhs, rhs, input, ctx, |a, b| Ok(a + b))
}

pub(super) fn sub<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    binop(lhs, rhs, input, ctx, |a, b| Ok(a - b))
}

pub(super) fn mul<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    binop(lhs, rhs, input, ctx, |a, b| Ok(a * b))
}

pub(super) fn modulo<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);
    binop(lhs, rhs, input, ctx, move |a, b| {
        if b == 0 {
            return Err(Error::DomainError {
                arg: "division by zero".to_string(),
                at,
            });
        }
        Ok(a.rem_euclid(b))
    })
}

/// `a..b`: the inclusive integer range, as a `Set`.
pub(super) fn range<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&lhs);
    let l = eval_one(lhs, input, ctx)?;
    let next_ctx = ctx.with_state(l.state.clone());
    let r = eval_one(rhs, input, &next_ctx)?;

    let lo = l
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "range LHS produced no value",
        })?
        .as_int(at)?;
    let hi = r
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "range RHS produced no value",
        })?
        .as_int(at)?;

    let set = Value::set((lo..=hi).map(Value::Int));
    Ok(vec![ctx.with_state(r.state.clone()).with_result(set)])
}

pub(super) fn unary_minus<'d>(operand: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&operand);
    let b = eval_one(operand, input, ctx)?;
    let n = b
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "unary minus operand produced no value",
        })?
        .as_int(at)?;
    Ok(vec![b.with_result(Value::Int(-n))])
}

pub(super) fn powerset<'d>(operand: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&operand);
    let b = eval_one(operand, input, ctx)?;
    let s = b.result.as_ref().ok_or(Error::AssertionFailure {
        message: "SUBSET operand produced no value",
    })?;
    let ps = s.powerset(at)?;
    Ok(vec![b.with_result(ps)])
}
