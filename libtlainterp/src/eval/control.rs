use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::{eval, eval_one, named_children};
use crate::get_str;
use crate::module::quantifier_bound;
use crate::value::Value;

/// `IF c THEN a ELSE b`.
pub(super) fn if_then_else<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (cond, then_expr, else_expr) = match children.as_slice() {
        [c, t, e] => (*c, *t, *e),
        _ => {
            return Err(Error::AssertionFailure {
                message: "IF/THEN/ELSE has an unexpected shape",
            })
        }
    };

    let at = Position::from(&cond);
    let c = eval_one(cond, input, ctx)?;
    let holds = c
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "IF condition produced no value",
        })?
        .as_bool(at)?;
    let next_ctx = ctx.with_state(c.state.clone());
    if holds {
        eval(then_expr, input, &next_ctx)
    } else {
        eval(else_expr, input, &next_ctx)
    }
}

/// `CASE c1 -> e1 [] c2 -> e2 [] OTHER -> e`: first-true-wins, or `OTHER` if
/// none of `c1, c2, ...` holds. Fails if neither applies.
pub(super) fn case<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let mut running = ctx.clone();
    let mut other = None;

    for arm in named_children(node) {
        match arm.kind() {
            "case_arm" => {
                let parts = named_children(arm);
                let (cond, value) = match parts.as_slice() {
                    [c, v] => (*c, *v),
                    _ => {
                        return Err(Error::AssertionFailure {
                            message: "CASE arm missing a condition or value",
                        })
                    }
                };
                let at = Position::from(&cond);
                let c = eval_one(cond, input, &running)?;
                running = ctx.with_state(c.state.clone());
                let holds = c
                    .result
                    .as_ref()
                    .ok_or(Error::AssertionFailure {
                        message: "CASE condition produced no value",
                    })?
                    .as_bool(at)?;
                if holds {
                    return eval(value, input, &running);
                }
            }
            "other_arm" => {
                other = named_children(arm).into_iter().next();
            }
            _ => {}
        }
    }

    match other {
        Some(value) => eval(value, input, &running),
        None => Err(Error::NonexhaustiveCase {
            at: Position::from(&node),
        }),
    }
}

/// `LET d1 == ... d2 == ... IN e`: binds each definition in turn, so later
/// ones see earlier ones, then evaluates `e` in the extended environment.
pub(super) fn let_in<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (body, defs) = children.split_last().ok_or(Error::AssertionFailure {
        message: "LET/IN missing a body",
    })?;

    let mut running = ctx.clone();
    for def in defs {
        running = bind_let_def(*def, input, &running)?;
    }

    eval(*body, input, &running)
}

/// Binds a single `LET`-local definition into `ctx`: a zero-arity operator
/// is evaluated eagerly and bound as a value (so later definitions can see
/// it); a parameterized operator is recorded as a [`crate::context::LocalOp`]
/// and evaluated lazily at each call site; a function definition is
/// evaluated eagerly into a concrete function value, since this
/// interpreter's subset excludes recursive definitions.
fn bind_let_def<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Context<'d>, Error> {
    match node.kind() {
        "operator_definition" => {
            let children = named_children(node);
            let (name_node, rest) = children.split_first().ok_or(Error::AssertionFailure {
                message: "LET operator definition missing a name",
            })?;
            let (body, params) = rest.split_last().ok_or(Error::AssertionFailure {
                message: "LET operator definition missing a body",
            })?;
            let name = get_str(name_node, input).to_string();

            if params.is_empty() {
                let b = eval_one(*body, input, ctx)?;
                let v = b.result.ok_or(Error::AssertionFailure {
                    message: "LET operator body produced no value",
                })?;
                Ok(ctx.with_state(b.state.clone()).with_binding(name, v))
            } else {
                let params = params.iter().map(|p| get_str(p, input).to_string()).collect();
                Ok(ctx.with_local_op(name, params, *body))
            }
        }
        "function_definition" => {
            let children = named_children(node);
            let (name_node, rest) = children.split_first().ok_or(Error::AssertionFailure {
                message: "LET function definition missing a name",
            })?;
            let (body, bound_nodes) = rest.split_last().ok_or(Error::AssertionFailure {
                message: "LET function definition missing a body",
            })?;
            let name = get_str(name_node, input).to_string();
            let bounds = bound_nodes
                .iter()
                .map(|n| quantifier_bound(*n, input))
                .collect::<Result<Vec<_>, _>>()?;

            let mut branches = super::functions::from_def(&bounds, *body, input, ctx)?;
            let b = branches.remove(0);
            let v = b.result.ok_or(Error::AssertionFailure {
                message: "LET function body produced no value",
            })?;
            Ok(ctx.with_state(b.state.clone()).with_binding(name, v))
        }
        other => Err(Error::UnsupportedConstruct {
            kind: format!("LET definition `{other}`"),
            at: Position::from(&node),
        }),
    }
}

/// `ENABLED e`: surfaces `e`'s boolean value, discarding any state it would
/// have assigned. This is an approximation: existence of a successor state
/// is not independently verified, only the operand's own boolean result.
pub(super) fn enabled<'d>(operand: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let branches = eval(operand, input, ctx)?;
    let any_true = branches.iter().any(|b| b.result_bool().unwrap_or(false));
    Ok(vec![ctx.with_result(Value::Bool(any_true))])
}

/// `[A]_vars`: a step that either performs `A` or leaves `vars` unchanged.
/// The angle-bracket fairness form `<<A>>_vars` is outside this
/// interpreter's supported subset (it only matters under temporal
/// fairness, a Non-goal).
pub(super) fn step_or_stutter<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (action, vars) = match children.as_slice() {
        [a, v] => (*a, *v),
        _ => {
            return Err(Error::StepOrStutter {
                at: Position::from(&node),
            })
        }
    };

    let mut branches = eval(action, input, ctx)?;
    branches.extend(super::unchanged::unchanged(vars, input, ctx)?);
    Ok(super::boolean::merge_disjunction(ctx, branches))
}
