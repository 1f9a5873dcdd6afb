use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::{eval_one, named_children};
use crate::get_str;
use crate::module::quantifier_bound;
use crate::value::Value;

pub(super) fn domain<'d>(operand: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let at = Position::from(&operand);
    let b = eval_one(operand, input, ctx)?;
    let v = b.result.as_ref().ok_or(Error::AssertionFailure {
        message: "DOMAIN operand produced no value",
    })?;
    Ok(vec![b.with_result(v.domain(at)?)])
}

/// `[v1 \in S1, v2 \in S2, ... |-> e]`: a function literal over the
/// cartesian product of its bounds.
pub(super) fn literal<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (body, bound_nodes) = children.split_last().ok_or(Error::AssertionFailure {
        message: "function literal missing a body",
    })?;

    let bounds = bound_nodes
        .iter()
        .map(|n| quantifier_bound(*n, input))
        .collect::<Result<Vec<_>, _>>()?;

    from_def(&bounds, *body, input, ctx)
}

/// Builds a function value from a set of bounds and a body, shared by
/// function literals and by module-level / `LET`-local `F[...] == ...`
/// definitions resolved by name.
pub(super) fn from_def<'d>(bounds: &[(String, Node<'d>)], body: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let mut domain = Vec::new();
    let mut range = Vec::new();
    build_function(bounds, 0, &imbl::Vector::new(), body, input, ctx, &mut domain, &mut range)?;

    Ok(vec![ctx.with_result(Value::function(
        imbl::Vector::from(domain),
        imbl::Vector::from(range),
    ))])
}

#[allow(clippy::too_many_arguments)]
pub(super) fn build_function<'d>(
    bounds: &[(String, Node<'d>)],
    idx: usize,
    key_so_far: &imbl::Vector<Value>,
    body: Node<'d>,
    input: &str,
    ctx: &Context<'d>,
    domain: &mut Vec<Value>,
    range: &mut Vec<Value>,
) -> Result<(), Error> {
    let Some((binder, domain_node)) = bounds.get(idx) else {
        let b = eval_one(body, input, ctx)?;
        let v = b.result.ok_or(Error::AssertionFailure {
            message: "function literal body produced no value",
        })?;
        let key = if key_so_far.len() == 1 {
            key_so_far[0].clone()
        } else {
            Value::tuple(key_so_far.iter().cloned())
        };
        domain.push(key);
        range.push(v);
        return Ok(());
    };

    let at = Position::from(domain_node);
    let d = eval_one(*domain_node, input, ctx)?;
    let dom = d.result.as_ref().ok_or(Error::AssertionFailure {
        message: "function literal domain produced no value",
    })?;

    for elem in dom.as_set(at)?.iter() {
        let bound_ctx = crate::eval::bind_pattern(ctx, binder, elem.clone(), at)?;
        let mut key = key_so_far.clone();
        key.push_back(elem.clone());
        build_function(bounds, idx + 1, &key, body, input, &bound_ctx, domain, range)?;
    }
    Ok(())
}

/// `f[a]` / `f[a, b]`: function/tuple application. Multiple arguments are
/// bundled into a single `Tuple` argument.
pub(super) fn application<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (fn_node, arg_nodes) = children.split_first().ok_or(Error::AssertionFailure {
        message: "function application missing the callee",
    })?;
    let at = Position::from(fn_node);

    let f = eval_one(*fn_node, input, ctx)?;
    let mut running = ctx.with_state(f.state.clone());
    let mut args = Vec::with_capacity(arg_nodes.len());
    for arg in arg_nodes {
        let b = eval_one(*arg, input, &running)?;
        running = ctx.with_state(b.state.clone());
        args.push(b.result.ok_or(Error::AssertionFailure {
            message: "function application argument produced no value",
        })?);
    }

    let fn_val = f.result.as_ref().ok_or(Error::AssertionFailure {
        message: "function application callee produced no value",
    })?;

    let arg = if args.len() == 1 {
        args.into_iter().next().unwrap()
    } else {
        Value::tuple(args)
    };

    let result = fn_val.apply(&arg, at)?;
    Ok(vec![running.with_result(result)])
}

/// `[S -> T]`: the set of all functions from `S` to `T`.
pub(super) fn set_of_functions<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    if children.len() != 2 {
        return Err(Error::AssertionFailure {
            message: "set of functions missing a domain or range",
        });
    }
    let at = Position::from(&children[0]);
    let s = eval_one(children[0], input, ctx)?;
    let next_ctx = ctx.with_state(s.state.clone());
    let t = eval_one(children[1], input, &next_ctx)?;

    let domain_elems: Vec<&Value> = s
        .result
        .as_ref()
        .ok_or(Error::AssertionFailure {
            message: "set of functions domain produced no value",
        })?
        .as_set(at)?
        .iter()
        .collect();
    let range_set = t.result.as_ref().ok_or(Error::AssertionFailure {
        message: "set of functions range produced no value",
    })?;
    let range_elems: Vec<Value> = range_set.as_set(at)?.iter().cloned().collect();

    let mut out = Vec::new();
    enumerate_functions(&domain_elems, &range_elems, 0, imbl::Vector::new(), &mut out);
    Ok(vec![ctx.with_state(t.state.clone()).with_result(Value::set(out))])
}

fn enumerate_functions(domain: &[&Value], range: &[Value], idx: usize, built: imbl::Vector<Value>, out: &mut Vec<Value>) {
    let Some(_) = domain.get(idx) else {
        out.push(Value::function(domain.iter().map(|v| (*v).clone()).collect(), built));
        return;
    };
    for v in range {
        let mut next = built.clone();
        next.push_back(v.clone());
        enumerate_functions(domain, range, idx + 1, next, out);
    }
}

/// `[f1: S1, f2: S2, ...]`: the set of records whose fields range over the
/// respective sets.
pub(super) fn set_of_records<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    if children.len() % 2 != 0 {
        return Err(Error::AssertionFailure {
            message: "set of records has a dangling field",
        });
    }

    let mut running = ctx.clone();
    let mut fields: Vec<(String, Vec<Value>)> = Vec::new();
    for pair in children.chunks(2) {
        let name = get_str(&pair[0], input).to_string();
        let at = Position::from(&pair[1]);
        let b = eval_one(pair[1], input, &running)?;
        running = ctx.with_state(b.state.clone());
        let set = b.result.as_ref().ok_or(Error::AssertionFailure {
            message: "set of records field type produced no value",
        })?;
        fields.push((name, set.as_set(at)?.iter().cloned().collect()));
    }

    let mut out = Vec::new();
    enumerate_records(&fields, 0, Vec::new(), &mut out);
    Ok(vec![running.with_result(Value::set(out))])
}

fn enumerate_records(fields: &[(String, Vec<Value>)], idx: usize, built: Vec<(String, Value)>, out: &mut Vec<Value>) {
    let Some((name, values)) = fields.get(idx) else {
        out.push(Value::record(built));
        return;
    };
    for v in values {
        let mut next = built.clone();
        next.push((name.clone(), v.clone()));
        enumerate_records(fields, idx + 1, next, out);
    }
}

/// `[f1 |-> e1, f2 |-> e2, ...]`.
pub(super) fn record_literal<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    if children.len() % 2 != 0 {
        return Err(Error::AssertionFailure {
            message: "record literal has a dangling field",
        });
    }

    let mut running = ctx.clone();
    let mut fields = Vec::with_capacity(children.len() / 2);
    for pair in children.chunks(2) {
        let name = get_str(&pair[0], input).to_string();
        let b = eval_one(pair[1], input, &running)?;
        running = ctx.with_state(b.state.clone());
        let v = b.result.ok_or(Error::AssertionFailure {
            message: "record literal field value produced no value",
        })?;
        fields.push((name, v));
    }

    Ok(vec![running.with_result(Value::record(fields))])
}

/// `r.f`: desugars to `r["f"]`.
pub(super) fn record_field_access<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    if children.len() != 2 {
        return Err(Error::AssertionFailure {
            message: "record field access missing the record or field name",
        });
    }
    let at = Position::from(&children[0]);
    let r = eval_one(children[0], input, ctx)?;
    let field = get_str(&children[1], input);
    let v = r.result.as_ref().ok_or(Error::AssertionFailure {
        message: "record field access base produced no value",
    })?;
    let result = v.apply(&Value::Str(field.to_string()), at)?;
    Ok(vec![r.with_result(result)])
}

/// `a :> b`: the single-mapping function `[x \in {a} |-> b]`.
pub(super) fn singleton_function<'d>(lhs: Node<'d>, rhs: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let l = eval_one(lhs, input, ctx)?;
    let next_ctx = ctx.with_state(l.state.clone());
    let r = eval_one(rhs, input, &next_ctx)?;

    let key = l.result.clone().ok_or(Error::AssertionFailure {
        message: ":> LHS produced no value",
    })?;
    let value = r.result.clone().ok_or(Error::AssertionFailure {
        message: ":> RHS produced no value",
    })?;

    let f = Value::function(imbl::Vector::from(vec![key]), imbl::Vector::from(vec![value]));
    Ok(vec![ctx.with_state(r.state.clone()).with_result(f)])
}

/// `[f EXCEPT !p1 = e1, !p2 = e2]`: each `except_update` applies in turn to
/// the running value, `@` inside its RHS resolving to the value currently at
/// that path.
pub(super) fn except<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (base_node, updates) = children.split_first().ok_or(Error::AssertionFailure {
        message: "EXCEPT missing a base function",
    })?;
    let at = Position::from(base_node);

    let base = eval_one(*base_node, input, ctx)?;
    let mut running = ctx.with_state(base.state.clone());
    let mut current = base.result.ok_or(Error::AssertionFailure {
        message: "EXCEPT base produced no value",
    })?;

    for update in updates {
        if update.kind() != "except_update" {
            return Err(Error::AssertionFailure {
                message: "EXCEPT clause is not an except_update",
            });
        }
        let parts = named_children(*update);
        let (specifier, rhs) = parts.split_first().ok_or(Error::AssertionFailure {
            message: "EXCEPT update missing a path or value",
        })?;
        let rhs = *rhs.first().ok_or(Error::AssertionFailure {
            message: "EXCEPT update missing a value",
        })?;

        let mut path = Vec::new();
        for selector in named_children(*specifier) {
            match selector.kind() {
                "except_update_record_field" => {
                    let field = named_children(selector)
                        .into_iter()
                        .next()
                        .ok_or(Error::AssertionFailure {
                            message: "EXCEPT record field selector missing a name",
                        })?;
                    path.push(Value::Str(get_str(&field, input).to_string()));
                }
                "except_update_fn_appl" => {
                    let arg_nodes = named_children(selector);
                    let mut args = Vec::with_capacity(arg_nodes.len());
                    for arg in arg_nodes {
                        let b = eval_one(arg, input, &running)?;
                        running = ctx.with_state(b.state.clone());
                        args.push(b.result.ok_or(Error::AssertionFailure {
                            message: "EXCEPT index selector produced no value",
                        })?);
                    }
                    if args.len() == 1 {
                        path.push(args.into_iter().next().unwrap());
                    } else {
                        path.push(Value::tuple(args));
                    }
                }
                other => {
                    return Err(Error::UnsupportedConstruct {
                        kind: format!("EXCEPT selector `{other}`"),
                        at: Position::from(&selector),
                    })
                }
            }
        }

        let state_for_rhs = running.clone();
        current = current.update_path(
            &path,
            |prev| {
                let with_prev = state_for_rhs.with_prev_func_val(prev.clone());
                let b = eval_one(rhs, input, &with_prev)?;
                b.result.ok_or(Error::AssertionFailure {
                    message: "EXCEPT update value produced no value",
                })
            },
            at,
        )?;
    }

    Ok(vec![running.with_result(current)])
}
