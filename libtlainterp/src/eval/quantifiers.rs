use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::boolean::merge_disjunction;
use crate::eval::{bind_pattern, eval, eval_one, named_children};
use crate::get_str;
use crate::module::quantifier_bound;
use crate::value::Value;

/// `\A v \in S : P` / `\E v \in S : P`, assumed already normalized to a
/// single binder over a single domain by the rewriter.
pub(super) fn bounded<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let mut keyword = None;
    let mut bound = None;
    let mut body = None;
    for child in named_children(node) {
        match child.kind() {
            "exists" | "forall" => keyword = Some(child),
            "quantifier_bound" => bound = Some(child),
            _ => body = Some(child),
        }
    }
    let (keyword, bound_node, body) = match (keyword, bound, body) {
        (Some(k), Some(b), Some(p)) => (k, b, p),
        _ => {
            return Err(Error::AssertionFailure {
                message: "bounded quantification has an unexpected shape",
            })
        }
    };

    let (binder, domain_node) = quantifier_bound(bound_node, input)?;
    let at = Position::from(&domain_node);
    let d = eval_one(domain_node, input, ctx)?;
    let domain = d.result.as_ref().ok_or(Error::AssertionFailure {
        message: "quantifier domain produced no value",
    })?;
    let elems: Vec<Value> = domain.as_set(at)?.iter().cloned().collect();

    match keyword.kind() {
        "forall" => {
            for elem in &elems {
                let bound_ctx = bind_pattern(&d, &binder, elem.clone(), at)?;
                let b = eval_one(body, input, &bound_ctx)?;
                let holds = b
                    .result
                    .as_ref()
                    .ok_or(Error::AssertionFailure {
                        message: "\\A body produced no value",
                    })?
                    .as_bool(at)?;
                if !holds {
                    return Ok(vec![d.with_result(Value::Bool(false))]);
                }
            }
            Ok(vec![d.with_result(Value::Bool(true))])
        }
        "exists" => {
            let mut branches = Vec::new();
            for elem in &elems {
                let bound_ctx = bind_pattern(&d, &binder, elem.clone(), at)?;
                branches.extend(eval(body, input, &bound_ctx)?);
            }
            Ok(merge_disjunction(&d, branches))
        }
        other => Err(Error::UnsupportedConstruct {
            kind: format!("quantifier `{other}`"),
            at: Position::from(&keyword),
        }),
    }
}

/// `CHOOSE v \in S : P`: the first element of `S`, in fingerprint-sorted
/// order, for which `P` holds. Unbounded `CHOOSE v : P` is outside this
/// interpreter's supported subset.
pub(super) fn choose<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    let (binder, domain_node, predicate) = match children.as_slice() {
        [binder, domain, predicate] => (*binder, *domain, *predicate),
        _ => {
            return Err(Error::UnsupportedConstruct {
                kind: "unbounded CHOOSE".to_string(),
                at: Position::from(&node),
            })
        }
    };

    let binder_name = get_str(&binder, input).to_string();
    let at = Position::from(&domain_node);
    let d = eval_one(domain_node, input, ctx)?;
    let domain = d.result.as_ref().ok_or(Error::AssertionFailure {
        message: "CHOOSE domain produced no value",
    })?;

    for elem in domain.sorted_elems(at)? {
        let bound_ctx = bind_pattern(&d, &binder_name, elem.clone(), at)?;
        let p = eval_one(predicate, input, &bound_ctx)?;
        let holds = p
            .result
            .as_ref()
            .ok_or(Error::AssertionFailure {
                message: "CHOOSE predicate produced no value",
            })?
            .as_bool(at)?;
        if holds {
            return Ok(vec![d.with_result(elem.clone())]);
        }
    }

    Err(Error::NoWitness { at })
}
