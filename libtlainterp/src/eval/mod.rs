//! The recursive expression evaluator: given a syntax node and a
//! [`Context`], returns the non-empty list of evaluation branches that node
//! produces.

mod arithmetic;
mod boolean;
mod control;
mod functions;
mod literals;
mod quantifiers;
mod sequences;
mod sets;
mod unchanged;

use tree_sitter::Node;
use tracing::trace;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::value::Value;

/// Evaluates `node` under `ctx`, returning every branch it produces.
///
/// Every node kind this interpreter's subset supports is handled below; an
/// unrecognized kind fails with [`Error::UnsupportedConstruct`] rather than
/// guessing at behaviour.
pub(crate) fn eval<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    trace!(kind = node.kind(), "eval");

    match node.kind() {
        // Literals & references
        "nat_number" => literals::number(node, input, ctx),
        "boolean" => literals::boolean(node, input, ctx),
        "boolean_set" => literals::boolean_set(ctx),
        "string" => literals::string(node, input, ctx),
        "identifier" | "identifier_ref" => literals::identifier(node, input, ctx),
        "bound_postfix_op" => literals::postfix(node, input, ctx),
        "prev_func_val" => literals::prev_func_val(node, ctx),

        // Parenthesised / passthrough wrappers
        "parentheses" | "subexpr_component" => single_child(node, input, ctx),

        // Boolean logic and comparisons
        "bound_infix_op" => boolean::infix(node, input, ctx),
        "bound_prefix_op" => dispatch_prefix(node, input, ctx),

        // Conjunction / disjunction lists
        "conj_list" => boolean::conj_list(node, input, ctx),
        "disj_list" => boolean::disj_list(node, input, ctx),
        "conj_item" | "disj_item" => boolean::list_item(node, input, ctx),

        // Set-builders
        "finite_set_literal" => sets::literal(node, input, ctx),
        "set_map" => sets::map_comprehension(node, input, ctx),
        "set_filter" => sets::filter_comprehension(node, input, ctx),
        "set_of_functions" => functions::set_of_functions(node, input, ctx),
        "set_of_records" => functions::set_of_records(node, input, ctx),

        // Functions, records, EXCEPT
        "function_literal" => functions::literal(node, input, ctx),
        "function_evaluation" => functions::application(node, input, ctx),
        "record_literal" => functions::record_literal(node, input, ctx),
        "record_value" => functions::record_field_access(node, input, ctx),
        "except" => functions::except(node, input, ctx),

        // Tuples & sequences
        "tuple_literal" => sequences::tuple_literal(node, input, ctx),

        // Quantifiers / CHOOSE
        "bounded_quantification" => quantifiers::bounded(node, input, ctx),
        "choose" => quantifiers::choose(node, input, ctx),

        // Control flow
        "if_then_else" => control::if_then_else(node, input, ctx),
        "case" => control::case(node, input, ctx),
        "let_in" => control::let_in(node, input, ctx),

        // Step / stutter sequences (`[Next]_vars`, `<<Next>>_vars`)
        "step_expr_or_stutter" => control::step_or_stutter(node, input, ctx),

        // Operator / function application by name, e.g. `Foo(a, b)`
        "bound_op" => literals::bound_op(node, input, ctx),

        other => Err(Error::UnsupportedConstruct {
            kind: other.to_string(),
            at: Position::from(&node),
        }),
    }
}

/// Evaluates the sole meaningful child of a transparent wrapper node
/// (parentheses, `<<...>>` subexpression reference components).
fn single_child<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let inner = named_children(node)
        .into_iter()
        .next()
        .ok_or(Error::AssertionFailure {
            message: "wrapper node has no child",
        })?;
    eval(inner, input, ctx)
}

/// Dispatches a `bound_prefix_op`: its first named child is the operator
/// symbol, the second is the operand.
fn dispatch_prefix<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    let children = named_children(node);
    if children.len() != 2 {
        return Err(Error::AssertionFailure {
            message: "prefix operator missing symbol or operand",
        });
    }
    let (symbol, operand) = (children[0], children[1]);
    match symbol.kind() {
        "lnot" => boolean::not(operand, input, ctx),
        "powerset" => arithmetic::powerset(operand, input, ctx),
        "domain" => functions::domain(operand, input, ctx),
        "enabled" => control::enabled(operand, input, ctx),
        "union" => sets::union_over_sets(operand, input, ctx),
        "unchanged" => unchanged::unchanged(operand, input, ctx),
        "minus" => arithmetic::unary_minus(operand, input, ctx),
        other => Err(Error::UnsupportedConstruct {
            kind: format!("prefix operator `{other}`"),
            at: Position::from(&symbol),
        }),
    }
}

/// Collects the named children of `node` into a `Vec`, for positional
/// destructuring of grammar productions whose field names this interpreter
/// does not rely on.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Evaluates `node` and requires the result be a single [`crate::Value`],
/// i.e. that evaluation did not fork into multiple branches. Used where TLA+
/// itself requires a deterministic scalar (e.g. `IF`'s condition, a function
/// domain bound).
pub(crate) fn eval_one<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Context<'d>, Error> {
    let mut branches = eval(node, input, ctx)?;
    if branches.len() != 1 {
        trace!(n = branches.len(), "eval_one saw multiple branches, keeping the first");
    }
    Ok(branches.remove(0))
}

/// Binds `value` to `pattern`, which is either a single identifier or a
/// tuple pattern (`<<a, b>>`) destructured element-wise against a
/// [`crate::Value::Tuple`].
pub(crate) fn bind_pattern<'d>(
    ctx: &Context<'d>,
    pattern: &str,
    value: Value,
    at: Position,
) -> Result<Context<'d>, Error> {
    let pattern = pattern.trim();
    match pattern.strip_prefix("<<").and_then(|s| s.strip_suffix(">>")) {
        Some(inner) => {
            let names: Vec<&str> = inner.split(',').map(str::trim).collect();
            let elems = value.as_tuple(at)?;
            if elems.len() != names.len() {
                return Err(Error::ArityMismatch {
                    name: pattern.to_string(),
                    expected: names.len(),
                    got: elems.len(),
                    at,
                });
            }
            let mut out = ctx.clone();
            for (n, v) in names.iter().zip(elems.iter()) {
                out = out.with_binding((*n).to_string(), v.clone());
            }
            Ok(out)
        }
        None => Ok(ctx.with_binding(pattern.to_string(), value)),
    }
}
