use tree_sitter::Node;

use crate::context::Context;
use crate::error::{Error, Position};
use crate::eval::named_children;
use crate::get_str;
use crate::state::State;
use crate::value::Value;

/// `UNCHANGED v` / `UNCHANGED <<v1, ..., vn>>`: binds each `vi' := vi` in the
/// state, yielding `TRUE`. A bare identifier that isn't itself a declared
/// variable is treated as a definition name: its body is expanded and
/// `UNCHANGED` re-applied to it.
pub(crate) fn unchanged<'d>(node: Node<'d>, input: &str, ctx: &Context<'d>) -> Result<Vec<Context<'d>>, Error> {
    if node.kind() == "tuple_literal" {
        let mut state = ctx.state.clone();
        for elem in named_children(node) {
            state = freeze(elem, input, ctx, state)?;
        }
        return Ok(vec![ctx.with_state(state).with_result(Value::Bool(true))]);
    }

    if matches!(node.kind(), "identifier" | "identifier_ref") {
        let name = get_str(&node, input);
        if !ctx.state.has(name) {
            let def = ctx.defs.operators.get(name).ok_or(Error::UnboundIdentifier {
                name: name.to_string(),
                at: Position::from(&node),
            })?;
            return unchanged(def.body, input, ctx);
        }
    }

    let state = freeze(node, input, ctx, ctx.state.clone())?;
    Ok(vec![ctx.with_state(state).with_result(Value::Bool(true))])
}

fn freeze<'d>(node: Node<'d>, input: &str, _ctx: &Context<'d>, state: State) -> Result<State, Error> {
    let name = get_str(&node, input);
    let current = state.get(name).cloned().ok_or(Error::UnboundIdentifier {
        name: name.to_string(),
        at: Position::from(&node),
    })?;
    Ok(state.with_var(&format!("{name}'"), current))
}
