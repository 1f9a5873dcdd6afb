use std::collections::HashMap;

use tree_sitter::{Node, Tree};

use crate::error::{Error, Position};
use crate::get_str;

/// An `Op(p1, ..., pn) == body` definition extracted from the module.
#[derive(Debug)]
pub struct OperatorDef<'t> {
    /// The operator's name.
    pub name: String,
    /// Formal parameter names, in declaration order.
    pub params: Vec<String>,
    /// The definition's body expression.
    pub body: Node<'t>,
}

/// An `F[v1 \in S1, ...] == body` function definition extracted from the
/// module.
#[derive(Debug)]
pub struct FunctionDef<'t> {
    /// The function's name.
    pub name: String,
    /// `(binder, domain)` pairs, in declaration order. `binder` is the raw
    /// source text of the bound pattern (usually a single identifier).
    pub bounds: Vec<(String, Node<'t>)>,
    /// The function's body expression.
    pub body: Node<'t>,
}

/// Operator and function definitions collected by [`extract`], keyed by
/// name.
#[derive(Debug, Default)]
pub struct Definitions<'t> {
    /// `Op == ...` and `Op(params) == ...` definitions.
    pub operators: HashMap<String, OperatorDef<'t>>,
    /// `F[bounds] == ...` definitions.
    pub functions: HashMap<String, FunctionDef<'t>>,
}

/// A module's constant and variable declarations, its definitions, and its
/// `Init`/`Next` bodies.
#[derive(Debug)]
pub struct Module<'t> {
    /// The name following `MODULE` in the header line.
    pub name: String,
    /// Declared constant names, in declaration order.
    pub constants: Vec<String>,
    /// Declared variable names, in declaration order.
    pub variables: Vec<String>,
    /// Every operator and function definition in the module.
    pub defs: Definitions<'t>,
    init: Option<Node<'t>>,
    next: Option<Node<'t>>,
}

impl<'t> Module<'t> {
    /// Returns the body of the `Init` definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDefinition`] if the module has no `Init`.
    pub fn init(&self) -> Result<Node<'t>, Error> {
        self.init.ok_or(Error::MissingDefinition { name: "Init" })
    }

    /// Returns the `Next` action list: the disjuncts of `Next`'s body if it
    /// is a top-level disjunction, otherwise the single body node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDefinition`] if the module has no `Next`.
    pub fn next_actions(&self) -> Result<Vec<Node<'t>>, Error> {
        let body = self.next.ok_or(Error::MissingDefinition { name: "Next" })?;
        Ok(disjuncts(body))
    }
}

/// Splits `node` into its disjuncts if it is a `disj_list`, otherwise
/// returns it unchanged as the sole element.
fn disjuncts(node: Node<'_>) -> Vec<Node<'_>> {
    if node.kind() != "disj_list" {
        return vec![node];
    }
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter_map(list_item_expr)
        .collect()
}

/// Returns the expression child of a `conj_item`/`disj_item`, skipping its
/// leading `bullet_conj`/`bullet_disj` marker.
pub(crate) fn list_item_expr(item: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = item.walk();
    item.named_children(&mut cursor)
        .find(|n| !matches!(n.kind(), "bullet_conj" | "bullet_disj"))
}

/// Walks the rewritten module tree once, collecting declarations,
/// definitions, and the `Init`/`Next` bodies.
pub fn extract<'t>(tree: &'t Tree, input: &str) -> Result<Module<'t>, Error> {
    let root = tree.root_node();
    if root.kind() != "module" {
        return Err(Error::ModuleHeader);
    }

    let mut cursor = root.walk();
    let mut children = root.named_children(&mut cursor).peekable();

    let mut name = String::new();
    let mut constants = Vec::new();
    let mut variables = Vec::new();
    let mut defs = Definitions::default();
    let mut init = None;
    let mut next = None;
    let mut init_first: Option<Position> = None;
    let mut next_first: Option<Position> = None;

    while let Some(node) = children.next() {
        match node.kind() {
            "header_line" => {
                let ident = children
                    .next_if(|n| n.kind() == "identifier")
                    .ok_or(Error::ModuleHeader)?;
                name = get_str(&ident, input).trim().to_string();
                children
                    .next_if(|n| n.kind() == "header_line")
                    .ok_or(Error::ModuleHeader)?;
            }

            "constant_declaration" => collect_identifiers(node, input, &mut constants),
            "variable_declaration" => collect_identifiers(node, input, &mut variables),

            "operator_definition" => {
                insert_operator(node, input, &mut defs, &mut init, &mut next, &mut init_first, &mut next_first)?;
            }
            "function_definition" => {
                let def = extract_function_def(node, input)?;
                defs.functions.insert(def.name.clone(), def);
            }

            // `LOCAL Op == ...` / `LOCAL F[...] == ...`: same definitions,
            // just not re-exported were this module `EXTENDS`-ed elsewhere.
            // Out of scope for this interpreter, but still usable locally.
            "local_definition" => {
                let mut inner_cursor = node.walk();
                if let Some(inner) = node.named_children(&mut inner_cursor).next() {
                    match inner.kind() {
                        "operator_definition" => insert_operator(
                            inner, input, &mut defs, &mut init, &mut next, &mut init_first, &mut next_first,
                        )?,
                        "function_definition" => {
                            let def = extract_function_def(inner, input)?;
                            defs.functions.insert(def.name.clone(), def);
                        }
                        _ => {}
                    }
                }
            }

            _ => {}
        }
    }

    Ok(Module {
        name,
        constants,
        variables,
        defs,
        init,
        next,
    })
}

#[allow(clippy::too_many_arguments)]
fn insert_operator<'t>(
    node: Node<'t>,
    input: &str,
    defs: &mut Definitions<'t>,
    init: &mut Option<Node<'t>>,
    next: &mut Option<Node<'t>>,
    init_first: &mut Option<Position>,
    next_first: &mut Option<Position>,
) -> Result<(), Error> {
    let (name, params, body) = name_params_body(node, input)?;
    let at = Position::from(&node);

    match name.as_str() {
        "Init" => match *init_first {
            Some(first) => {
                return Err(Error::DuplicateDefinition {
                    name: "Init",
                    first,
                    second: at,
                })
            }
            None => {
                *init_first = Some(at);
                *init = Some(body);
            }
        },
        "Next" => match *next_first {
            Some(first) => {
                return Err(Error::DuplicateDefinition {
                    name: "Next",
                    first,
                    second: at,
                })
            }
            None => {
                *next_first = Some(at);
                *next = Some(body);
            }
        },
        _ => {}
    }

    defs.operators.insert(name.clone(), OperatorDef { name, params, body });
    Ok(())
}

/// Destructures an `operator_definition` into `(name, params, body)`: the
/// first named child is the name, the last is the body, and everything in
/// between is a formal parameter.
fn name_params_body<'t>(node: Node<'t>, input: &str) -> Result<(String, Vec<String>, Node<'t>), Error> {
    let mut cursor = node.walk();
    let named: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    if named.len() < 2 {
        return Err(Error::AssertionFailure {
            message: "operator definition missing a name or body",
        });
    }

    let name = get_str(&named[0], input).to_string();
    let body = named[named.len() - 1];
    let params = named[1..named.len() - 1]
        .iter()
        .map(|n| get_str(n, input).to_string())
        .collect();

    Ok((name, params, body))
}

fn extract_function_def<'t>(node: Node<'t>, input: &str) -> Result<FunctionDef<'t>, Error> {
    let mut cursor = node.walk();
    let named: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    if named.len() < 2 {
        return Err(Error::AssertionFailure {
            message: "function definition missing a name or body",
        });
    }

    let name = get_str(&named[0], input).to_string();
    let body = named[named.len() - 1];
    let bounds = named[1..named.len() - 1]
        .iter()
        .map(|qb| quantifier_bound(*qb, input))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FunctionDef { name, bounds, body })
}

/// Destructures a `quantifier_bound` node (`v \in S`) into `(binder,
/// domain)`. `binder` is the raw source text of the bound pattern, which is
/// usually a single identifier but may be a tuple pattern (`<<a, b>>`).
pub(crate) fn quantifier_bound<'t>(node: Node<'t>, input: &str) -> Result<(String, Node<'t>), Error> {
    let mut cursor = node.walk();
    let named: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    if named.len() < 2 {
        return Err(Error::AssertionFailure {
            message: "quantifier bound missing an identifier or domain",
        });
    }
    let binder = get_str(&named[0], input).to_string();
    let domain = named[named.len() - 1];
    Ok((binder, domain))
}

/// Recursively collects every `identifier` leaf under `node` into `out`, in
/// source order. Used for `CONSTANT`/`VARIABLE` declarations, which may wrap
/// their identifier list in an intermediate grammar node.
fn collect_identifiers(node: Node<'_>, input: &str, out: &mut Vec<String>) {
    if node.kind() == "identifier" {
        out.push(get_str(&node, input).to_string());
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(child, input, out);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rewrite::parse_str;

    const SRC: &str = "\
---- MODULE M ----
CONSTANT N
VARIABLES x, y

Init == /\\ x = 0
        /\\ y = 0

Next == \\/ x' = x + 1 /\\ y' = y
        \\/ x' = x /\\ y' = y + 1

Double(a) == a * 2
====";

    #[test]
    fn extracts_declarations() {
        let tree = parse_str(SRC).unwrap();
        let module = extract(&tree, SRC).unwrap();
        assert_eq!(module.name, "M");
        assert_eq!(module.constants, vec!["N".to_string()]);
        assert_eq!(module.variables, vec!["x".to_string(), "y".to_string()]);
        assert!(module.defs.operators.contains_key("Double"));
    }

    #[test]
    fn splits_next_into_disjuncts() {
        let tree = parse_str(SRC).unwrap();
        let module = extract(&tree, SRC).unwrap();
        assert_eq!(module.next_actions().unwrap().len(), 2);
    }

    #[test]
    fn missing_next_is_an_error() {
        let src = "---- MODULE M ----\nInit == TRUE\n====";
        let tree = parse_str(src).unwrap();
        let module = extract(&tree, src).unwrap();
        assert!(matches!(
            module.next_actions(),
            Err(Error::MissingDefinition { name: "Next" })
        ));
    }

    #[test]
    fn duplicate_init_is_an_error() {
        let src = "---- MODULE M ----\nInit == TRUE\nInit == FALSE\n====";
        let tree = parse_str(src).unwrap();
        assert!(matches!(
            extract(&tree, src),
            Err(Error::DuplicateDefinition { name: "Init", .. })
        ));
    }
}
