use std::fmt;

use thiserror::Error;
use tree_sitter::Node;

/// A zero-indexed (row, column) location in the original source text.
///
/// Mirrors `tree_sitter::Point`, but is `Copy` and carries no lifetime so it
/// can be embedded directly in [`Error`] variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Zero-indexed row.
    pub row: usize,
    /// Zero-indexed column.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

impl From<&Node<'_>> for Position {
    fn from(n: &Node<'_>) -> Self {
        let p = n.start_position();
        Position {
            row: p.row,
            column: p.column,
        }
    }
}

impl From<Node<'_>> for Position {
    fn from(n: Node<'_>) -> Self {
        Position::from(&n)
    }
}

/// Errors during parsing, rewriting, extraction, evaluation or enumeration.
#[derive(Debug, Error)]
pub enum Error {
    /// The input cannot be parsed into an AST, or the rewritten source
    /// failed to re-parse cleanly.
    #[error("parse error at {at}")]
    Parse {
        /// Location of the offending `ERROR` node.
        at: Position,
    },

    /// The module header (`---- MODULE Name ----`) is malformed or missing.
    #[error("invalid module header")]
    ModuleHeader,

    /// More than one `Init` or `Next` operator definition was found.
    #[error("multiple definitions of `{name}`, first at {first}, again at {second}")]
    DuplicateDefinition {
        /// The duplicated operator name.
        name: &'static str,
        /// Position of the first definition.
        first: Position,
        /// Position of the conflicting definition.
        second: Position,
    },

    /// `Init` or `Next` was required but not defined in the module.
    #[error("module has no `{name}` definition")]
    MissingDefinition {
        /// The missing operator name, `Init` or `Next`.
        name: &'static str,
    },

    /// An identifier could not be resolved against state variables,
    /// quantifier bindings, definitions or constants.
    #[error("unbound identifier `{name}` at {at}")]
    UnboundIdentifier {
        /// The unresolved name.
        name: String,
        /// Location of the reference.
        at: Position,
    },

    /// An operator was referenced with the wrong number of arguments.
    #[error("operator `{name}` expects {expected} argument(s), got {got} at {at}")]
    ArityMismatch {
        /// The operator name.
        name: String,
        /// Expected parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
        /// Location of the call.
        at: Position,
    },

    /// An operation was applied to a value of the wrong variant.
    #[error("expected a {expected} value, got {got} at {at}")]
    TypeMismatch {
        /// Expected variant name(s), for diagnostics.
        expected: &'static str,
        /// The offending value's actual variant name.
        got: &'static str,
        /// Location of the failing expression.
        at: Position,
    },

    /// A function, tuple or record was applied outside its domain.
    #[error("{arg} is not in the domain at {at}")]
    DomainError {
        /// A rendering of the offending argument.
        arg: String,
        /// Location of the application.
        at: Position,
    },

    /// `CHOOSE v \in S : P` had no witness in `S`.
    #[error("CHOOSE found no witness satisfying the predicate at {at}")]
    NoWitness {
        /// Location of the `CHOOSE` expression.
        at: Position,
    },

    /// A `CASE` expression had no matching arm and no `OTHER`.
    #[error("CASE has no matching arm and no OTHER at {at}")]
    NonexhaustiveCase {
        /// Location of the `CASE` expression.
        at: Position,
    },

    /// A `[Next]_vars`-style step-or-stutter sequence was malformed.
    #[error("invalid step-or-stutter sequence at {at}")]
    StepOrStutter {
        /// Location of the malformed sequence.
        at: Position,
    },

    /// An internal invariant was violated; this should be unreachable.
    #[error("internal assertion failed: {message}")]
    AssertionFailure {
        /// What invariant was broken.
        message: &'static str,
    },

    /// A syntax node kind outside the supported TLA+ subset was reached
    /// during evaluation, e.g. a temporal operator or `INSTANCE`.
    #[error("`{kind}` is not supported by this interpreter at {at}")]
    UnsupportedConstruct {
        /// The tree-sitter node kind that could not be evaluated.
        kind: String,
        /// Location of the unsupported construct.
        at: Position,
    },

    /// A `--const NAME=EXPR` value failed to parse or evaluate.
    #[error("constant `{name}` failed to evaluate: {source}")]
    ConstantExpr {
        /// The constant's declared name.
        name: String,
        /// The underlying evaluation error.
        #[source]
        source: Box<Error>,
    },

    /// An ITF JSON input (a `next`'s `--state`) was malformed.
    #[error("invalid ITF value: {message}")]
    ItfDecode {
        /// What was wrong with the input.
        message: String,
    },
}
