//! Diagnostic error types for query construction.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building a query. These are caller bugs: they are
/// reported locally and nothing is ever sent to the remote side.
#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("unknown search operator: \"{name}\"")]
    #[diagnostic(
        code(chunky::query::unknown_operator),
        help(
            "Valid operators are: betweenIncl, betweenExcl, contains, endsWithField, \
             endsWithTerm, equalsField, equalsTerm, greater, greaterEquals, isNotNull, \
             isNull, isNotBlank, isBlank, less, lessEquals, notEqualsField, notEqualsTerm, \
             startsWithField, startsWithTerm."
        )
    )]
    UnknownOperator { name: String },

    #[error("invalid conjunction kind: \"{name}\"")]
    #[diagnostic(
        code(chunky::query::invalid_conjunction),
        help("A conjunction is one of `and`, `or` or `not`.")
    )]
    InvalidConjunctionKind { name: String },

    #[error("operator {operator} on field \"{field}\" requires an operand")]
    #[diagnostic(
        code(chunky::query::missing_operand),
        help("Only isNull, isNotNull, isBlank and isNotBlank may be used without an operand.")
    )]
    MissingOperand { operator: String, field: String },

    #[error("the top level of the {target} query already holds an expression")]
    #[diagnostic(
        code(chunky::query::root_occupied),
        help(
            "Without a conjunction the top level takes a single criterion. \
             Open an `and` or `or` scope first and add the criteria to it."
        )
    )]
    RootOccupied { target: String },

    #[error("scope handle does not belong to this {target} query")]
    #[diagnostic(
        code(chunky::query::unknown_scope),
        help("Use the handles returned by `open_conjunction` on the same query.")
    )]
    UnknownScope { target: String },
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
