//! The fixed operator set and conjunction kinds of the expert search.

use std::fmt;
use std::str::FromStr;

use super::error::QueryError;

/// Comparison operator of a single criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    BetweenIncl,
    BetweenExcl,
    Contains,
    EndsWithField,
    EndsWithTerm,
    EqualsField,
    EqualsTerm,
    Greater,
    GreaterEquals,
    IsNotNull,
    IsNull,
    IsNotBlank,
    IsBlank,
    Less,
    LessEquals,
    NotEqualsField,
    NotEqualsTerm,
    StartsWithField,
    StartsWithTerm,
}

impl Operator {
    pub const ALL: [Operator; 19] = [
        Operator::BetweenIncl,
        Operator::BetweenExcl,
        Operator::Contains,
        Operator::EndsWithField,
        Operator::EndsWithTerm,
        Operator::EqualsField,
        Operator::EqualsTerm,
        Operator::Greater,
        Operator::GreaterEquals,
        Operator::IsNotNull,
        Operator::IsNull,
        Operator::IsNotBlank,
        Operator::IsBlank,
        Operator::Less,
        Operator::LessEquals,
        Operator::NotEqualsField,
        Operator::NotEqualsTerm,
        Operator::StartsWithField,
        Operator::StartsWithTerm,
    ];

    /// Wire name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::BetweenIncl => "betweenIncl",
            Operator::BetweenExcl => "betweenExcl",
            Operator::Contains => "contains",
            Operator::EndsWithField => "endsWithField",
            Operator::EndsWithTerm => "endsWithTerm",
            Operator::EqualsField => "equalsField",
            Operator::EqualsTerm => "equalsTerm",
            Operator::Greater => "greater",
            Operator::GreaterEquals => "greaterEquals",
            Operator::IsNotNull => "isNotNull",
            Operator::IsNull => "isNull",
            Operator::IsNotBlank => "isNotBlank",
            Operator::IsBlank => "isBlank",
            Operator::Less => "less",
            Operator::LessEquals => "lessEquals",
            Operator::NotEqualsField => "notEqualsField",
            Operator::NotEqualsTerm => "notEqualsTerm",
            Operator::StartsWithField => "startsWithField",
            Operator::StartsWithTerm => "startsWithTerm",
        }
    }

    /// Whether the operator compares against an operand.
    ///
    /// The four null/blank tests are unary.
    pub fn takes_operand(self) -> bool {
        !matches!(
            self,
            Operator::IsNull | Operator::IsNotNull | Operator::IsBlank | Operator::IsNotBlank
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| QueryError::UnknownOperator { name: s.to_string() })
    }
}

/// Boolean grouping of sibling expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conjunction {
    And,
    Or,
    /// Negation of its children. Several children are passed to the remote
    /// as-is; their combined meaning is whatever the remote makes of them.
    Not,
}

impl Conjunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "and",
            Conjunction::Or => "or",
            Conjunction::Not => "not",
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conjunction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Conjunction::And),
            "or" => Ok(Conjunction::Or),
            "not" => Ok(Conjunction::Not),
            _ => Err(QueryError::InvalidConjunctionKind { name: s.to_string() }),
        }
    }
}
