use std::fmt::Display;

use super::ast::{impl_node, BaseNode, Kind, Node};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{}", value),
            Number::Float(value) => write!(f, "{:?}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableExpr {
    pub base: BaseNode,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberExpr {
    pub base: BaseNode,
    pub value: Number,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringExpr {
    pub base: BaseNode,
    pub value: String,
    pub is_raw: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BooleanExpr {
    pub base: BaseNode,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NilExpr {
    pub base: BaseNode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListExpr {
    pub base: BaseNode,
    pub elements: Vec<Expression>,
}

/// One `"key": value` pair of a map literal.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntryNode {
    pub base: BaseNode,
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapExpr {
    pub base: BaseNode,
    pub entries: Vec<MapEntryNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub base: BaseNode,
    pub operator: String,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub base: BaseNode,
    pub left: Box<Expression>,
    pub operator: String,
    pub right: Box<Expression>,
}

/// `collection[accessor]`; a `.field` access stores the field as a string
/// literal accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementAccessExpr {
    pub base: BaseNode,
    pub collection: Box<Expression>,
    pub accessor: Box<Expression>,
}

/// Who a call goes to. Tool calls are capability gated and keep their dotted
/// path (without the `tool.` prefix) in `name`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallTarget {
    pub is_tool: bool,
    pub name: String,
}

impl Display for CallTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_tool {
            write!(f, "tool.{}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallableExpr {
    pub base: BaseNode,
    pub target: CallTarget,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeOfExpr {
    pub base: BaseNode,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalExpr {
    pub base: BaseNode,
    pub source: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaceholderExpr {
    pub base: BaseNode,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LastResultExpr {
    pub base: BaseNode,
}

/// Stands in for an operand the builder could not produce.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorMarkerExpr {
    pub base: BaseNode,
    pub message: String,
}

impl_node!(
    VariableExpr,
    NumberExpr,
    StringExpr,
    BooleanExpr,
    NilExpr,
    ListExpr,
    MapEntryNode,
    MapExpr,
    UnaryExpr,
    BinaryExpr,
    ElementAccessExpr,
    CallableExpr,
    TypeOfExpr,
    EvalExpr,
    PlaceholderExpr,
    LastResultExpr,
    ErrorMarkerExpr,
);

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Variable(VariableExpr),
    NumberLiteral(NumberExpr),
    StringLiteral(StringExpr),
    BooleanLiteral(BooleanExpr),
    NilLiteral(NilExpr),
    ListLiteral(ListExpr),
    MapLiteral(MapExpr),
    UnaryOp(UnaryExpr),
    BinaryOp(BinaryExpr),
    ElementAccess(ElementAccessExpr),
    Callable(CallableExpr),
    TypeOf(TypeOfExpr),
    Eval(EvalExpr),
    Placeholder(PlaceholderExpr),
    LastResult(LastResultExpr),
    ErrorMarker(ErrorMarkerExpr),
}

impl Expression {
    /// The kind every node of this variant must be tagged with.
    pub fn expected_kind(&self) -> Kind {
        match self {
            Expression::Variable(_) => Kind::Variable,
            Expression::NumberLiteral(_) => Kind::NumberLiteral,
            Expression::StringLiteral(_) => Kind::StringLiteral,
            Expression::BooleanLiteral(_) => Kind::BooleanLiteral,
            Expression::NilLiteral(_) => Kind::NilLiteral,
            Expression::ListLiteral(_) => Kind::ListLiteral,
            Expression::MapLiteral(_) => Kind::MapLiteral,
            Expression::UnaryOp(_) => Kind::UnaryOp,
            Expression::BinaryOp(_) => Kind::BinaryOp,
            Expression::ElementAccess(_) => Kind::ElementAccess,
            Expression::Callable(_) => Kind::Callable,
            Expression::TypeOf(_) => Kind::TypeOf,
            Expression::Eval(_) => Kind::Eval,
            Expression::Placeholder(_) => Kind::Placeholder,
            Expression::LastResult(_) => Kind::LastResult,
            Expression::ErrorMarker(_) => Kind::ErrorMarker,
        }
    }

    pub fn is_error_marker(&self) -> bool {
        matches!(self, Expression::ErrorMarker(_))
    }

    /// Direct sub-expressions, in field order.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::ListLiteral(list) => list.elements.iter().collect(),
            Expression::MapLiteral(map) => map.entries.iter().map(|e| &e.value).collect(),
            Expression::UnaryOp(unary) => vec![&*unary.operand],
            Expression::BinaryOp(binary) => vec![&*binary.left, &*binary.right],
            Expression::ElementAccess(access) => vec![&*access.collection, &*access.accessor],
            Expression::Callable(call) => call.arguments.iter().collect(),
            Expression::TypeOf(type_of) => vec![&*type_of.operand],
            Expression::Eval(eval) => vec![&*eval.source],
            Expression::Variable(_)
            | Expression::NumberLiteral(_)
            | Expression::StringLiteral(_)
            | Expression::BooleanLiteral(_)
            | Expression::NilLiteral(_)
            | Expression::Placeholder(_)
            | Expression::LastResult(_)
            | Expression::ErrorMarker(_) => vec![],
        }
    }
}

impl Node for Expression {
    fn base(&self) -> &BaseNode {
        match self {
            Expression::Variable(e) => &e.base,
            Expression::NumberLiteral(e) => &e.base,
            Expression::StringLiteral(e) => &e.base,
            Expression::BooleanLiteral(e) => &e.base,
            Expression::NilLiteral(e) => &e.base,
            Expression::ListLiteral(e) => &e.base,
            Expression::MapLiteral(e) => &e.base,
            Expression::UnaryOp(e) => &e.base,
            Expression::BinaryOp(e) => &e.base,
            Expression::ElementAccess(e) => &e.base,
            Expression::Callable(e) => &e.base,
            Expression::TypeOf(e) => &e.base,
            Expression::Eval(e) => &e.base,
            Expression::Placeholder(e) => &e.base,
            Expression::LastResult(e) => &e.base,
            Expression::ErrorMarker(e) => &e.base,
        }
    }

    fn base_mut(&mut self) -> &mut BaseNode {
        match self {
            Expression::Variable(e) => &mut e.base,
            Expression::NumberLiteral(e) => &mut e.base,
            Expression::StringLiteral(e) => &mut e.base,
            Expression::BooleanLiteral(e) => &mut e.base,
            Expression::NilLiteral(e) => &mut e.base,
            Expression::ListLiteral(e) => &mut e.base,
            Expression::MapLiteral(e) => &mut e.base,
            Expression::UnaryOp(e) => &mut e.base,
            Expression::BinaryOp(e) => &mut e.base,
            Expression::ElementAccess(e) => &mut e.base,
            Expression::Callable(e) => &mut e.base,
            Expression::TypeOf(e) => &mut e.base,
            Expression::Eval(e) => &mut e.base,
            Expression::Placeholder(e) => &mut e.base,
            Expression::LastResult(e) => &mut e.base,
            Expression::ErrorMarker(e) => &mut e.base,
        }
    }
}

fn join(items: &[Expression]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

// Fully parenthesised so nesting is visible at a glance.
impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Variable(e) => write!(f, "{}", e.name),
            Expression::NumberLiteral(e) => write!(f, "{}", e.value),
            Expression::StringLiteral(e) => write!(f, "{:?}", e.value),
            Expression::BooleanLiteral(e) => write!(f, "{}", e.value),
            Expression::NilLiteral(_) => write!(f, "nil"),
            Expression::ListLiteral(e) => write!(f, "[{}]", join(&e.elements)),
            Expression::MapLiteral(e) => {
                let entries = e
                    .entries
                    .iter()
                    .map(|entry| format!("{:?}: {}", entry.key, entry.value))
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, "{{{}}}", entries)
            }
            Expression::UnaryOp(e) => write!(f, "({} {})", e.operator, e.operand),
            Expression::BinaryOp(e) => write!(f, "({} {} {})", e.left, e.operator, e.right),
            Expression::ElementAccess(e) => write!(f, "{}[{}]", e.collection, e.accessor),
            Expression::Callable(e) => write!(f, "{}({})", e.target, join(&e.arguments)),
            Expression::TypeOf(e) => write!(f, "(typeof {})", e.operand),
            Expression::Eval(e) => write!(f, "eval({})", e.source),
            Expression::Placeholder(e) => write!(f, "{{{{{}}}}}", e.name),
            Expression::LastResult(_) => write!(f, "last"),
            Expression::ErrorMarker(_) => write!(f, "<error>"),
        }
    }
}
