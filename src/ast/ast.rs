use std::collections::BTreeMap;

use crate::{Position, Span};

use super::{expressions::Expression, statements::Step};

/// Node kind discriminant. The numeric values are stable and double as the
/// type ids of the binary encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Kind {
    #[default]
    Untagged = 0x00,

    Program = 0x01,
    Procedure = 0x02,
    Command = 0x03,
    OnEvent = 0x04,
    Comment = 0x05,
    LValue = 0x06,
    Accessor = 0x07,
    MapEntry = 0x08,

    // Steps
    Set = 0x20,
    Call = 0x21,
    Return = 0x22,
    Emit = 0x23,
    Must = 0x24,
    Fail = 0x25,
    Ask = 0x26,
    PromptUser = 0x27,
    ClearError = 0x28,
    Continue = 0x29,
    Break = 0x2a,
    If = 0x2b,
    For = 0x2c,
    While = 0x2d,
    OnError = 0x2e,
    ExpressionStatement = 0x2f,

    // Expressions
    Variable = 0x40,
    NumberLiteral = 0x41,
    StringLiteral = 0x42,
    BooleanLiteral = 0x43,
    NilLiteral = 0x44,
    ListLiteral = 0x45,
    MapLiteral = 0x46,
    UnaryOp = 0x47,
    BinaryOp = 0x48,
    ElementAccess = 0x49,
    Callable = 0x4a,
    TypeOf = 0x4b,
    Eval = 0x4c,
    Placeholder = 0x4d,
    LastResult = 0x4e,
    ErrorMarker = 0x4f,
}

impl Kind {
    pub const ALL: [Kind; 40] = [
        Kind::Program,
        Kind::Procedure,
        Kind::Command,
        Kind::OnEvent,
        Kind::Comment,
        Kind::LValue,
        Kind::Accessor,
        Kind::MapEntry,
        Kind::Set,
        Kind::Call,
        Kind::Return,
        Kind::Emit,
        Kind::Must,
        Kind::Fail,
        Kind::Ask,
        Kind::PromptUser,
        Kind::ClearError,
        Kind::Continue,
        Kind::Break,
        Kind::If,
        Kind::For,
        Kind::While,
        Kind::OnError,
        Kind::ExpressionStatement,
        Kind::Variable,
        Kind::NumberLiteral,
        Kind::StringLiteral,
        Kind::BooleanLiteral,
        Kind::NilLiteral,
        Kind::ListLiteral,
        Kind::MapLiteral,
        Kind::UnaryOp,
        Kind::BinaryOp,
        Kind::ElementAccess,
        Kind::Callable,
        Kind::TypeOf,
        Kind::Eval,
        Kind::Placeholder,
        Kind::LastResult,
        Kind::ErrorMarker,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|kind| kind.id() == id)
    }

    pub fn is_step(self) -> bool {
        (0x20..0x40).contains(&self.id())
    }

    pub fn is_expression(self) -> bool {
        self.id() >= 0x40
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Bookkeeping shared by every node.
///
/// Two nodes compare equal regardless of where they came from, so `==` on
/// the tree is purely semantic.
#[derive(Debug, Clone, Default)]
pub struct BaseNode {
    pub start: Position,
    pub end: Position,
    pub kind: Kind,
}

impl PartialEq for BaseNode {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl BaseNode {
    pub fn new(kind: Kind, start: Position, end: Position) -> Self {
        BaseNode { start, end, kind }
    }

    pub fn span(&self) -> Span {
        Span {
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

/// Access to the bookkeeping record of a node.
pub trait Node {
    fn base(&self) -> &BaseNode;
    fn base_mut(&mut self) -> &mut BaseNode;

    fn kind(&self) -> Kind {
        self.base().kind
    }
}

macro_rules! impl_node {
    ($($node:ty),* $(,)?) => {
        $(
            impl $crate::ast::ast::Node for $node {
                fn base(&self) -> &$crate::ast::ast::BaseNode {
                    &self.base
                }
                fn base_mut(&mut self) -> &mut $crate::ast::ast::BaseNode {
                    &mut self.base
                }
            }
        )*
    };
}

pub(crate) use impl_node;

pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comment {
    pub base: BaseNode,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub base: BaseNode,
    pub procedures: BTreeMap<String, Procedure>,
    pub commands: Vec<CommandNode>,
    pub events: Vec<OnEventDecl>,
    pub metadata: Metadata,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Procedure {
    pub base: BaseNode,
    pub name: String,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
    pub return_params: Vec<String>,
    pub metadata: Metadata,
    pub steps: Vec<Step>,
    pub error_handlers: Vec<Step>,
    pub comments: Vec<Comment>,
}

/// Anonymous top-level block, run on its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandNode {
    pub base: BaseNode,
    pub metadata: Metadata,
    pub steps: Vec<Step>,
    pub error_handlers: Vec<Step>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnEventDecl {
    pub base: BaseNode,
    pub event: Expression,
    pub handler_name: Option<String>,
    pub bound_var: Option<String>,
    pub steps: Vec<Step>,
    pub error_handlers: Vec<Step>,
    pub comments: Vec<Comment>,
}

impl_node!(Comment, Program, Procedure, CommandNode, OnEventDecl);

fn count_step_comments(steps: &[Step]) -> usize {
    steps.iter().map(Step::comment_count).sum()
}

impl Program {
    /// Number of comments attached anywhere in the tree.
    pub fn comment_count(&self) -> usize {
        let procedures: usize = self
            .procedures
            .values()
            .map(|p| {
                p.comments.len()
                    + count_step_comments(&p.steps)
                    + count_step_comments(&p.error_handlers)
            })
            .sum();
        let commands: usize = self
            .commands
            .iter()
            .map(|c| {
                c.comments.len()
                    + count_step_comments(&c.steps)
                    + count_step_comments(&c.error_handlers)
            })
            .sum();
        let events: usize = self
            .events
            .iter()
            .map(|e| {
                e.comments.len()
                    + count_step_comments(&e.steps)
                    + count_step_comments(&e.error_handlers)
            })
            .sum();

        self.comments.len() + procedures + commands + events
    }

    /// Procedures in source order rather than name order.
    pub fn procedures_in_source_order(&self) -> Vec<&Procedure> {
        let mut procedures: Vec<&Procedure> = self.procedures.values().collect();
        procedures.sort_by_key(|p| p.base.start.offset);
        procedures
    }
}
