use super::{
    ast::{impl_node, BaseNode, Comment, Kind},
    expressions::{CallableExpr, Expression},
};

/// Statement Types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    Set,
    Call,
    Return,
    Emit,
    Must,
    Fail,
    Ask,
    PromptUser,
    ClearError,
    Continue,
    Break,
    If,
    For,
    While,
    OnError,
    ExpressionStatement,
}

impl StepType {
    pub fn as_str(self) -> &'static str {
        match self {
            StepType::Set => "set",
            StepType::Call => "call",
            StepType::Return => "return",
            StepType::Emit => "emit",
            StepType::Must => "must",
            StepType::Fail => "fail",
            StepType::Ask => "ask",
            StepType::PromptUser => "promptuser",
            StepType::ClearError => "clear_error",
            StepType::Continue => "continue",
            StepType::Break => "break",
            StepType::If => "if",
            StepType::For => "for",
            StepType::While => "while",
            StepType::OnError => "on_error",
            StepType::ExpressionStatement => "expression_statement",
        }
    }

    pub fn kind(self) -> Kind {
        match self {
            StepType::Set => Kind::Set,
            StepType::Call => Kind::Call,
            StepType::Return => Kind::Return,
            StepType::Emit => Kind::Emit,
            StepType::Must => Kind::Must,
            StepType::Fail => Kind::Fail,
            StepType::Ask => Kind::Ask,
            StepType::PromptUser => Kind::PromptUser,
            StepType::ClearError => Kind::ClearError,
            StepType::Continue => Kind::Continue,
            StepType::Break => Kind::Break,
            StepType::If => Kind::If,
            StepType::For => Kind::For,
            StepType::While => Kind::While,
            StepType::OnError => Kind::OnError,
            StepType::ExpressionStatement => Kind::ExpressionStatement,
        }
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One link of an assignment target chain.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorKind {
    /// `.name`
    Field(String),
    /// `[expr]`
    Index(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessorNode {
    pub base: BaseNode,
    pub kind: AccessorKind,
}

/// Assignment target: `a.b[0]["c"]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LValueNode {
    pub base: BaseNode,
    pub identifier: String,
    pub accessors: Vec<AccessorNode>,
}

impl std::fmt::Display for LValueNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier)?;
        for accessor in &self.accessors {
            match &accessor.kind {
                AccessorKind::Field(name) => write!(f, ".{}", name)?,
                AccessorKind::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskStmt {
    pub model: Expression,
    pub prompt: Expression,
    pub options: Option<Expression>,
    pub target: Option<LValueNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Set {
        targets: Vec<LValueNode>,
        value: Expression,
    },
    Call {
        call: CallableExpr,
    },
    Return {
        values: Vec<Expression>,
    },
    Emit {
        value: Expression,
    },
    Must {
        value: Expression,
    },
    Fail {
        message: Option<Expression>,
    },
    Ask(AskStmt),
    PromptUser {
        prompt: Expression,
        target: LValueNode,
    },
    ClearError,
    Continue,
    Break,
    If {
        condition: Expression,
        body: Vec<Step>,
        /// An `else if` is a single nested `if` step in here.
        else_body: Option<Vec<Step>>,
    },
    For {
        variable: String,
        collection: Expression,
        body: Vec<Step>,
    },
    While {
        condition: Expression,
        body: Vec<Step>,
    },
    OnError {
        body: Vec<Step>,
    },
    Expression {
        expression: Expression,
    },
}

/// Universal statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub base: BaseNode,
    pub kind: StepKind,
    pub comments: Vec<Comment>,
}

impl_node!(AccessorNode, LValueNode, Step);

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Step {
            base: BaseNode::default(),
            kind,
            comments: vec![],
        }
    }

    pub fn step_type(&self) -> StepType {
        match &self.kind {
            StepKind::Set { .. } => StepType::Set,
            StepKind::Call { .. } => StepType::Call,
            StepKind::Return { .. } => StepType::Return,
            StepKind::Emit { .. } => StepType::Emit,
            StepKind::Must { .. } => StepType::Must,
            StepKind::Fail { .. } => StepType::Fail,
            StepKind::Ask(_) => StepType::Ask,
            StepKind::PromptUser { .. } => StepType::PromptUser,
            StepKind::ClearError => StepType::ClearError,
            StepKind::Continue => StepType::Continue,
            StepKind::Break => StepType::Break,
            StepKind::If { .. } => StepType::If,
            StepKind::For { .. } => StepType::For,
            StepKind::While { .. } => StepType::While,
            StepKind::OnError { .. } => StepType::OnError,
            StepKind::Expression { .. } => StepType::ExpressionStatement,
        }
    }

    pub fn is_on_error(&self) -> bool {
        matches!(self.kind, StepKind::OnError { .. })
    }

    /// Nested step lists in field order (body before else-body).
    pub fn blocks(&self) -> Vec<&Vec<Step>> {
        match &self.kind {
            StepKind::If {
                body, else_body, ..
            } => {
                let mut blocks = vec![body];
                if let Some(else_body) = else_body {
                    blocks.push(else_body);
                }
                blocks
            }
            StepKind::For { body, .. }
            | StepKind::While { body, .. }
            | StepKind::OnError { body } => vec![body],
            _ => vec![],
        }
    }

    pub fn blocks_mut(&mut self) -> Vec<&mut Vec<Step>> {
        match &mut self.kind {
            StepKind::If {
                body, else_body, ..
            } => {
                let mut blocks = vec![body];
                if let Some(else_body) = else_body {
                    blocks.push(else_body);
                }
                blocks
            }
            StepKind::For { body, .. }
            | StepKind::While { body, .. }
            | StepKind::OnError { body } => vec![body],
            _ => vec![],
        }
    }

    /// Comments on this step and everything nested under it.
    pub fn comment_count(&self) -> usize {
        self.comments.len()
            + self
                .blocks()
                .into_iter()
                .flat_map(|block| block.iter())
                .map(Step::comment_count)
                .sum::<usize>()
    }
}

/// Moves top-level `on error` steps out of `steps`, keeping source order in
/// both lists.
pub fn partition_error_handlers(steps: Vec<Step>) -> (Vec<Step>, Vec<Step>) {
    steps.into_iter().partition(|step| !step.is_on_error())
}
