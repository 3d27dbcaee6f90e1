//! Grammar-shaped parse tree and its depth-first walk.
//!
//! Rule nodes keep their matched sub-rules and terminal tokens in source
//! order. Newlines are structural only and never appear in the tree.

use std::fmt::Display;

use crate::lexer::tokens::{Token, TokenKind};

/// Which construct a step list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    ProcedureBody,
    CommandBody,
    EventBody,
    IfBody,
    ElseIfBody,
    ElseBody,
    WhileBody,
    ForBody,
    OnErrorBody,
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Program,
    MetadataEntry,
    ProcedureDefinition,
    Signature,
    NeedsClause,
    OptionalClause,
    ReturnsClause,
    ParamList,
    CommandBlock,
    EventHandler,
    Block(BlockKind),

    SetStmt,
    CallStmt,
    ReturnStmt,
    EmitStmt,
    MustStmt,
    FailStmt,
    ClearErrorStmt,
    AskStmt,
    PromptUserStmt,
    BreakStmt,
    ContinueStmt,
    IfStmt,
    ElseIfClause,
    ElseClause,
    WhileStmt,
    ForStmt,
    OnErrorStmt,
    ExpressionStmt,
    LvalueList,
    Lvalue,

    LogicalOrExpr,
    LogicalAndExpr,
    BitwiseOrExpr,
    BitwiseXorExpr,
    BitwiseAndExpr,
    EqualityExpr,
    RelationalExpr,
    AdditiveExpr,
    MultiplicativeExpr,
    UnaryExpr,
    PowerExpr,
    AccessorExpr,
    Primary,
    Literal,
    Placeholder,
    CallableExpr,
    CallTarget,
    ListLiteral,
    MapLiteral,
    MapEntry,
    EvalExpr,
}

impl Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseTree {
    Rule(RuleNode),
    Terminal(Token),
}

impl ParseTree {
    pub fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            ParseTree::Rule(node) => Some(node),
            ParseTree::Terminal(_) => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&Token> {
        match self {
            ParseTree::Terminal(token) => Some(token),
            ParseTree::Rule(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleNode {
    pub rule: Rule,
    pub children: Vec<ParseTree>,
}

impl RuleNode {
    pub fn new(rule: Rule) -> Self {
        RuleNode {
            rule,
            children: vec![],
        }
    }

    pub fn push_rule(&mut self, node: RuleNode) {
        self.children.push(ParseTree::Rule(node));
    }

    pub fn push_terminal(&mut self, token: Token) {
        self.children.push(ParseTree::Terminal(token));
    }

    /// First token anywhere under this node.
    pub fn start_token(&self) -> Option<&Token> {
        self.children.iter().find_map(|child| match child {
            ParseTree::Terminal(token) => Some(token),
            ParseTree::Rule(node) => node.start_token(),
        })
    }

    /// Last token anywhere under this node.
    pub fn stop_token(&self) -> Option<&Token> {
        self.children.iter().rev().find_map(|child| match child {
            ParseTree::Terminal(token) => Some(token),
            ParseTree::Rule(node) => node.stop_token(),
        })
    }

    /// Direct terminal children.
    pub fn terminals(&self) -> Vec<&Token> {
        self.children.iter().filter_map(ParseTree::as_terminal).collect()
    }

    pub fn terminal(&self, kind: TokenKind) -> Option<&Token> {
        self.terminals().into_iter().find(|token| token.kind == kind)
    }

    pub fn has_terminal(&self, kind: TokenKind) -> bool {
        self.terminal(kind).is_some()
    }

    /// Direct rule children.
    pub fn rule_children(&self) -> Vec<&RuleNode> {
        self.children.iter().filter_map(ParseTree::as_rule).collect()
    }

    pub fn child_rule(&self, rule: Rule) -> Option<&RuleNode> {
        self.rule_children().into_iter().find(|node| node.rule == rule)
    }

    pub fn child_rules(&self, rule: Rule) -> Vec<&RuleNode> {
        self.rule_children()
            .into_iter()
            .filter(|node| node.rule == rule)
            .collect()
    }

    pub fn count_rules(&self, rule: Rule) -> usize {
        self.child_rules(rule).len()
    }
}

/// Callbacks fired by [`walk`]. Every method defaults to doing nothing.
pub trait ParseTreeListener {
    fn enter_rule(&mut self, _node: &RuleNode) {}
    fn exit_rule(&mut self, _node: &RuleNode) {}
    fn visit_terminal(&mut self, _token: &Token) {}
}

/// Depth-first traversal: `enter_rule` before a node's children,
/// `exit_rule` after them.
pub fn walk<L: ParseTreeListener + ?Sized>(listener: &mut L, tree: &ParseTree) {
    match tree {
        ParseTree::Terminal(token) => listener.visit_terminal(token),
        ParseTree::Rule(node) => {
            listener.enter_rule(node);
            for child in &node.children {
                walk(listener, child);
            }
            listener.exit_rule(node);
        }
    }
}
