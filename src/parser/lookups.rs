use std::collections::HashMap;

use crate::{errors::errors::Error, lexer::tokens::TokenKind};

use super::{
    expr::*,
    parser::Parser,
    stmt::*,
    tree::{Rule, RuleNode},
};

/// Binary precedence levels, loosest first. Each level is parsed as a flat
/// repetition of the next one.
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
pub enum Precedence {
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equality,
    Relational,
    Additive,
    Multiplicative,
}

impl Precedence {
    /// The next tighter level, `None` once unary operators take over.
    pub fn next(self) -> Option<Precedence> {
        match self {
            Precedence::LogicalOr => Some(Precedence::LogicalAnd),
            Precedence::LogicalAnd => Some(Precedence::BitwiseOr),
            Precedence::BitwiseOr => Some(Precedence::BitwiseXor),
            Precedence::BitwiseXor => Some(Precedence::BitwiseAnd),
            Precedence::BitwiseAnd => Some(Precedence::Equality),
            Precedence::Equality => Some(Precedence::Relational),
            Precedence::Relational => Some(Precedence::Additive),
            Precedence::Additive => Some(Precedence::Multiplicative),
            Precedence::Multiplicative => None,
        }
    }

    pub fn rule(self) -> Rule {
        match self {
            Precedence::LogicalOr => Rule::LogicalOrExpr,
            Precedence::LogicalAnd => Rule::LogicalAndExpr,
            Precedence::BitwiseOr => Rule::BitwiseOrExpr,
            Precedence::BitwiseXor => Rule::BitwiseXorExpr,
            Precedence::BitwiseAnd => Rule::BitwiseAndExpr,
            Precedence::Equality => Rule::EqualityExpr,
            Precedence::Relational => Rule::RelationalExpr,
            Precedence::Additive => Rule::AdditiveExpr,
            Precedence::Multiplicative => Rule::MultiplicativeExpr,
        }
    }

    pub fn operators(self) -> &'static [TokenKind] {
        match self {
            Precedence::LogicalOr => &[TokenKind::Or],
            Precedence::LogicalAnd => &[TokenKind::And],
            Precedence::BitwiseOr => &[TokenKind::Pipe],
            Precedence::BitwiseXor => &[TokenKind::Caret],
            Precedence::BitwiseAnd => &[TokenKind::Ampersand],
            Precedence::Equality => &[TokenKind::Equals, TokenKind::NotEquals],
            Precedence::Relational => &[
                TokenKind::Less,
                TokenKind::LessEquals,
                TokenKind::Greater,
                TokenKind::GreaterEquals,
            ],
            Precedence::Additive => &[TokenKind::Plus, TokenKind::Dash],
            Precedence::Multiplicative => &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
        }
    }
}

pub const UNARY_OPERATORS: [TokenKind; 6] = [
    TokenKind::Dash,
    TokenKind::Not,
    TokenKind::No,
    TokenKind::Some,
    TokenKind::Tilde,
    TokenKind::Typeof,
];

pub type StmtHandler = fn(&mut Parser) -> Result<RuleNode, Error>;
pub type PrimaryHandler = fn(&mut Parser, &mut RuleNode) -> Result<(), Error>;

pub fn create_token_lookups(parser: &mut Parser) {
    // Literals and symbols
    parser.nud(TokenKind::Number, parse_literal);
    parser.nud(TokenKind::String, parse_literal);
    parser.nud(TokenKind::RawString, parse_literal);
    parser.nud(TokenKind::True, parse_literal);
    parser.nud(TokenKind::False, parse_literal);
    parser.nud(TokenKind::Nil, parse_literal);
    parser.nud(TokenKind::Identifier, parse_identifier_primary);
    parser.nud(TokenKind::Tool, parse_callable_primary);
    parser.nud(TokenKind::Last, parse_last_primary);
    parser.nud(TokenKind::PlaceholderOpen, parse_placeholder);
    parser.nud(TokenKind::OpenBracket, parse_list_literal);
    parser.nud(TokenKind::OpenCurly, parse_map_literal);
    parser.nud(TokenKind::Eval, parse_eval_expr);
    parser.nud(TokenKind::OpenParen, parse_grouping_expr);

    // Statements
    parser.stmt(TokenKind::Set, parse_set_stmt);
    parser.stmt(TokenKind::Call, parse_call_stmt);
    parser.stmt(TokenKind::Return, parse_return_stmt);
    parser.stmt(TokenKind::Emit, parse_emit_stmt);
    parser.stmt(TokenKind::Must, parse_must_stmt);
    parser.stmt(TokenKind::Fail, parse_fail_stmt);
    parser.stmt(TokenKind::ClearError, parse_clear_error_stmt);
    parser.stmt(TokenKind::Ask, parse_ask_stmt);
    parser.stmt(TokenKind::PromptUser, parse_promptuser_stmt);
    parser.stmt(TokenKind::Break, parse_break_stmt);
    parser.stmt(TokenKind::Continue, parse_continue_stmt);
    parser.stmt(TokenKind::If, parse_if_stmt);
    parser.stmt(TokenKind::While, parse_while_stmt);
    parser.stmt(TokenKind::For, parse_for_stmt);
    parser.stmt(TokenKind::On, parse_on_error_stmt);
}

// Lookup tables inside parser struct, so it's easier
pub type StmtLookup = HashMap<TokenKind, StmtHandler>;
pub type PrimaryLookup = HashMap<TokenKind, PrimaryHandler>;
