//! Parser implementation producing the grammar-shaped parse tree.
//!
//! This module contains the main Parser struct and the top-level
//! declaration rules (procedures, commands, event handlers and metadata
//! entries). Statements live in `stmt`, expressions in `expr`.
//!
//! It maintains lookup tables for:
//! - Statement handlers, keyed by the leading keyword
//! - Primary expression handlers, keyed by the first token

use std::collections::HashMap;

use crate::{
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Channel, Token, TokenKind},
    Span,
};

use super::{
    expr::parse_expr,
    lookups::{create_token_lookups, PrimaryHandler, PrimaryLookup, StmtHandler, StmtLookup},
    stmt::parse_block,
    tree::{BlockKind, ParseTree, Rule, RuleNode},
};

/// The main parser structure that maintains parsing state.
pub struct Parser {
    /// Default-channel tokens, always terminated by `EOF`
    tokens: Vec<Token>,
    /// Current position in the token stream
    pos: usize,
    /// Lookup table for statement parsing handlers
    stmt_lookup: StmtLookup,
    /// Lookup table for primary expression handlers
    nud_lookup: PrimaryLookup,
    /// Set while the body of a `command` block is parsed
    in_command: bool,
}

impl Parser {
    /// Creates a new Parser over `tokens`, dropping hidden-channel tokens.
    pub fn new(tokens: &[Token]) -> Self {
        let mut visible: Vec<Token> = tokens.iter().filter(|t| !t.is_hidden()).cloned().collect();

        if visible.last().map(|t| t.kind) != Some(TokenKind::EOF) {
            let end = visible
                .last()
                .map(|t| t.span.end.clone())
                .unwrap_or_default();
            visible.push(Token {
                kind: TokenKind::EOF,
                value: String::from("EOF"),
                span: Span {
                    start: end.clone(),
                    end,
                },
                channel: Channel::Default,
            });
        }

        Parser {
            tokens: visible,
            pos: 0,
            stmt_lookup: HashMap::new(),
            nud_lookup: HashMap::new(),
            in_command: false,
        }
    }

    /// Returns the current token without advancing.
    pub fn current_token(&self) -> &Token {
        // The stream always ends in EOF and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Returns the kind of the current token.
    pub fn current_token_kind(&self) -> TokenKind {
        self.current_token().kind
    }

    /// Returns the kind of the token after the current one.
    pub fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EOF)
    }

    /// Advances to the next token and returns the previous token.
    pub fn advance(&mut self) -> Token {
        let token = self.current_token().clone();
        if token.kind != TokenKind::EOF {
            self.pos += 1;
        }
        token
    }

    pub fn unexpected(&self) -> Error {
        let token = self.current_token();
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: token.value.clone(),
            },
            token.span.start.clone(),
        )
    }

    pub fn unexpected_detailed(&self, message: &str) -> Error {
        let token = self.current_token();
        Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: token.value.clone(),
                message: message.to_string(),
            },
            token.span.start.clone(),
        )
    }

    /// Expects a token of the specified kind, with optional custom error.
    pub fn expect_error(
        &mut self,
        expected_kind: TokenKind,
        error: Option<Error>,
    ) -> Result<Token, Error> {
        if self.current_token_kind() != expected_kind {
            return Err(error.unwrap_or_else(|| self.unexpected()));
        }

        Ok(self.advance())
    }

    /// Expects a token of the specified kind with default error message.
    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        self.expect_error(expected_kind, None)
    }

    /// Expects `kind` and records it as a terminal of `node`.
    pub fn expect_into(&mut self, node: &mut RuleNode, kind: TokenKind) -> Result<(), Error> {
        let token = self.expect(kind)?;
        node.push_terminal(token);
        Ok(())
    }

    /// Expects an identifier spelled `word`; used for the contextual
    /// keywords `error` and `event`.
    pub fn expect_word(&mut self, node: &mut RuleNode, word: &str) -> Result<(), Error> {
        let token = self.current_token();
        if token.kind != TokenKind::Identifier || token.value != word {
            return Err(self.unexpected_detailed(&format!("expected `{}`", word)));
        }

        let token = self.advance();
        node.push_terminal(token);
        Ok(())
    }

    /// Consumes the newline that ends a line; the end of input also counts.
    pub fn expect_line_end(&mut self) -> Result<(), Error> {
        match self.current_token_kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::EOF => Ok(()),
            _ => Err(self.unexpected_detailed("expected end of line")),
        }
    }

    pub fn skip_newlines(&mut self) {
        while self.current_token_kind() == TokenKind::Newline {
            self.advance();
        }
    }

    /// Checks if there are more tokens to parse.
    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EOF
    }

    pub fn in_command(&self) -> bool {
        self.in_command
    }

    /// Returns a reference to the statement lookup table.
    pub fn get_stmt_lookup(&self) -> &StmtLookup {
        &self.stmt_lookup
    }

    /// Returns a reference to the primary expression lookup table.
    pub fn get_nud_lookup(&self) -> &PrimaryLookup {
        &self.nud_lookup
    }

    /// Registers a primary expression handler for a token.
    pub fn nud(&mut self, kind: TokenKind, nud_fn: PrimaryHandler) {
        self.nud_lookup.insert(kind, nud_fn);
    }

    /// Registers a statement handler for a token.
    pub fn stmt(&mut self, kind: TokenKind, stmt_fn: StmtHandler) {
        self.stmt_lookup.insert(kind, stmt_fn);
    }
}

pub fn parse_metadata_entry(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::MetadataEntry);
    parser.expect_into(&mut node, TokenKind::MetadataLine)?;
    parser.expect_line_end()?;
    Ok(node)
}

/// Metadata lines directly after a declaration header.
fn parse_header_metadata(parser: &mut Parser, node: &mut RuleNode) -> Result<(), Error> {
    parser.skip_newlines();
    while parser.current_token_kind() == TokenKind::MetadataLine {
        node.push_rule(parse_metadata_entry(parser)?);
        parser.skip_newlines();
    }
    Ok(())
}

fn parse_param_list(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::ParamList);
    parser.expect_into(&mut node, TokenKind::Identifier)?;

    while parser.current_token_kind() == TokenKind::Comma {
        node.push_terminal(parser.advance());
        parser.expect_into(&mut node, TokenKind::Identifier)?;
    }

    Ok(node)
}

fn parse_signature(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::Signature);

    let parenthesised = parser.current_token_kind() == TokenKind::OpenParen;
    if parenthesised {
        node.push_terminal(parser.advance());
    }

    loop {
        let rule = match parser.current_token_kind() {
            TokenKind::Needs => Rule::NeedsClause,
            TokenKind::Optional => Rule::OptionalClause,
            TokenKind::Returns => Rule::ReturnsClause,
            _ => break,
        };

        let mut clause = RuleNode::new(rule);
        clause.push_terminal(parser.advance());
        clause.push_rule(parse_param_list(parser)?);
        node.push_rule(clause);
    }

    if parenthesised {
        parser.expect_into(&mut node, TokenKind::CloseParen)?;
    }

    Ok(node)
}

/// `func name signature means ... endfunc`
fn parse_procedure(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::ProcedureDefinition);
    node.push_terminal(parser.advance());

    let error = parser.unexpected_detailed("expected procedure name after `func`");
    let name = parser.expect_error(TokenKind::Identifier, Some(error))?;
    node.push_terminal(name);

    node.push_rule(parse_signature(parser)?);
    parser.expect_into(&mut node, TokenKind::Means)?;
    parser.expect_line_end()?;

    parse_header_metadata(parser, &mut node)?;
    node.push_rule(parse_block(
        parser,
        BlockKind::ProcedureBody,
        &[TokenKind::EndFunc],
    )?);
    parser.expect_into(&mut node, TokenKind::EndFunc)?;

    Ok(node)
}

/// `command ... endcommand`
fn parse_command(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::CommandBlock);
    node.push_terminal(parser.advance());
    parser.expect_line_end()?;

    parse_header_metadata(parser, &mut node)?;

    parser.in_command = true;
    let body = parse_block(parser, BlockKind::CommandBody, &[TokenKind::EndCommand]);
    parser.in_command = false;
    let body = body?;

    if body.rule_children().iter().all(|c| c.rule == Rule::MetadataEntry) {
        return Err(parser.unexpected_detailed("command block needs at least one statement"));
    }

    node.push_rule(body);
    parser.expect_into(&mut node, TokenKind::EndCommand)?;

    Ok(node)
}

/// `on event expr [named "name"] [as var] do ... endon`
fn parse_event_handler(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::EventHandler);
    node.push_terminal(parser.advance());
    parser.expect_word(&mut node, "event")?;

    node.push_rule(parse_expr(parser)?);

    if parser.current_token_kind() == TokenKind::Named {
        node.push_terminal(parser.advance());
        parser.expect_into(&mut node, TokenKind::String)?;
    }

    if parser.current_token_kind() == TokenKind::As {
        node.push_terminal(parser.advance());
        parser.expect_into(&mut node, TokenKind::Identifier)?;
    }

    parser.expect_into(&mut node, TokenKind::Do)?;
    parser.expect_line_end()?;

    node.push_rule(parse_block(parser, BlockKind::EventBody, &[TokenKind::EndOn])?);
    parser.expect_into(&mut node, TokenKind::EndOn)?;

    Ok(node)
}

/// Parses a full token stream (hidden tokens are ignored) into a parse tree
/// rooted at `Rule::Program`. Stops at the first syntax error.
pub fn parse(tokens: &[Token]) -> Result<ParseTree, Error> {
    let mut parser = Parser::new(tokens);
    create_token_lookups(&mut parser);

    let mut program = RuleNode::new(Rule::Program);

    loop {
        parser.skip_newlines();
        if !parser.has_tokens() {
            break;
        }

        let declaration = match parser.current_token_kind() {
            TokenKind::MetadataLine => {
                // Consumes its own line end
                program.push_rule(parse_metadata_entry(&mut parser)?);
                continue;
            }
            TokenKind::Func => parse_procedure(&mut parser)?,
            TokenKind::Command => parse_command(&mut parser)?,
            TokenKind::On => parse_event_handler(&mut parser)?,
            _ => {
                return Err(parser.unexpected_detailed(
                    "expected `func`, `command`, `on event` or a metadata line",
                ))
            }
        };

        program.push_rule(declaration);
        parser.expect_line_end()?;
    }

    program.push_terminal(parser.advance());

    debug!(
        "parsed {} top-level declaration(s)",
        program.rule_children().len()
    );
    Ok(ParseTree::Rule(program))
}
