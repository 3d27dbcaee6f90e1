use crate::{errors::errors::Error, lexer::tokens::TokenKind};

use super::{
    lookups::{Precedence, UNARY_OPERATORS},
    parser::Parser,
    tree::{Rule, RuleNode},
};

/// Parses a full expression, starting at the loosest precedence level.
pub fn parse_expr(parser: &mut Parser) -> Result<RuleNode, Error> {
    parse_binary_level(parser, Precedence::LogicalOr)
}

/// One precedence level as a flat `operand (op operand)*` repetition.
pub fn parse_binary_level(parser: &mut Parser, level: Precedence) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(level.rule());
    node.push_rule(parse_operand(parser, level)?);

    while level.operators().contains(&parser.current_token_kind()) {
        node.push_terminal(parser.advance());
        node.push_rule(parse_operand(parser, level)?);
    }

    Ok(node)
}

fn parse_operand(parser: &mut Parser, level: Precedence) -> Result<RuleNode, Error> {
    match level.next() {
        Some(next) => parse_binary_level(parser, next),
        None => parse_unary_expr(parser),
    }
}

pub fn parse_unary_expr(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::UnaryExpr);

    if UNARY_OPERATORS.contains(&parser.current_token_kind()) {
        node.push_terminal(parser.advance());
        node.push_rule(parse_unary_expr(parser)?);
    } else {
        node.push_rule(parse_power_expr(parser)?);
    }

    Ok(node)
}

/// `accessor ('**' power)?`, recursing on the right.
pub fn parse_power_expr(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::PowerExpr);
    node.push_rule(parse_accessor_expr(parser)?);

    if parser.current_token_kind() == TokenKind::StarStar {
        node.push_terminal(parser.advance());
        node.push_rule(parse_power_expr(parser)?);
    }

    Ok(node)
}

pub fn parse_accessor_expr(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::AccessorExpr);
    node.push_rule(parse_primary(parser)?);

    loop {
        match parser.current_token_kind() {
            TokenKind::OpenBracket => {
                node.push_terminal(parser.advance());
                node.push_rule(parse_expr(parser)?);
                parser.expect_into(&mut node, TokenKind::CloseBracket)?;
            }
            TokenKind::Dot => {
                node.push_terminal(parser.advance());
                parser.expect_into(&mut node, TokenKind::Identifier)?;
            }
            _ => break,
        }
    }

    Ok(node)
}

pub fn parse_primary(parser: &mut Parser) -> Result<RuleNode, Error> {
    let handler = match parser.get_nud_lookup().get(&parser.current_token_kind()) {
        Some(handler) => *handler,
        None => return Err(parser.unexpected_detailed("expected an expression")),
    };

    let mut node = RuleNode::new(Rule::Primary);
    handler(parser, &mut node)?;
    Ok(node)
}

pub fn parse_literal(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    let mut node = RuleNode::new(Rule::Literal);
    node.push_terminal(parser.advance());
    primary.push_rule(node);
    Ok(())
}

/// A bare identifier is a variable unless a call follows.
pub fn parse_identifier_primary(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    if parser.peek_kind() == TokenKind::OpenParen {
        primary.push_rule(parse_callable(parser)?);
    } else {
        primary.push_terminal(parser.advance());
    }
    Ok(())
}

pub fn parse_callable_primary(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    primary.push_rule(parse_callable(parser)?);
    Ok(())
}

pub fn parse_last_primary(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    primary.push_terminal(parser.advance());
    Ok(())
}

pub fn parse_grouping_expr(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    primary.push_terminal(parser.advance());
    primary.push_rule(parse_expr(parser)?);
    parser.expect_into(primary, TokenKind::CloseParen)
}

/// `{{name}}`
pub fn parse_placeholder(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    let mut node = RuleNode::new(Rule::Placeholder);
    node.push_terminal(parser.advance());
    parser.expect_into(&mut node, TokenKind::Identifier)?;
    parser.expect_into(&mut node, TokenKind::PlaceholderClose)?;
    primary.push_rule(node);
    Ok(())
}

fn parse_call_target(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::CallTarget);

    if parser.current_token_kind() == TokenKind::Tool {
        node.push_terminal(parser.advance());
        parser.expect_into(&mut node, TokenKind::Dot)?;
        parser.expect_into(&mut node, TokenKind::Identifier)?;

        while parser.current_token_kind() == TokenKind::Dot {
            node.push_terminal(parser.advance());
            parser.expect_into(&mut node, TokenKind::Identifier)?;
        }
    } else {
        parser.expect_into(&mut node, TokenKind::Identifier)?;
    }

    Ok(node)
}

/// `target(arg, ...)`
pub fn parse_callable(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::CallableExpr);
    node.push_rule(parse_call_target(parser)?);
    parser.expect_into(&mut node, TokenKind::OpenParen)?;

    if parser.current_token_kind() != TokenKind::CloseParen {
        node.push_rule(parse_expr(parser)?);

        while parser.current_token_kind() == TokenKind::Comma {
            node.push_terminal(parser.advance());
            node.push_rule(parse_expr(parser)?);
        }
    }

    parser.expect_into(&mut node, TokenKind::CloseParen)?;
    Ok(node)
}

pub fn parse_list_literal(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    let mut node = RuleNode::new(Rule::ListLiteral);
    node.push_terminal(parser.advance());

    if parser.current_token_kind() != TokenKind::CloseBracket {
        node.push_rule(parse_expr(parser)?);

        while parser.current_token_kind() == TokenKind::Comma {
            node.push_terminal(parser.advance());
            node.push_rule(parse_expr(parser)?);
        }
    }

    parser.expect_into(&mut node, TokenKind::CloseBracket)?;
    primary.push_rule(node);
    Ok(())
}

fn parse_map_entry(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::MapEntry);

    let error = parser.unexpected_detailed("map keys must be string literals");
    let key = parser.expect_error(TokenKind::String, Some(error))?;
    node.push_terminal(key);

    parser.expect_into(&mut node, TokenKind::Colon)?;
    node.push_rule(parse_expr(parser)?);
    Ok(node)
}

pub fn parse_map_literal(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    let mut node = RuleNode::new(Rule::MapLiteral);
    node.push_terminal(parser.advance());

    if parser.current_token_kind() != TokenKind::CloseCurly {
        node.push_rule(parse_map_entry(parser)?);

        while parser.current_token_kind() == TokenKind::Comma {
            node.push_terminal(parser.advance());
            node.push_rule(parse_map_entry(parser)?);
        }
    }

    parser.expect_into(&mut node, TokenKind::CloseCurly)?;
    primary.push_rule(node);
    Ok(())
}

/// `eval(expr)`
pub fn parse_eval_expr(parser: &mut Parser, primary: &mut RuleNode) -> Result<(), Error> {
    let mut node = RuleNode::new(Rule::EvalExpr);
    node.push_terminal(parser.advance());
    parser.expect_into(&mut node, TokenKind::OpenParen)?;
    node.push_rule(parse_expr(parser)?);
    parser.expect_into(&mut node, TokenKind::CloseParen)?;
    primary.push_rule(node);
    Ok(())
}
