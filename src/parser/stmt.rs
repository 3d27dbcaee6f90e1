use crate::{
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::{
    expr::parse_expr,
    parser::{parse_metadata_entry, Parser},
    tree::{BlockKind, Rule, RuleNode},
};

/// Parses statements (and metadata lines) up to, but not including, one of
/// `terminators`.
pub fn parse_block(
    parser: &mut Parser,
    kind: BlockKind,
    terminators: &[TokenKind],
) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::Block(kind));

    loop {
        parser.skip_newlines();
        let current = parser.current_token_kind();

        if terminators.contains(&current) {
            break;
        }

        match current {
            TokenKind::EOF => {
                let expected = terminators
                    .iter()
                    .map(|t| format!("{:?}", t).to_lowercase())
                    .collect::<Vec<String>>()
                    .join("` or `");
                return Err(
                    parser.unexpected_detailed(&format!("block is missing `{}`", expected))
                );
            }
            TokenKind::MetadataLine => node.push_rule(parse_metadata_entry(parser)?),
            _ => {
                node.push_rule(parse_stmt(parser)?);
                parser.expect_line_end()?;
            }
        }
    }

    Ok(node)
}

pub fn parse_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let handler = parser
        .get_stmt_lookup()
        .get(&parser.current_token_kind())
        .copied();

    if let Some(handler) = handler {
        return handler(parser);
    }

    let mut node = RuleNode::new(Rule::ExpressionStmt);
    node.push_rule(parse_expr(parser)?);
    Ok(node)
}

fn keyword_stmt(parser: &mut Parser, rule: Rule) -> RuleNode {
    let mut node = RuleNode::new(rule);
    node.push_terminal(parser.advance());
    node
}

pub fn parse_lvalue(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = RuleNode::new(Rule::Lvalue);

    let error = parser.unexpected_detailed("assignment target must start with an identifier");
    let identifier = parser.expect_error(TokenKind::Identifier, Some(error))?;
    node.push_terminal(identifier);

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

/// `set a, b.c = expr`
pub fn parse_set_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::SetStmt);

    let mut targets = RuleNode::new(Rule::LvalueList);
    targets.push_rule(parse_lvalue(parser)?);
    while parser.current_token_kind() == TokenKind::Comma {
        targets.push_terminal(parser.advance());
        targets.push_rule(parse_lvalue(parser)?);
    }
    node.push_rule(targets);

    parser.expect_into(&mut node, TokenKind::Assignment)?;
    node.push_rule(parse_expr(parser)?);
    Ok(node)
}

pub fn parse_call_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::CallStmt);
    node.push_rule(parse_expr(parser)?);
    Ok(node)
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    if parser.in_command() {
        return Err(Error::new(
            ErrorImpl::ReturnInCommand,
            parser.current_token().span.start.clone(),
        ));
    }

    let mut node = keyword_stmt(parser, Rule::ReturnStmt);

    if !matches!(
        parser.current_token_kind(),
        TokenKind::Newline | TokenKind::EOF
    ) {
        node.push_rule(parse_expr(parser)?);
        while parser.current_token_kind() == TokenKind::Comma {
            node.push_terminal(parser.advance());
            node.push_rule(parse_expr(parser)?);
        }
    }

    Ok(node)
}

pub fn parse_emit_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::EmitStmt);
    node.push_rule(parse_expr(parser)?);
    Ok(node)
}

pub fn parse_must_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::MustStmt);
    node.push_rule(parse_expr(parser)?);
    Ok(node)
}

pub fn parse_fail_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::FailStmt);

    if !matches!(
        parser.current_token_kind(),
        TokenKind::Newline | TokenKind::EOF
    ) {
        node.push_rule(parse_expr(parser)?);
    }

    Ok(node)
}

pub fn parse_clear_error_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    Ok(keyword_stmt(parser, Rule::ClearErrorStmt))
}

pub fn parse_break_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    Ok(keyword_stmt(parser, Rule::BreakStmt))
}

pub fn parse_continue_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    Ok(keyword_stmt(parser, Rule::ContinueStmt))
}

/// `ask model, prompt [with options] [into target]`
pub fn parse_ask_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::AskStmt);
    node.push_rule(parse_expr(parser)?);
    parser.expect_into(&mut node, TokenKind::Comma)?;
    node.push_rule(parse_expr(parser)?);

    if parser.current_token_kind() == TokenKind::With {
        node.push_terminal(parser.advance());
        node.push_rule(parse_expr(parser)?);
    }

    if parser.current_token_kind() == TokenKind::Into {
        node.push_terminal(parser.advance());
        node.push_rule(parse_lvalue(parser)?);
    }

    Ok(node)
}

/// `promptuser prompt into target`
pub fn parse_promptuser_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::PromptUserStmt);
    node.push_rule(parse_expr(parser)?);
    parser.expect_into(&mut node, TokenKind::Into)?;
    node.push_rule(parse_lvalue(parser)?);
    Ok(node)
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::IfStmt);
    node.push_rule(parse_expr(parser)?);
    parser.expect_line_end()?;
    node.push_rule(parse_block(
        parser,
        BlockKind::IfBody,
        &[TokenKind::Else, TokenKind::EndIf],
    )?);

    while parser.current_token_kind() == TokenKind::Else {
        if parser.peek_kind() == TokenKind::If {
            let mut clause = keyword_stmt(parser, Rule::ElseIfClause);
            clause.push_terminal(parser.advance());
            clause.push_rule(parse_expr(parser)?);
            parser.expect_line_end()?;
            clause.push_rule(parse_block(
                parser,
                BlockKind::ElseIfBody,
                &[TokenKind::Else, TokenKind::EndIf],
            )?);
            node.push_rule(clause);
        } else {
            let mut clause = keyword_stmt(parser, Rule::ElseClause);
            parser.expect_line_end()?;
            clause.push_rule(parse_block(parser, BlockKind::ElseBody, &[TokenKind::EndIf])?);
            node.push_rule(clause);
            break;
        }
    }

    parser.expect_into(&mut node, TokenKind::EndIf)?;
    Ok(node)
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::WhileStmt);
    node.push_rule(parse_expr(parser)?);
    parser.expect_line_end()?;
    node.push_rule(parse_block(parser, BlockKind::WhileBody, &[TokenKind::EndWhile])?);
    parser.expect_into(&mut node, TokenKind::EndWhile)?;
    Ok(node)
}

/// `for each item in collection`
pub fn parse_for_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::ForStmt);
    parser.expect_into(&mut node, TokenKind::Each)?;
    parser.expect_into(&mut node, TokenKind::Identifier)?;
    parser.expect_into(&mut node, TokenKind::In)?;
    node.push_rule(parse_expr(parser)?);
    parser.expect_line_end()?;
    node.push_rule(parse_block(parser, BlockKind::ForBody, &[TokenKind::EndFor])?);
    parser.expect_into(&mut node, TokenKind::EndFor)?;
    Ok(node)
}

/// `on error do ... endon`
pub fn parse_on_error_stmt(parser: &mut Parser) -> Result<RuleNode, Error> {
    let mut node = keyword_stmt(parser, Rule::OnErrorStmt);
    parser.expect_word(&mut node, "error")?;
    parser.expect_into(&mut node, TokenKind::Do)?;
    parser.expect_line_end()?;
    node.push_rule(parse_block(parser, BlockKind::OnErrorBody, &[TokenKind::EndOn])?);
    parser.expect_into(&mut node, TokenKind::EndOn)?;
    Ok(node)
}
