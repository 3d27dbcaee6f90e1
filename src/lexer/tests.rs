//! Unit tests for the lexer module.
//!
//! This module contains tests for tokenization including:
//! - Keywords and identifiers
//! - Numeric literals (integers and floats)
//! - String literals with escape sequences, raw strings
//! - Operators, punctuation and placeholders
//! - Comments, metadata lines and newline handling
//! - Position tracking and error cases

use super::{
    lexer::tokenize,
    tokens::{Channel, TokenKind},
};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source.to_string(), Some("test.ns".to_string()))
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    let source = "func needs optional returns means endfunc command endcommand set call return emit must fail clear_error".to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Func);
    assert_eq!(tokens[1].kind, TokenKind::Needs);
    assert_eq!(tokens[2].kind, TokenKind::Optional);
    assert_eq!(tokens[3].kind, TokenKind::Returns);
    assert_eq!(tokens[4].kind, TokenKind::Means);
    assert_eq!(tokens[5].kind, TokenKind::EndFunc);
    assert_eq!(tokens[6].kind, TokenKind::Command);
    assert_eq!(tokens[7].kind, TokenKind::EndCommand);
    assert_eq!(tokens[8].kind, TokenKind::Set);
    assert_eq!(tokens[9].kind, TokenKind::Call);
    assert_eq!(tokens[10].kind, TokenKind::Return);
    assert_eq!(tokens[11].kind, TokenKind::Emit);
    assert_eq!(tokens[12].kind, TokenKind::Must);
    assert_eq!(tokens[13].kind, TokenKind::Fail);
    assert_eq!(tokens[14].kind, TokenKind::ClearError);
    assert_eq!(tokens[15].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_control_keywords() {
    assert_eq!(
        kinds("if else endif while endwhile for each in endfor break continue on do endon"),
        vec![
            TokenKind::If,
            TokenKind::Else,
            TokenKind::EndIf,
            TokenKind::While,
            TokenKind::EndWhile,
            TokenKind::For,
            TokenKind::Each,
            TokenKind::In,
            TokenKind::EndFor,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::On,
            TokenKind::Do,
            TokenKind::EndOn,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_keywords_are_case_sensitive() {
    let tokens = tokenize("Set IF error event".to_string(), None).unwrap();

    assert!(tokens[..4]
        .iter()
        .all(|t| t.kind == TokenKind::Identifier));
}

#[test]
fn test_tokenize_identifiers() {
    let source = "foo bar baz_123 _underscore CamelCase".to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].value, "foo");
    assert_eq!(tokens[2].value, "baz_123");
    assert_eq!(tokens[3].value, "_underscore");
    assert_eq!(tokens[4].value, "CamelCase");
    assert_eq!(tokens[5].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_numbers() {
    let source = "42 3.14 0 100.5".to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].kind, TokenKind::Number);
    assert_eq!(tokens[1].value, "3.14");
    assert_eq!(tokens[2].value, "0");
    assert_eq!(tokens[3].value, "100.5");
    assert_eq!(tokens[4].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_strings() {
    let source = r#""hello" 'world' "multiple words""#.to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].value, "hello");
    assert_eq!(tokens[1].kind, TokenKind::String);
    assert_eq!(tokens[1].value, "world");
    assert_eq!(tokens[2].value, "multiple words");
    assert_eq!(tokens[3].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_string_escapes() {
    let source = r#""hello\nworld" "tab\there" "backslash\\" "hex\x41" 'it\'s'"#.to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].value, "hello\nworld");
    assert_eq!(tokens[1].value, "tab\there");
    assert_eq!(tokens[2].value, "backslash\\");
    assert_eq!(tokens[3].value, "hexA");
    assert_eq!(tokens[4].value, "it's");
    assert_eq!(tokens[5].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_escaped_quote_in_string() {
    let source = r#""quote\"test""#.to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].value, "quote\"test");
    assert_eq!(tokens[1].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_raw_string_spans_lines() {
    let source = "set a = ```line one\nline \"two\"```\nemit a".to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[3].kind, TokenKind::RawString);
    assert_eq!(tokens[3].value, "line one\nline \"two\"");
    assert_eq!(tokens[4].kind, TokenKind::Newline);
    assert_eq!(tokens[5].kind, TokenKind::Emit);
    assert_eq!(tokens[5].line(), 3);
}

#[test]
fn test_tokenize_operators() {
    assert_eq!(
        kinds("+ - * / % ** == != < > <= >= = | ^ & ~"),
        vec![
            TokenKind::Plus,
            TokenKind::Dash,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::StarStar,
            TokenKind::Equals,
            TokenKind::NotEquals,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::LessEquals,
            TokenKind::GreaterEquals,
            TokenKind::Assignment,
            TokenKind::Pipe,
            TokenKind::Caret,
            TokenKind::Ampersand,
            TokenKind::Tilde,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_punctuation() {
    assert_eq!(
        kinds("( ) { } [ ] . , :"),
        vec![
            TokenKind::OpenParen,
            TokenKind::CloseParen,
            TokenKind::OpenCurly,
            TokenKind::CloseCurly,
            TokenKind::OpenBracket,
            TokenKind::CloseBracket,
            TokenKind::Dot,
            TokenKind::Comma,
            TokenKind::Colon,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_comments_are_hidden() {
    let source = "set x = 5 # hash\n-- dashes\nemit x // slashes".to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    let comments: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Comment)
        .collect();

    assert_eq!(comments.len(), 3);
    assert!(comments.iter().all(|t| t.channel == Channel::Hidden));
    assert_eq!(comments[0].value, "# hash");
    assert_eq!(comments[1].value, "-- dashes");
    assert_eq!(comments[1].line(), 2);
    assert_eq!(comments[2].value, "// slashes");
    assert!(tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .all(|t| t.channel == Channel::Default));
}

#[test]
fn test_tokenize_metadata_line() {
    let source = ":: author: someone # note\nset a = 1".to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::MetadataLine);
    assert_eq!(tokens[0].value, ":: author: someone # note");
    assert_eq!(tokens[1].kind, TokenKind::Newline);
    assert_eq!(tokens[2].kind, TokenKind::Set);
}

#[test]
fn test_tokenize_placeholders() {
    assert_eq!(
        kinds("{{name}}"),
        vec![
            TokenKind::PlaceholderOpen,
            TokenKind::Identifier,
            TokenKind::PlaceholderClose,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_double_close_without_placeholder_is_two_curlies() {
    assert_eq!(
        kinds("{\"a\": {\"b\": 1}}"),
        vec![
            TokenKind::OpenCurly,
            TokenKind::String,
            TokenKind::Colon,
            TokenKind::OpenCurly,
            TokenKind::String,
            TokenKind::Colon,
            TokenKind::Number,
            TokenKind::CloseCurly,
            TokenKind::CloseCurly,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_newlines_are_significant() {
    assert_eq!(
        kinds("emit 1\nemit 2\n"),
        vec![
            TokenKind::Emit,
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::Emit,
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_newlines_inside_brackets_are_skipped() {
    assert_eq!(
        kinds("set a = [1,\n  2]\n"),
        vec![
            TokenKind::Set,
            TokenKind::Identifier,
            TokenKind::Assignment,
            TokenKind::OpenBracket,
            TokenKind::Number,
            TokenKind::Comma,
            TokenKind::Number,
            TokenKind::CloseBracket,
            TokenKind::Newline,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_line_continuation() {
    let tokens = tokenize("set a = 1 + \\\n  2".to_string(), None).unwrap();

    assert!(tokens.iter().all(|t| t.kind != TokenKind::Newline));
    assert_eq!(tokens[5].value, "2");
    assert_eq!(tokens[5].line(), 2);
    assert_eq!(tokens[5].span.start.column, 3);
}

#[test]
fn test_token_positions() {
    let tokens = tokenize("set a = 1\n  emit a".to_string(), Some("pos.ns".to_string())).unwrap();

    let emit = &tokens[5];
    assert_eq!(emit.kind, TokenKind::Emit);
    assert_eq!(emit.span.start.line, 2);
    assert_eq!(emit.span.start.column, 3);
    assert_eq!(emit.span.start.offset, 12);
    assert_eq!(emit.span.end.column, 7);
    assert_eq!(&*emit.span.start.file, "pos.ns");
}

#[test]
fn test_crlf_line_endings() {
    let tokens = tokenize(":: k: v\r\n# note\r\nemit 1\r\n".to_string(), None).unwrap();

    let metadata = &tokens[0];
    assert_eq!(metadata.kind, TokenKind::MetadataLine);
    assert_eq!(metadata.value, ":: k: v");
    assert_eq!(metadata.span.end.column, 8);

    let comment = tokens.iter().find(|t| t.kind == TokenKind::Comment).unwrap();
    assert_eq!(comment.value, "# note");
    assert_eq!(comment.span.start.line, 2);
    assert_eq!(comment.span.end.column, 7);

    let emit = tokens.iter().find(|t| t.kind == TokenKind::Emit).unwrap();
    assert_eq!(emit.span.start.line, 3);
}

#[test]
fn test_default_file_name() {
    let tokens = tokenize("emit 1".to_string(), None).unwrap();
    assert_eq!(&*tokens[0].span.start.file, "shell");
}

#[test]
fn test_tokenize_unrecognized_token() {
    let source = "set x = @".to_string();
    let result = tokenize(source, Some("test.ns".to_string()));

    let error = result.unwrap_err();
    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_position().column, 9);
}

#[test]
fn test_tokenize_whitespace_handling() {
    assert_eq!(
        kinds("  set   x   =   42  "),
        vec![
            TokenKind::Set,
            TokenKind::Identifier,
            TokenKind::Assignment,
            TokenKind::Number,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_empty_string() {
    let source = r#""""#.to_string();
    let tokens = tokenize(source, Some("test.ns".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].value, "");
    assert_eq!(tokens[1].kind, TokenKind::EOF);
}

#[test]
fn test_trivia_classification() {
    let tokens = tokenize("emit 1 # c\n".to_string(), None).unwrap();

    assert!(!tokens[0].is_trivia());
    assert!(!tokens[1].is_trivia());
    assert!(tokens[2].is_trivia());
    assert!(tokens[3].is_trivia());
    assert!(tokens[4].is_trivia());
}
