use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Channel, Token, TokenKind, RESERVED_LOOKUP};

pub type RegexHandler = fn(&mut Lexer, &str);

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

lazy_static! {
    // Every pattern is anchored; the first one that matches wins, so longer
    // operators must come before their prefixes.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        RegexPattern { regex: Regex::new("^[ \t\r]+").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new("^\\\\[ \t]*\r?\n").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new("^\n").unwrap(), handler: newline_handler },
        RegexPattern { regex: Regex::new("^::[^\r\n]*").unwrap(), handler: metadata_handler },
        RegexPattern { regex: Regex::new("^(#|--|//)[^\r\n]*").unwrap(), handler: comment_handler },
        RegexPattern { regex: Regex::new("^```(?s:.*?)```").unwrap(), handler: raw_string_handler },
        RegexPattern { regex: Regex::new("^\"(\\\\.|[^\"\\\\\n])*\"").unwrap(), handler: string_handler },
        RegexPattern { regex: Regex::new("^'(\\\\.|[^'\\\\\n])*'").unwrap(), handler: string_handler },
        RegexPattern { regex: Regex::new("^[0-9]+(\\.[0-9]+)?").unwrap(), handler: number_handler },
        RegexPattern { regex: Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*").unwrap(), handler: symbol_handler },
        RegexPattern { regex: Regex::new("^\\{\\{").unwrap(), handler: placeholder_open_handler },
        RegexPattern { regex: Regex::new("^\\}\\}").unwrap(), handler: placeholder_close_handler },
        RegexPattern { regex: Regex::new("^[\\[\\{\\(]").unwrap(), handler: open_bracket_handler },
        RegexPattern { regex: Regex::new("^[\\]\\}\\)]").unwrap(), handler: close_bracket_handler },
        RegexPattern { regex: Regex::new("^\\*\\*").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::StarStar, "**") },
        RegexPattern { regex: Regex::new("^==").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Equals, "==") },
        RegexPattern { regex: Regex::new("^!=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=") },
        RegexPattern { regex: Regex::new("^<=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=") },
        RegexPattern { regex: Regex::new("^>=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=") },
        RegexPattern { regex: Regex::new("^<").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Less, "<") },
        RegexPattern { regex: Regex::new("^>").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Greater, ">") },
        RegexPattern { regex: Regex::new("^=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=") },
        RegexPattern { regex: Regex::new("^\\+").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+") },
        RegexPattern { regex: Regex::new("^-").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dash, "-") },
        RegexPattern { regex: Regex::new("^\\*").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Star, "*") },
        RegexPattern { regex: Regex::new("^/").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Slash, "/") },
        RegexPattern { regex: Regex::new("^%").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Percent, "%") },
        RegexPattern { regex: Regex::new("^\\|").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Pipe, "|") },
        RegexPattern { regex: Regex::new("^\\^").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Caret, "^") },
        RegexPattern { regex: Regex::new("^&").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Ampersand, "&") },
        RegexPattern { regex: Regex::new("^~").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Tilde, "~") },
        RegexPattern { regex: Regex::new("^,").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Comma, ",") },
        RegexPattern { regex: Regex::new("^\\.").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dot, ".") },
        RegexPattern { regex: Regex::new("^:").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Colon, ":") },
    ];
}

pub struct Lexer {
    tokens: Vec<Token>,
    source: String,
    pos: usize,
    line: u32,
    column: u32,
    file: Arc<str>,
    bracket_depth: u32,
    placeholder_open: bool,
}

impl Lexer {
    pub fn new(source: String, file: Option<String>) -> Lexer {
        let file_name: Arc<str> = match file {
            Some(file) => Arc::from(file),
            None => Arc::from("shell"),
        };

        Lexer {
            tokens: vec![],
            source,
            pos: 0,
            line: 1,
            column: 1,
            file: file_name,
            bracket_depth: 0,
            placeholder_open: false,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.pos as u32, self.line, self.column, Arc::clone(&self.file))
    }

    /// Moves past `text`, keeping line and column in step.
    pub fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += text.len();
    }

    /// Pushes a token spanning `matched` and advances past it.
    pub fn emit(&mut self, kind: TokenKind, value: String, matched: &str, channel: Channel) {
        let start = self.position();
        self.advance(matched);
        let end = self.position();

        self.push(MK_TOKEN!(kind, value, Span { start, end }, channel));
    }

    pub fn push(&mut self, token: Token) {
        trace!("token {:?} {:?} at {}", token.kind, token.value, token.span.start);
        self.tokens.push(token);
    }

    pub fn remainder(&self) -> &str {
        &self.source[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn skip_handler(lexer: &mut Lexer, matched: &str) {
    lexer.advance(matched);
}

fn newline_handler(lexer: &mut Lexer, matched: &str) {
    if lexer.bracket_depth > 0 {
        lexer.advance(matched);
    } else {
        lexer.emit(TokenKind::Newline, String::from("\\n"), matched, Channel::Default);
    }
}

fn metadata_handler(lexer: &mut Lexer, matched: &str) {
    lexer.emit(
        TokenKind::MetadataLine,
        matched.to_string(),
        matched,
        Channel::Default,
    );
}

fn comment_handler(lexer: &mut Lexer, matched: &str) {
    lexer.emit(
        TokenKind::Comment,
        matched.trim_end().to_string(),
        matched,
        Channel::Hidden,
    );
}

fn raw_string_handler(lexer: &mut Lexer, matched: &str) {
    let contents = &matched[3..matched.len() - 3];
    lexer.emit(
        TokenKind::RawString,
        contents.to_string(),
        matched,
        Channel::Default,
    );
}

fn string_handler(lexer: &mut Lexer, matched: &str) {
    let contents = &matched[1..matched.len() - 1];
    lexer.emit(TokenKind::String, unescape(contents), matched, Channel::Default);
}

fn unescape(literal: &str) -> String {
    let mut result = String::new();
    let mut chars = literal.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        match chars.peek().copied() {
            Some('n') => {
                result.push('\n');
                chars.next();
            }
            Some('t') => {
                result.push('\t');
                chars.next();
            }
            Some('r') => {
                result.push('\r');
                chars.next();
            }
            Some('0') => {
                result.push('\0');
                chars.next();
            }
            Some(quote @ ('\\' | '"' | '\'')) => {
                result.push(quote);
                chars.next();
            }
            Some('x') => {
                chars.next();
                let mut hex = String::new();

                for _ in 0..2 {
                    match chars.peek() {
                        Some(digit) if digit.is_ascii_hexdigit() => {
                            hex.push(*digit);
                            chars.next();
                        }
                        _ => break,
                    }
                }

                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) => result.push(byte as char),
                    Err(_) => {
                        result.push_str("\\x");
                        result.push_str(&hex);
                    }
                }
            }
            // Unknown escapes keep the backslash
            _ => result.push(ch),
        }
    }

    result
}

fn number_handler(lexer: &mut Lexer, matched: &str) {
    lexer.emit(TokenKind::Number, matched.to_string(), matched, Channel::Default);
}

fn symbol_handler(lexer: &mut Lexer, matched: &str) {
    let kind = match RESERVED_LOOKUP.get(matched) {
        Some(kind) => *kind,
        None => TokenKind::Identifier,
    };

    lexer.emit(kind, matched.to_string(), matched, Channel::Default);
}

fn placeholder_open_handler(lexer: &mut Lexer, matched: &str) {
    lexer.placeholder_open = true;
    lexer.emit(
        TokenKind::PlaceholderOpen,
        matched.to_string(),
        matched,
        Channel::Default,
    );
}

fn placeholder_close_handler(lexer: &mut Lexer, matched: &str) {
    if lexer.placeholder_open {
        lexer.placeholder_open = false;
        lexer.emit(
            TokenKind::PlaceholderClose,
            matched.to_string(),
            matched,
            Channel::Default,
        );
    } else {
        // Two map closes in a row; only consume the first.
        close_bracket_handler(lexer, "}");
    }
}

fn open_bracket_handler(lexer: &mut Lexer, matched: &str) {
    let kind = match matched {
        "[" => TokenKind::OpenBracket,
        "{" => TokenKind::OpenCurly,
        _ => TokenKind::OpenParen,
    };

    lexer.bracket_depth += 1;
    lexer.emit(kind, matched.to_string(), matched, Channel::Default);
}

fn close_bracket_handler(lexer: &mut Lexer, matched: &str) {
    let kind = match matched {
        "]" => TokenKind::CloseBracket,
        "}" => TokenKind::CloseCurly,
        _ => TokenKind::CloseParen,
    };

    lexer.bracket_depth = lexer.bracket_depth.saturating_sub(1);
    lexer.emit(kind, matched.to_string(), matched, Channel::Default);
}

/// Splits `source` into tokens, including hidden comment tokens, and
/// terminates the stream with an `EOF` token.
pub fn tokenize(source: String, file: Option<String>) -> Result<Vec<Token>, Error> {
    let mut lex = Lexer::new(source, file);

    while !lex.at_eof() {
        let found = PATTERNS.iter().find_map(|pattern| {
            pattern
                .regex
                .find(lex.remainder())
                .map(|m| (pattern.handler, m.as_str().to_string()))
        });

        match found {
            Some((handler, matched)) => handler(&mut lex, &matched),
            None => {
                let token = lex
                    .remainder()
                    .chars()
                    .next()
                    .map(String::from)
                    .unwrap_or_default();

                return Err(Error::new(
                    ErrorImpl::UnrecognisedToken { token },
                    lex.position(),
                ));
            }
        }
    }

    let end = lex.position();
    lex.push(MK_TOKEN!(
        TokenKind::EOF,
        String::from("EOF"),
        Span {
            start: end.clone(),
            end
        }
    ));

    debug!("tokenized {} token(s) from {}", lex.tokens.len(), lex.file);
    Ok(lex.tokens)
}
