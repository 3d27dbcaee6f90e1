use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("func", TokenKind::Func);
        map.insert("endfunc", TokenKind::EndFunc);
        map.insert("means", TokenKind::Means);
        map.insert("needs", TokenKind::Needs);
        map.insert("optional", TokenKind::Optional);
        map.insert("returns", TokenKind::Returns);
        map.insert("command", TokenKind::Command);
        map.insert("endcommand", TokenKind::EndCommand);
        map.insert("on", TokenKind::On);
        map.insert("do", TokenKind::Do);
        map.insert("endon", TokenKind::EndOn);
        map.insert("named", TokenKind::Named);
        map.insert("as", TokenKind::As);
        map.insert("set", TokenKind::Set);
        map.insert("call", TokenKind::Call);
        map.insert("return", TokenKind::Return);
        map.insert("emit", TokenKind::Emit);
        map.insert("must", TokenKind::Must);
        map.insert("fail", TokenKind::Fail);
        map.insert("clear_error", TokenKind::ClearError);
        map.insert("ask", TokenKind::Ask);
        map.insert("with", TokenKind::With);
        map.insert("into", TokenKind::Into);
        map.insert("promptuser", TokenKind::PromptUser);
        map.insert("if", TokenKind::If);
        map.insert("else", TokenKind::Else);
        map.insert("endif", TokenKind::EndIf);
        map.insert("while", TokenKind::While);
        map.insert("endwhile", TokenKind::EndWhile);
        map.insert("for", TokenKind::For);
        map.insert("each", TokenKind::Each);
        map.insert("in", TokenKind::In);
        map.insert("endfor", TokenKind::EndFor);
        map.insert("break", TokenKind::Break);
        map.insert("continue", TokenKind::Continue);
        map.insert("and", TokenKind::And);
        map.insert("or", TokenKind::Or);
        map.insert("not", TokenKind::Not);
        map.insert("no", TokenKind::No);
        map.insert("some", TokenKind::Some);
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("nil", TokenKind::Nil);
        map.insert("typeof", TokenKind::Typeof);
        map.insert("eval", TokenKind::Eval);
        map.insert("tool", TokenKind::Tool);
        map.insert("last", TokenKind::Last);
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EOF,
    Newline,
    Number,
    String,
    RawString,
    Identifier,
    Comment,
    MetadataLine,

    PlaceholderOpen,  // {{
    PlaceholderClose, // }}

    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,

    Comma,
    Dot,
    Colon,

    Assignment, // =
    Equals,     // ==
    NotEquals,  // !=

    Less,
    LessEquals,
    Greater,
    GreaterEquals,

    Plus,
    Dash,
    Star,
    Slash,
    Percent,
    StarStar, // **

    Pipe,      // |
    Caret,     // ^
    Ampersand, // &
    Tilde,     // ~

    // Reserved
    Func,
    EndFunc,
    Means,
    Needs,
    Optional,
    Returns,
    Command,
    EndCommand,
    On,
    Do,
    EndOn,
    Named,
    As,
    Set,
    Call,
    Return,
    Emit,
    Must,
    Fail,
    ClearError,
    Ask,
    With,
    Into,
    PromptUser,
    If,
    Else,
    EndIf,
    While,
    EndWhile,
    For,
    Each,
    In,
    EndFor,
    Break,
    Continue,
    And,
    Or,
    Not,
    No,
    Some,
    True,
    False,
    Nil,
    Typeof,
    Eval,
    Tool,
    Last,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Hidden tokens are kept in the stream for the comment pass but never
/// reach the parser.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Channel {
    Default,
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
    pub channel: Channel,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token {{\nkind: {},\nvalue: {}}}", self.kind, self.value)
    }
}

impl Token {
    pub fn is_one_of_many(&self, tokens: &[TokenKind]) -> bool {
        tokens.contains(&self.kind)
    }

    /// Comments, newlines and the end-of-file marker carry no code.
    pub fn is_trivia(&self) -> bool {
        self.is_one_of_many(&[TokenKind::Comment, TokenKind::Newline, TokenKind::EOF])
    }

    pub fn is_hidden(&self) -> bool {
        self.channel == Channel::Hidden
    }

    pub fn line(&self) -> u32 {
        self.span.start.line
    }

    pub fn debug(&self) {
        if self.is_one_of_many(&[
            TokenKind::String,
            TokenKind::RawString,
            TokenKind::Identifier,
            TokenKind::Number,
            TokenKind::Comment,
            TokenKind::MetadataLine,
        ]) {
            println!("{} ({})", self.kind, self.value);
        } else {
            println!("{} ()", self.kind);
        }
    }
}
