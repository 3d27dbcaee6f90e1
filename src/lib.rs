#![allow(clippy::module_inception)]

#[macro_use]
extern crate log;

use std::sync::Arc;

use crate::{
    ast::ast::{Metadata, Program},
    builder::{build, BuildOptions},
    errors::errors::{BuildErrors, Error, ErrorTip},
    lexer::lexer::tokenize,
    parser::parser::parse,
};

pub mod ast;
pub mod builder;
pub mod codec;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;

extern crate regex;

/// A point in a source file. Lines and columns are 1-based; a line of 0
/// marks a position that was never stamped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
    pub file: Arc<str>,
}

impl Position {
    pub fn new(offset: u32, line: u32, column: u32, file: Arc<str>) -> Self {
        Position {
            offset,
            line,
            column,
            file,
        }
    }

    pub fn null() -> Self {
        Position::new(0, 0, 0, Arc::from("<null>"))
    }

    pub fn is_set(&self) -> bool {
        self.line > 0
    }

    /// True when `self` is at or before `other` in the same file.
    pub fn precedes_or_equals(&self, other: &Position) -> bool {
        (self.line, self.column) <= (other.line, other.column)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::null()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Everything produced for one source file: the tree, the file-level
/// metadata, and the collected build errors (if any).
#[derive(Debug)]
pub struct Compilation {
    pub program: Program,
    pub file_metadata: Metadata,
    pub result: Result<(), BuildErrors>,
}

/// Tokenizes, parses and builds `source` in one go.
///
/// Tokenizer and parser failures abort immediately. Build errors are
/// collected into `Compilation::result` and the (possibly partial) tree is
/// still returned.
pub fn compile_source(
    source: &str,
    file: Option<String>,
    options: &BuildOptions,
) -> Result<Compilation, Error> {
    let tokens = tokenize(source.to_string(), file)?;
    let tree = parse(&tokens)?;
    let (output, result) = build(&tree, &tokens, options);

    Ok(Compilation {
        program: output.program,
        file_metadata: output.file_metadata,
        result,
    })
}

/// Returns the 1-based line number, the text of that line and the byte
/// offset of `position` within the line.
pub fn get_line_at_position(source: &str, position: u32) -> Option<(usize, String, usize)> {
    let pos = position as usize;

    let mut start = 0;
    let mut line_number = 1;

    for line in source.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            let line_pos = pos - start;
            return Some((line_number, line.to_string(), line_pos));
        }

        start = end;
        line_number += 1;
    }

    None
}

pub fn display_error(error: &Error, source: &str) {
    /*
        error: message
        -> script.ns
           |
        20 | set a = #
           | --------^
    */

    let position = error.get_position();

    match error.get_tip() {
        ErrorTip::None => eprintln!("Error: {}", error.get_error_name()),
        tip => eprintln!("Error: {} ({})", error.get_error_name(), tip),
    }
    eprintln!("-> {}", position);

    let Some((line, line_text, line_pos)) = get_line_at_position(source, position.offset) else {
        return;
    };

    let line_str = line.to_string();
    let padding = line_str.len() + 2;

    eprintln!("{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    eprintln!("{} | {}", line_str, line_text_removed.trim_end());

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

    eprintln!("{:>padding$} {:->arrows$}", "|", "^");
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' || c == '\t' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}
