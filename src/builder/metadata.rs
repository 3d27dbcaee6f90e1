use crate::{errors::errors::ErrorImpl, lexer::tokens::TokenKind, parser::tree::RuleNode};

use super::builder::AstBuilder;

const COMMENT_MARKERS: [&str; 3] = ["#", "--", "//"];

/// Cuts a trailing comment that starts at the beginning of `text` or after
/// whitespace, ignoring markers inside double quotes.
fn strip_trailing_comment(text: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut previous_is_space = true;

    for (index, c) in text.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' => quote = Some(c),
            None if previous_is_space
                && COMMENT_MARKERS
                    .iter()
                    .any(|marker| text[index..].starts_with(marker)) =>
            {
                return &text[..index];
            }
            None => {}
        }
        previous_is_space = c.is_whitespace();
    }

    text
}

/// Splits `:: key: value # note` into `("key", "value")`. Key-only lines get
/// an empty value; the key may come back empty, which callers report.
pub fn parse_metadata_line(line: &str) -> (String, String) {
    let content = match line.find("::") {
        Some(index) => &line[index + 2..],
        None => line,
    };
    let content = strip_trailing_comment(content);

    match content.split_once(':') {
        Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
        None => (content.trim().to_string(), String::new()),
    }
}

impl AstBuilder {
    /// Stores the entry on the innermost open procedure or command, falling
    /// back to file scope.
    pub(super) fn exit_metadata_entry(&mut self, node: &RuleNode) {
        let Some(token) = node.terminal(TokenKind::MetadataLine) else {
            return;
        };

        let (key, value) = parse_metadata_line(&token.value);
        if key.is_empty() {
            self.error(
                ErrorImpl::EmptyMetadataKey {
                    line: token.value.clone(),
                },
                token.span.start.clone(),
            );
            return;
        }

        trace!("Metadata {} = {:?}", key, value);

        let scope = if let Some(procedure) = self.current_procedure.as_mut() {
            &mut procedure.metadata
        } else if let Some(command) = self.current_command.as_mut() {
            &mut command.metadata
        } else {
            &mut self.program.metadata
        };
        scope.insert(key, value);
    }
}
