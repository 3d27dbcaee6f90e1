//! Attaches comment tokens to the nodes they describe.
//!
//! A comment sharing a line with code belongs to the node that owns that
//! line. A comment on a line of its own floats forward to the next node
//! that starts a line. Whatever is still floating at the end of the file
//! goes to the last node seen.

use std::collections::HashMap;

use crate::{
    ast::{
        ast::{BaseNode, Comment, Kind, Program},
        statements::{Step, StepType},
    },
    lexer::tokens::{Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    Program,
    Procedure(String),
    Command(usize),
    Event(usize),
}

/// Where a node lives: the declaration owning it, then one `(list, index)`
/// pair per nesting level. At the first level list 0 is the step list and
/// list 1 the error handlers; below that it indexes [`Step::blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeAddress {
    owner: Owner,
    path: Vec<(usize, usize)>,
}

impl NodeAddress {
    fn program() -> Self {
        NodeAddress {
            owner: Owner::Program,
            path: vec![],
        }
    }

    fn declaration(owner: Owner) -> Self {
        NodeAddress {
            owner,
            path: vec![],
        }
    }
}

struct LineEntry {
    depth: usize,
    start: u32,
    end: u32,
    is_block: bool,
    address: NodeAddress,
}

fn collect_steps(
    steps: &[Step],
    parent: &NodeAddress,
    list: usize,
    depth: usize,
    entries: &mut Vec<LineEntry>,
) {
    for (index, step) in steps.iter().enumerate() {
        let mut path = parent.path.clone();
        path.push((list, index));
        let address = NodeAddress {
            owner: parent.owner.clone(),
            path,
        };

        for (block, steps) in step.blocks().into_iter().enumerate() {
            collect_steps(steps, &address, block, depth + 1, entries);
        }

        entries.push(LineEntry {
            depth,
            start: step.base.start.line,
            end: step.base.end.line,
            is_block: matches!(
                step.step_type(),
                StepType::If | StepType::For | StepType::While | StepType::OnError
            ),
            address,
        });
    }
}

fn collect_declaration(
    base: &BaseNode,
    steps: &[Step],
    error_handlers: &[Step],
    owner: Owner,
    entries: &mut Vec<LineEntry>,
) {
    let address = NodeAddress::declaration(owner);
    collect_steps(steps, &address, 0, 1, entries);
    collect_steps(error_handlers, &address, 1, 1, entries);
    entries.push(LineEntry {
        depth: 0,
        start: base.start.line,
        end: base.end.line,
        is_block: true,
        address,
    });
}

/// Maps source lines to the node owning them. Outer nodes claim a line
/// first; block end lines only fill lines nothing starts on.
fn build_line_map(program: &Program) -> HashMap<u32, NodeAddress> {
    let mut entries = vec![];

    for procedure in program.procedures.values() {
        collect_declaration(
            &procedure.base,
            &procedure.steps,
            &procedure.error_handlers,
            Owner::Procedure(procedure.name.clone()),
            &mut entries,
        );
    }
    for (index, command) in program.commands.iter().enumerate() {
        collect_declaration(
            &command.base,
            &command.steps,
            &command.error_handlers,
            Owner::Command(index),
            &mut entries,
        );
    }
    for (index, event) in program.events.iter().enumerate() {
        collect_declaration(
            &event.base,
            &event.steps,
            &event.error_handlers,
            Owner::Event(index),
            &mut entries,
        );
    }

    entries.sort_by_key(|entry| entry.depth);

    let mut lines = HashMap::new();
    for entry in &entries {
        if entry.start > 0 {
            lines
                .entry(entry.start)
                .or_insert_with(|| entry.address.clone());
        }
    }
    for entry in entries.iter().filter(|entry| entry.is_block) {
        if entry.end > 0 {
            lines
                .entry(entry.end)
                .or_insert_with(|| entry.address.clone());
        }
    }

    lines
}

fn comments_mut<'a>(program: &'a mut Program, address: &NodeAddress) -> Option<&'a mut Vec<Comment>> {
    let (comments, steps, error_handlers) = match &address.owner {
        Owner::Program => return Some(&mut program.comments),
        Owner::Procedure(name) => {
            let procedure = program.procedures.get_mut(name)?;
            (
                &mut procedure.comments,
                &mut procedure.steps,
                &mut procedure.error_handlers,
            )
        }
        Owner::Command(index) => {
            let command = program.commands.get_mut(*index)?;
            (
                &mut command.comments,
                &mut command.steps,
                &mut command.error_handlers,
            )
        }
        Owner::Event(index) => {
            let event = program.events.get_mut(*index)?;
            (
                &mut event.comments,
                &mut event.steps,
                &mut event.error_handlers,
            )
        }
    };

    let Some((&(list, index), rest)) = address.path.split_first() else {
        return Some(comments);
    };

    let top = if list == 0 { steps } else { error_handlers };
    let mut step = top.get_mut(index)?;
    for &(block, index) in rest {
        step = step.blocks_mut().into_iter().nth(block)?.get_mut(index)?;
    }

    Some(&mut step.comments)
}

fn comment_node(token: &Token) -> Comment {
    Comment {
        base: BaseNode::new(
            Kind::Comment,
            token.span.start.clone(),
            token.span.end.clone(),
        ),
        text: token.value.clone(),
    }
}

/// Single pass over `tokens` (hidden comments included). Every comment
/// token ends up on exactly one node.
pub fn associate(program: &mut Program, tokens: &[Token]) {
    let lines = build_line_map(program);

    let mut attachments: Vec<(NodeAddress, Comment)> = vec![];
    let mut floating: Vec<Comment> = vec![];
    let mut last_code_line = 0;
    let mut last_node = NodeAddress::program();

    for token in tokens {
        match token.kind {
            TokenKind::Comment => {
                let comment = comment_node(token);
                if token.line() == last_code_line {
                    attachments.push((last_node.clone(), comment));
                } else {
                    floating.push(comment);
                }
            }
            TokenKind::Newline | TokenKind::EOF => {}
            _ => {
                if let Some(address) = lines.get(&token.line()) {
                    attachments.extend(floating.drain(..).map(|c| (address.clone(), c)));
                    last_node = address.clone();
                }
                last_code_line = token.span.end.line;
            }
        }
    }

    attachments.extend(floating.drain(..).map(|c| (last_node.clone(), c)));

    trace!("Attaching {} comment(s)", attachments.len());

    for (address, comment) in attachments {
        match comments_mut(program, &address) {
            Some(comments) => comments.push(comment),
            None => program.comments.push(comment),
        }
    }
}
