use thiserror::Error;

use crate::{
    ast::{
        expressions::{Expression, MapEntryNode},
        statements::{LValueNode, Step},
    },
    parser::tree::BlockKind,
};

/// Intermediate results waiting for a parent rule to consume them.
#[derive(Debug, Clone, PartialEq)]
pub enum StackValue {
    Expr(Expression),
    Steps(Vec<Step>),
    Names(Vec<String>),
    LValue(LValueNode),
    LValues(Vec<LValueNode>),
    MapEntry(MapEntryNode),
}

impl StackValue {
    pub fn describe(&self) -> &'static str {
        match self {
            StackValue::Expr(_) => "expression",
            StackValue::Steps(_) => "step list",
            StackValue::Names(_) => "name list",
            StackValue::LValue(_) => "assignment target",
            StackValue::LValues(_) => "assignment target list",
            StackValue::MapEntry(_) => "map entry",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StackError {
    #[error("value stack underflow: expected {expected}")]
    Underflow { expected: &'static str },
    #[error("expected {expected} on the value stack, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Default)]
pub struct ValueStack {
    items: Vec<StackValue>,
}

macro_rules! typed_pop {
    ($name:ident, $many:ident, $variant:ident, $ty:ty, $what:literal) => {
        pub fn $name(&mut self) -> Result<$ty, StackError> {
            match self.items.pop() {
                Some(StackValue::$variant(value)) => Ok(value),
                Some(other) => {
                    let found = other.describe();
                    self.items.push(other);
                    Err(StackError::TypeMismatch {
                        expected: $what,
                        found,
                    })
                }
                None => Err(StackError::Underflow { expected: $what }),
            }
        }

        /// Pops `n` values in source order. Nothing is consumed on failure.
        pub fn $many(&mut self, n: usize) -> Result<Vec<$ty>, StackError> {
            let items = self
                .pop_n(n)
                .ok_or(StackError::Underflow { expected: $what })?;

            if let Some(other) = items
                .iter()
                .find(|item| !matches!(item, StackValue::$variant(_)))
            {
                let found = other.describe();
                self.items.extend(items);
                return Err(StackError::TypeMismatch {
                    expected: $what,
                    found,
                });
            }

            Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    StackValue::$variant(value) => Some(value),
                    _ => None,
                })
                .collect())
        }
    };
}

impl ValueStack {
    pub fn new() -> Self {
        ValueStack::default()
    }

    pub fn push(&mut self, value: StackValue) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Option<StackValue> {
        self.items.pop()
    }

    /// The top `n` values in the order they were pushed, or `None` (with
    /// the stack untouched) when fewer than `n` are available.
    pub fn pop_n(&mut self, n: usize) -> Option<Vec<StackValue>> {
        if n > self.items.len() {
            return None;
        }
        let at = self.items.len() - n;
        Some(self.items.split_off(at))
    }

    pub fn peek(&self) -> Option<&StackValue> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    typed_pop!(pop_expr, pop_exprs, Expr, Expression, "expression");
    typed_pop!(pop_steps, pop_step_lists, Steps, Vec<Step>, "step list");
    typed_pop!(pop_names, pop_name_lists, Names, Vec<String>, "name list");
    typed_pop!(pop_lvalue, pop_lvalue_many, LValue, LValueNode, "assignment target");
    typed_pop!(
        pop_lvalues,
        pop_lvalue_lists,
        LValues,
        Vec<LValueNode>,
        "assignment target list"
    );
    typed_pop!(pop_map_entry, pop_map_entries, MapEntry, MapEntryNode, "map entry");
}

/// Step lists under construction, innermost last.
#[derive(Debug, Default)]
pub struct BlockStack {
    frames: Vec<(BlockKind, Vec<Step>)>,
}

impl BlockStack {
    pub fn new() -> Self {
        BlockStack::default()
    }

    /// Installs a fresh, empty current list.
    pub fn enter(&mut self, kind: BlockKind) {
        self.frames.push((kind, vec![]));
    }

    /// Removes the current list, making the enclosing one current again.
    pub fn exit(&mut self) -> Option<(BlockKind, Vec<Step>)> {
        self.frames.pop()
    }

    /// Appends to the current list; `false` when no block is open.
    pub fn append(&mut self, step: Step) -> bool {
        match self.frames.last_mut() {
            Some((_, steps)) => {
                steps.push(step);
                true
            }
            None => false,
        }
    }

    pub fn current_kind(&self) -> Option<BlockKind> {
        self.frames.last().map(|(kind, _)| *kind)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
