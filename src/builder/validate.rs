use crate::{
    ast::{
        ast::{BaseNode, Comment, Kind, Node, Program},
        expressions::Expression,
        statements::{AccessorKind, LValueNode, Step, StepKind},
    },
    errors::errors::{Error, ErrorImpl},
};

/// Reports each step holding a node nested deeper than `limit`, counting
/// steps and expressions the way the decoder does. Descent stops one level
/// past the limit, so arbitrarily deep trees are checked in bounded stack.
pub fn check_depth(program: &Program, limit: usize) -> Vec<Error> {
    let mut checker = DepthChecker { limit, errors: vec![] };

    for procedure in program.procedures.values() {
        checker.steps(&procedure.steps, 1);
        checker.steps(&procedure.error_handlers, 1);
    }
    for command in &program.commands {
        checker.steps(&command.steps, 1);
        checker.steps(&command.error_handlers, 1);
    }
    for event in &program.events {
        if too_deep(&event.event, 1, limit) {
            checker.report(&event.base);
        }
        checker.steps(&event.steps, 1);
        checker.steps(&event.error_handlers, 1);
    }

    checker.errors
}

fn too_deep(expression: &Expression, depth: usize, limit: usize) -> bool {
    depth > limit
        || expression
            .children()
            .into_iter()
            .any(|child| too_deep(child, depth + 1, limit))
}

/// Expressions read directly under a step, call arguments and index
/// accessors of assignment targets included.
fn step_expressions(step: &Step) -> Vec<&Expression> {
    let mut expressions = vec![];

    match &step.kind {
        StepKind::Set { targets, value } => {
            expressions.extend(targets.iter().flat_map(lvalue_indices));
            expressions.push(value);
        }
        StepKind::Call { call } => expressions.extend(&call.arguments),
        StepKind::Return { values } => expressions.extend(values),
        StepKind::Emit { value } | StepKind::Must { value } => expressions.push(value),
        StepKind::Fail { message } => expressions.extend(message),
        StepKind::Ask(ask) => {
            expressions.push(&ask.model);
            expressions.push(&ask.prompt);
            expressions.extend(&ask.options);
            expressions.extend(ask.target.iter().flat_map(lvalue_indices));
        }
        StepKind::PromptUser { prompt, target } => {
            expressions.push(prompt);
            expressions.extend(lvalue_indices(target));
        }
        StepKind::If { condition, .. } | StepKind::While { condition, .. } => {
            expressions.push(condition)
        }
        StepKind::For { collection, .. } => expressions.push(collection),
        StepKind::Expression { expression } => expressions.push(expression),
        StepKind::ClearError | StepKind::Continue | StepKind::Break | StepKind::OnError { .. } => {}
    }

    expressions
}

fn lvalue_indices(lvalue: &LValueNode) -> Vec<&Expression> {
    lvalue
        .accessors
        .iter()
        .filter_map(|accessor| match &accessor.kind {
            AccessorKind::Index(index) => Some(index),
            AccessorKind::Field(_) => None,
        })
        .collect()
}

struct DepthChecker {
    limit: usize,
    errors: Vec<Error>,
}

impl DepthChecker {
    fn report(&mut self, base: &BaseNode) {
        self.errors.push(Error::new(
            ErrorImpl::NestingTooDeep { limit: self.limit },
            base.start.clone(),
        ));
    }

    fn steps(&mut self, steps: &[Step], depth: usize) {
        for step in steps {
            if depth > self.limit {
                self.report(&step.base);
                continue;
            }

            let limit = self.limit;
            if step_expressions(step)
                .into_iter()
                .any(|expression| too_deep(expression, depth + 1, limit))
            {
                self.report(&step.base);
            }

            for block in step.blocks() {
                self.steps(block, depth + 1);
            }
        }
    }
}

/// Post-build check that every node carries a start position, a span that
/// does not run backwards, and the kind its type requires.
pub fn check_tags(program: &Program) -> Vec<Error> {
    let mut checker = TagChecker { errors: vec![] };
    checker.program(program);
    checker.errors
}

struct TagChecker {
    errors: Vec<Error>,
}

impl TagChecker {
    fn check(&mut self, base: &BaseNode, expected: Kind, node: &str) {
        let error = if !base.start.is_set() {
            ErrorImpl::MissingPosition {
                node: String::from(node),
            }
        } else if !base.start.precedes_or_equals(&base.end) {
            ErrorImpl::InvalidSpan {
                node: String::from(node),
            }
        } else if base.kind != expected {
            ErrorImpl::KindMismatch {
                node: String::from(node),
                kind: base.kind.to_string(),
            }
        } else {
            return;
        };

        self.errors.push(Error::new(error, base.start.clone()));
    }

    fn program(&mut self, program: &Program) {
        self.check(&program.base, Kind::Program, "program");
        self.comments(&program.comments);

        for procedure in program.procedures.values() {
            self.check(&procedure.base, Kind::Procedure, "procedure");
            self.comments(&procedure.comments);
            self.steps(&procedure.steps);
            self.steps(&procedure.error_handlers);
        }
        for command in &program.commands {
            self.check(&command.base, Kind::Command, "command");
            self.comments(&command.comments);
            self.steps(&command.steps);
            self.steps(&command.error_handlers);
        }
        for event in &program.events {
            self.check(&event.base, Kind::OnEvent, "event handler");
            self.comments(&event.comments);
            self.expression(&event.event);
            self.steps(&event.steps);
            self.steps(&event.error_handlers);
        }
    }

    fn comments(&mut self, comments: &[Comment]) {
        for comment in comments {
            self.check(&comment.base, Kind::Comment, "comment");
        }
    }

    fn steps(&mut self, steps: &[Step]) {
        for step in steps {
            self.step(step);
        }
    }

    fn step(&mut self, step: &Step) {
        let step_type = step.step_type();
        self.check(&step.base, step_type.kind(), step_type.as_str());
        self.comments(&step.comments);

        match &step.kind {
            StepKind::Set { targets, value } => {
                for target in targets {
                    self.lvalue(target);
                }
                self.expression(value);
            }
            StepKind::Call { call } => {
                self.check(&call.base, Kind::Callable, "call");
                for argument in &call.arguments {
                    self.expression(argument);
                }
            }
            StepKind::Return { values } => {
                for value in values {
                    self.expression(value);
                }
            }
            StepKind::Emit { value } | StepKind::Must { value } => self.expression(value),
            StepKind::Fail { message } => {
                if let Some(message) = message {
                    self.expression(message);
                }
            }
            StepKind::Ask(ask) => {
                self.expression(&ask.model);
                self.expression(&ask.prompt);
                if let Some(options) = &ask.options {
                    self.expression(options);
                }
                if let Some(target) = &ask.target {
                    self.lvalue(target);
                }
            }
            StepKind::PromptUser { prompt, target } => {
                self.expression(prompt);
                self.lvalue(target);
            }
            StepKind::If { condition, .. } | StepKind::While { condition, .. } => {
                self.expression(condition)
            }
            StepKind::For { collection, .. } => self.expression(collection),
            StepKind::Expression { expression } => self.expression(expression),
            StepKind::ClearError
            | StepKind::Continue
            | StepKind::Break
            | StepKind::OnError { .. } => {}
        }

        for block in step.blocks() {
            self.steps(block);
        }
    }

    fn lvalue(&mut self, lvalue: &LValueNode) {
        self.check(&lvalue.base, Kind::LValue, "assignment target");
        for accessor in &lvalue.accessors {
            self.check(&accessor.base, Kind::Accessor, "accessor");
            if let AccessorKind::Index(index) = &accessor.kind {
                self.expression(index);
            }
        }
    }

    fn expression(&mut self, expression: &Expression) {
        let kind = expression.expected_kind();
        self.check(expression.base(), kind, &kind.to_string());

        if let Expression::MapLiteral(map) = expression {
            for entry in &map.entries {
                self.check(&entry.base, Kind::MapEntry, "map entry");
            }
        }

        for child in expression.children() {
            self.expression(child);
        }
    }
}
