use crate::{
    ast::{
        ast::{BaseNode, CommandNode, Comment, Kind, Metadata, Node, OnEventDecl, Procedure, Program},
        expressions::{CallableExpr, Expression, MapEntryNode, Number},
        statements::{AccessorKind, AccessorNode, LValueNode, Step, StepKind},
    },
    Position,
};

use super::registry::field_count;

pub const MAGIC: [u8; 4] = *b"NSAB";
pub const VERSION: u8 = 1;

/// Header flag: every node carries its start and end position.
pub const FLAG_POSITIONS: u8 = 0x01;

pub const NUMBER_INT: u8 = 0x00;
pub const NUMBER_FLOAT: u8 = 0x01;

pub const ACCESSOR_FIELD: u8 = 0x00;
pub const ACCESSOR_INDEX: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Keep source positions (and the source name) in the output.
    pub include_positions: bool,
}

/// Encodes `program` without positions.
pub fn encode(program: &Program) -> Vec<u8> {
    encode_with_options(program, EncodeOptions::default())
}

pub fn encode_with_options(program: &Program, options: EncodeOptions) -> Vec<u8> {
    let mut encoder = Encoder {
        buf: Vec::with_capacity(256),
        positions: options.include_positions,
    };

    encoder.buf.extend_from_slice(&MAGIC);
    encoder.write_u8(VERSION);

    if options.include_positions {
        encoder.write_u8(FLAG_POSITIONS);
        encoder.write_str(&program.base.start.file);
    } else {
        encoder.write_u8(0);
    }

    encoder.program(program);

    debug!("Encoded program into {} bytes", encoder.buf.len());
    encoder.buf
}

struct Encoder {
    buf: Vec<u8>,
    positions: bool,
}

impl Encoder {
    fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn write_len(&mut self, len: usize) {
        self.write_u32(len as u32);
    }

    fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn write_strings(&mut self, values: &[String]) {
        self.write_len(values.len());
        for value in values {
            self.write_str(value);
        }
    }

    fn write_optional_str(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.write_u8(1);
                self.write_str(value);
            }
            None => self.write_u8(0),
        }
    }

    fn position(&mut self, position: &Position) {
        self.write_u32(position.line);
        self.write_u32(position.column);
        self.write_u32(position.offset);
    }

    /// Type id and field count, then the span when positions are on.
    fn header(&mut self, kind: Kind, base: &BaseNode) {
        self.write_u8(kind.id());
        self.write_u8(field_count(kind));
        if self.positions {
            self.position(&base.start);
            self.position(&base.end);
        }
    }

    fn metadata(&mut self, metadata: &Metadata) {
        self.write_len(metadata.len());
        for (key, value) in metadata {
            self.write_str(key);
            self.write_str(value);
        }
    }

    fn comments(&mut self, comments: &[Comment]) {
        self.write_len(comments.len());
        for comment in comments {
            self.header(Kind::Comment, &comment.base);
            self.write_str(&comment.text);
        }
    }

    fn program(&mut self, program: &Program) {
        self.header(Kind::Program, &program.base);

        self.write_len(program.procedures.len());
        for procedure in program.procedures.values() {
            self.procedure(procedure);
        }

        self.write_len(program.commands.len());
        for command in &program.commands {
            self.command(command);
        }

        self.write_len(program.events.len());
        for event in &program.events {
            self.event(event);
        }

        self.metadata(&program.metadata);
        self.comments(&program.comments);
    }

    fn procedure(&mut self, procedure: &Procedure) {
        self.header(Kind::Procedure, &procedure.base);
        self.write_str(&procedure.name);
        self.write_strings(&procedure.required_params);
        self.write_strings(&procedure.optional_params);
        self.write_strings(&procedure.return_params);
        self.metadata(&procedure.metadata);
        self.steps(&procedure.steps);
        self.steps(&procedure.error_handlers);
        self.comments(&procedure.comments);
    }

    fn command(&mut self, command: &CommandNode) {
        self.header(Kind::Command, &command.base);
        self.metadata(&command.metadata);
        self.steps(&command.steps);
        self.steps(&command.error_handlers);
        self.comments(&command.comments);
    }

    fn event(&mut self, event: &OnEventDecl) {
        self.header(Kind::OnEvent, &event.base);
        self.expression(&event.event);
        self.write_optional_str(event.handler_name.as_deref());
        self.write_optional_str(event.bound_var.as_deref());
        self.steps(&event.steps);
        self.steps(&event.error_handlers);
        self.comments(&event.comments);
    }

    fn steps(&mut self, steps: &[Step]) {
        self.write_len(steps.len());
        for step in steps {
            self.step(step);
        }
    }

    fn step(&mut self, step: &Step) {
        self.header(step.step_type().kind(), &step.base);

        match &step.kind {
            StepKind::Set { targets, value } => {
                self.write_len(targets.len());
                for target in targets {
                    self.lvalue(target);
                }
                self.expression(value);
            }
            StepKind::Call { call } => self.callable(call),
            StepKind::Return { values } => self.expressions(values),
            StepKind::Emit { value } | StepKind::Must { value } => self.expression(value),
            StepKind::Fail { message } => self.optional_expression(message.as_ref()),
            StepKind::Ask(ask) => {
                self.expression(&ask.model);
                self.expression(&ask.prompt);
                self.optional_expression(ask.options.as_ref());
                match &ask.target {
                    Some(target) => {
                        self.write_u8(1);
                        self.lvalue(target);
                    }
                    None => self.write_u8(0),
                }
            }
            StepKind::PromptUser { prompt, target } => {
                self.expression(prompt);
                self.lvalue(target);
            }
            StepKind::ClearError | StepKind::Continue | StepKind::Break => {}
            StepKind::If {
                condition,
                body,
                else_body,
            } => {
                self.expression(condition);
                self.steps(body);
                match else_body {
                    Some(else_body) => {
                        self.write_u8(1);
                        self.steps(else_body);
                    }
                    None => self.write_u8(0),
                }
            }
            StepKind::For {
                variable,
                collection,
                body,
            } => {
                self.write_str(variable);
                self.expression(collection);
                self.steps(body);
            }
            StepKind::While { condition, body } => {
                self.expression(condition);
                self.steps(body);
            }
            StepKind::OnError { body } => self.steps(body),
            StepKind::Expression { expression } => self.expression(expression),
        }

        self.comments(&step.comments);
    }

    fn lvalue(&mut self, lvalue: &LValueNode) {
        self.header(Kind::LValue, &lvalue.base);
        self.write_str(&lvalue.identifier);
        self.write_len(lvalue.accessors.len());
        for accessor in &lvalue.accessors {
            self.accessor(accessor);
        }
    }

    fn accessor(&mut self, accessor: &AccessorNode) {
        self.header(Kind::Accessor, &accessor.base);
        match &accessor.kind {
            AccessorKind::Field(name) => {
                self.write_u8(ACCESSOR_FIELD);
                self.write_str(name);
            }
            AccessorKind::Index(index) => {
                self.write_u8(ACCESSOR_INDEX);
                self.expression(index);
            }
        }
    }

    fn expressions(&mut self, expressions: &[Expression]) {
        self.write_len(expressions.len());
        for expression in expressions {
            self.expression(expression);
        }
    }

    fn optional_expression(&mut self, expression: Option<&Expression>) {
        match expression {
            Some(expression) => {
                self.write_u8(1);
                self.expression(expression);
            }
            None => self.write_u8(0),
        }
    }

    fn callable(&mut self, call: &CallableExpr) {
        self.header(Kind::Callable, &call.base);
        self.write_bool(call.target.is_tool);
        self.write_str(&call.target.name);
        self.expressions(&call.arguments);
    }

    fn map_entry(&mut self, entry: &MapEntryNode) {
        self.header(Kind::MapEntry, &entry.base);
        self.write_str(&entry.key);
        self.expression(&entry.value);
    }

    fn expression(&mut self, expression: &Expression) {
        if let Expression::Callable(call) = expression {
            return self.callable(call);
        }

        self.header(expression.expected_kind(), expression.base());

        match expression {
            Expression::Variable(e) => self.write_str(&e.name),
            Expression::NumberLiteral(e) => match e.value {
                Number::Int(value) => {
                    self.write_u8(NUMBER_INT);
                    self.buf.extend_from_slice(&value.to_le_bytes());
                }
                Number::Float(value) => {
                    self.write_u8(NUMBER_FLOAT);
                    self.buf.extend_from_slice(&value.to_le_bytes());
                }
            },
            Expression::StringLiteral(e) => {
                self.write_str(&e.value);
                self.write_bool(e.is_raw);
            }
            Expression::BooleanLiteral(e) => self.write_bool(e.value),
            Expression::NilLiteral(_) | Expression::LastResult(_) => {}
            Expression::ListLiteral(e) => self.expressions(&e.elements),
            Expression::MapLiteral(e) => {
                self.write_len(e.entries.len());
                for entry in &e.entries {
                    self.map_entry(entry);
                }
            }
            Expression::UnaryOp(e) => {
                self.write_str(&e.operator);
                self.expression(&e.operand);
            }
            Expression::BinaryOp(e) => {
                self.expression(&e.left);
                self.write_str(&e.operator);
                self.expression(&e.right);
            }
            Expression::ElementAccess(e) => {
                self.expression(&e.collection);
                self.expression(&e.accessor);
            }
            Expression::TypeOf(e) => self.expression(&e.operand),
            Expression::Eval(e) => self.expression(&e.source),
            Expression::Placeholder(e) => self.write_str(&e.name),
            Expression::ErrorMarker(e) => self.write_str(&e.message),
            Expression::Callable(_) => {}
        }
    }
}
