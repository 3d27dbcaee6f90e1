//! Decode a Program from bytes.

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

use crate::{
    ast::{
        ast::{BaseNode, CommandNode, Comment, Kind, Metadata, OnEventDecl, Procedure, Program},
        expressions::{
            BinaryExpr, BooleanExpr, CallTarget, CallableExpr, ElementAccessExpr, ErrorMarkerExpr,
            EvalExpr, Expression, LastResultExpr, ListExpr, MapEntryNode, MapExpr, NilExpr,
            Number, NumberExpr, PlaceholderExpr, StringExpr, TypeOfExpr, UnaryExpr, VariableExpr,
        },
        statements::{AccessorKind, AccessorNode, AskStmt, LValueNode, Step, StepKind},
    },
    Position,
};

use super::{
    encode::{
        ACCESSOR_FIELD, ACCESSOR_INDEX, FLAG_POSITIONS, MAGIC, NUMBER_FLOAT, NUMBER_INT, VERSION,
    },
    registry,
};

/// Deepest step/expression nesting the decoder follows; the builder rejects
/// trees past it. Sized so a full-depth decode fits a 2 MiB thread stack.
pub const MAX_DEPTH: usize = 400;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid magic header")]
    InvalidMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("unexpected end of data")]
    UnexpectedEnd,
    #[error("unknown node type id 0x{0:02x}")]
    UnknownType(u8),
    #[error("{kind} node has {found} field(s), expected {expected}")]
    FieldArity {
        kind: Kind,
        expected: usize,
        found: usize,
    },
    #[error("expected {expected} node, found {found}")]
    UnexpectedNode { expected: &'static str, found: Kind },
    #[error("invalid {what} tag: 0x{tag:02x}")]
    InvalidTag { what: &'static str, tag: u8 },
    #[error("invalid UTF-8 string data")]
    InvalidUtf8,
    #[error("{0} trailing byte(s) after the program")]
    TrailingBytes(usize),
    #[error("nodes nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("procedure {0:?} is defined twice")]
    DuplicateProcedure(String),
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    positions: bool,
    file: Arc<str>,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            positions: false,
            file: Arc::from("<null>"),
            depth: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEnd);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::InvalidTag {
                what: "boolean",
                tag,
            }),
        }
    }

    /// A presence byte for optional fields.
    fn read_present(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::InvalidTag {
                what: "presence",
                tag,
            }),
        }
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Element count of a list or map. Every element takes at least one
    /// byte, so a count past the end of the data is already truncated.
    fn read_count(&mut self) -> Result<usize, DecodeError> {
        let count = self.read_u32()? as usize;
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(count)
    }

    fn list<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let count = self.read_count()?;
        let mut items = vec![];
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    fn optional<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        if self.read_present()? {
            Ok(Some(read(self)?))
        } else {
            Ok(None)
        }
    }

    fn strings(&mut self) -> Result<Vec<String>, DecodeError> {
        self.list(Self::read_string)
    }

    fn metadata(&mut self) -> Result<Metadata, DecodeError> {
        let count = self.read_count()?;
        let mut metadata = BTreeMap::new();
        for _ in 0..count {
            let key = self.read_string()?;
            let value = self.read_string()?;
            metadata.insert(key, value);
        }
        Ok(metadata)
    }

    fn position(&mut self) -> Result<Position, DecodeError> {
        let line = self.read_u32()?;
        let column = self.read_u32()?;
        let offset = self.read_u32()?;
        Ok(Position::new(offset, line, column, Arc::clone(&self.file)))
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(DecodeError::NestingTooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Type id, checked field count and (when enabled) the span.
    fn header(&mut self) -> Result<(Kind, BaseNode), DecodeError> {
        let id = self.read_u8()?;
        let schema = registry::schema_by_id(id).ok_or(DecodeError::UnknownType(id))?;

        let found = self.read_u8()? as usize;
        if found != schema.field_count() {
            return Err(DecodeError::FieldArity {
                kind: schema.kind,
                expected: schema.field_count(),
                found,
            });
        }

        let (start, end) = if self.positions {
            (self.position()?, self.position()?)
        } else {
            (Position::null(), Position::null())
        };

        Ok((schema.kind, BaseNode::new(schema.kind, start, end)))
    }

    fn expect_header(&mut self, expected: Kind) -> Result<BaseNode, DecodeError> {
        let (kind, base) = self.header()?;
        if kind != expected {
            let name = registry::schema(expected).map_or("<unknown>", |schema| schema.name);
            return Err(DecodeError::UnexpectedNode {
                expected: name,
                found: kind,
            });
        }
        Ok(base)
    }

    fn comment(&mut self) -> Result<Comment, DecodeError> {
        let base = self.expect_header(Kind::Comment)?;
        Ok(Comment {
            base,
            text: self.read_string()?,
        })
    }

    fn comments(&mut self) -> Result<Vec<Comment>, DecodeError> {
        self.list(Self::comment)
    }

    fn program(&mut self) -> Result<Program, DecodeError> {
        let base = self.expect_header(Kind::Program)?;

        let mut procedures = BTreeMap::new();
        for procedure in self.list(Self::procedure)? {
            if procedures.contains_key(&procedure.name) {
                return Err(DecodeError::DuplicateProcedure(procedure.name));
            }
            procedures.insert(procedure.name.clone(), procedure);
        }

        Ok(Program {
            base,
            procedures,
            commands: self.list(Self::command)?,
            events: self.list(Self::event)?,
            metadata: self.metadata()?,
            comments: self.comments()?,
        })
    }

    fn procedure(&mut self) -> Result<Procedure, DecodeError> {
        let base = self.expect_header(Kind::Procedure)?;
        Ok(Procedure {
            base,
            name: self.read_string()?,
            required_params: self.strings()?,
            optional_params: self.strings()?,
            return_params: self.strings()?,
            metadata: self.metadata()?,
            steps: self.steps()?,
            error_handlers: self.steps()?,
            comments: self.comments()?,
        })
    }

    fn command(&mut self) -> Result<CommandNode, DecodeError> {
        let base = self.expect_header(Kind::Command)?;
        Ok(CommandNode {
            base,
            metadata: self.metadata()?,
            steps: self.steps()?,
            error_handlers: self.steps()?,
            comments: self.comments()?,
        })
    }

    fn event(&mut self) -> Result<OnEventDecl, DecodeError> {
        let base = self.expect_header(Kind::OnEvent)?;
        Ok(OnEventDecl {
            base,
            event: self.expression()?,
            handler_name: self.optional(Self::read_string)?,
            bound_var: self.optional(Self::read_string)?,
            steps: self.steps()?,
            error_handlers: self.steps()?,
            comments: self.comments()?,
        })
    }

    fn steps(&mut self) -> Result<Vec<Step>, DecodeError> {
        self.list(Self::step)
    }

    fn step(&mut self) -> Result<Step, DecodeError> {
        self.enter()?;
        let (kind, base) = self.header()?;

        let read: fn(&mut Self) -> Result<StepKind, DecodeError> = match kind {
            Kind::Set => Self::set_step,
            Kind::Call => Self::call_step,
            Kind::Return => Self::return_step,
            Kind::Emit => Self::emit_step,
            Kind::Must => Self::must_step,
            Kind::Fail => Self::fail_step,
            Kind::Ask => Self::ask_step,
            Kind::PromptUser => Self::promptuser_step,
            Kind::ClearError => |_| Ok(StepKind::ClearError),
            Kind::Continue => |_| Ok(StepKind::Continue),
            Kind::Break => |_| Ok(StepKind::Break),
            Kind::If => Self::if_step,
            Kind::For => Self::for_step,
            Kind::While => Self::while_step,
            Kind::OnError => Self::on_error_step,
            Kind::ExpressionStatement => Self::expression_step,
            found => {
                return Err(DecodeError::UnexpectedNode {
                    expected: "step",
                    found,
                })
            }
        };

        let step = Step {
            base,
            kind: read(self)?,
            comments: self.comments()?,
        };
        self.leave();
        Ok(step)
    }

    // One reader per node kind keeps the recursive frames small.

    #[inline(never)]
    fn set_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::Set {
            targets: self.list(Self::lvalue)?,
            value: self.expression()?,
        })
    }

    #[inline(never)]
    fn call_step(&mut self) -> Result<StepKind, DecodeError> {
        let base = self.expect_header(Kind::Callable)?;
        Ok(StepKind::Call {
            call: self.callable(base)?,
        })
    }

    #[inline(never)]
    fn return_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::Return {
            values: self.expressions()?,
        })
    }

    #[inline(never)]
    fn emit_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::Emit {
            value: self.expression()?,
        })
    }

    #[inline(never)]
    fn must_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::Must {
            value: self.expression()?,
        })
    }

    #[inline(never)]
    fn fail_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::Fail {
            message: self.optional(Self::expression)?,
        })
    }

    #[inline(never)]
    fn ask_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::Ask(AskStmt {
            model: self.expression()?,
            prompt: self.expression()?,
            options: self.optional(Self::expression)?,
            target: self.optional(Self::lvalue)?,
        }))
    }

    #[inline(never)]
    fn promptuser_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::PromptUser {
            prompt: self.expression()?,
            target: self.lvalue()?,
        })
    }

    #[inline(never)]
    fn if_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::If {
            condition: self.expression()?,
            body: self.steps()?,
            else_body: self.optional(Self::steps)?,
        })
    }

    #[inline(never)]
    fn for_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::For {
            variable: self.read_string()?,
            collection: self.expression()?,
            body: self.steps()?,
        })
    }

    #[inline(never)]
    fn while_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::While {
            condition: self.expression()?,
            body: self.steps()?,
        })
    }

    #[inline(never)]
    fn on_error_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::OnError {
            body: self.steps()?,
        })
    }

    #[inline(never)]
    fn expression_step(&mut self) -> Result<StepKind, DecodeError> {
        Ok(StepKind::Expression {
            expression: self.expression()?,
        })
    }

    fn lvalue(&mut self) -> Result<LValueNode, DecodeError> {
        let base = self.expect_header(Kind::LValue)?;
        Ok(LValueNode {
            base,
            identifier: self.read_string()?,
            accessors: self.list(Self::accessor)?,
        })
    }

    fn accessor(&mut self) -> Result<AccessorNode, DecodeError> {
        let base = self.expect_header(Kind::Accessor)?;
        let kind = match self.read_u8()? {
            ACCESSOR_FIELD => AccessorKind::Field(self.read_string()?),
            ACCESSOR_INDEX => AccessorKind::Index(self.expression()?),
            tag => {
                return Err(DecodeError::InvalidTag {
                    what: "accessor",
                    tag,
                })
            }
        };
        Ok(AccessorNode { base, kind })
    }

    fn expressions(&mut self) -> Result<Vec<Expression>, DecodeError> {
        self.list(Self::expression)
    }

    fn callable(&mut self, base: BaseNode) -> Result<CallableExpr, DecodeError> {
        let is_tool = self.read_bool()?;
        let name = self.read_string()?;
        Ok(CallableExpr {
            base,
            target: CallTarget { is_tool, name },
            arguments: self.expressions()?,
        })
    }

    fn map_entry(&mut self) -> Result<MapEntryNode, DecodeError> {
        let base = self.expect_header(Kind::MapEntry)?;
        Ok(MapEntryNode {
            base,
            key: self.read_string()?,
            value: self.expression()?,
        })
    }

    fn number(&mut self) -> Result<Number, DecodeError> {
        match self.read_u8()? {
            NUMBER_INT => Ok(Number::Int(i64::from_le_bytes(self.read_array()?))),
            NUMBER_FLOAT => Ok(Number::Float(f64::from_le_bytes(self.read_array()?))),
            tag => Err(DecodeError::InvalidTag {
                what: "number",
                tag,
            }),
        }
    }

    fn expression(&mut self) -> Result<Expression, DecodeError> {
        self.enter()?;
        let (kind, base) = self.header()?;

        let read: fn(&mut Self, BaseNode) -> Result<Expression, DecodeError> = match kind {
            Kind::Variable => Self::variable,
            Kind::NumberLiteral => Self::number_literal,
            Kind::StringLiteral => Self::string_literal,
            Kind::BooleanLiteral => Self::boolean_literal,
            Kind::NilLiteral => |_, base| Ok(Expression::NilLiteral(NilExpr { base })),
            Kind::ListLiteral => Self::list_literal,
            Kind::MapLiteral => Self::map_literal,
            Kind::UnaryOp => Self::unary_op,
            Kind::BinaryOp => Self::binary_op,
            Kind::ElementAccess => Self::element_access,
            Kind::Callable => Self::callable_expression,
            Kind::TypeOf => Self::type_of,
            Kind::Eval => Self::eval,
            Kind::Placeholder => Self::placeholder,
            Kind::LastResult => |_, base| Ok(Expression::LastResult(LastResultExpr { base })),
            Kind::ErrorMarker => Self::error_marker,
            found => {
                return Err(DecodeError::UnexpectedNode {
                    expected: "expression",
                    found,
                })
            }
        };

        let expression = read(self, base)?;
        self.leave();
        Ok(expression)
    }

    #[inline(never)]
    fn variable(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::Variable(VariableExpr {
            base,
            name: self.read_string()?,
        }))
    }

    #[inline(never)]
    fn number_literal(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::NumberLiteral(NumberExpr {
            base,
            value: self.number()?,
        }))
    }

    #[inline(never)]
    fn string_literal(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::StringLiteral(StringExpr {
            base,
            value: self.read_string()?,
            is_raw: self.read_bool()?,
        }))
    }

    #[inline(never)]
    fn boolean_literal(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::BooleanLiteral(BooleanExpr {
            base,
            value: self.read_bool()?,
        }))
    }

    #[inline(never)]
    fn list_literal(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::ListLiteral(ListExpr {
            base,
            elements: self.expressions()?,
        }))
    }

    #[inline(never)]
    fn map_literal(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::MapLiteral(MapExpr {
            base,
            entries: self.list(Self::map_entry)?,
        }))
    }

    #[inline(never)]
    fn unary_op(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        let operator = self.read_string()?;
        let operand = Box::new(self.expression()?);
        Ok(Expression::UnaryOp(UnaryExpr {
            base,
            operator,
            operand,
        }))
    }

    #[inline(never)]
    fn binary_op(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        let left = Box::new(self.expression()?);
        let operator = self.read_string()?;
        let right = Box::new(self.expression()?);
        Ok(Expression::BinaryOp(BinaryExpr {
            base,
            left,
            operator,
            right,
        }))
    }

    #[inline(never)]
    fn element_access(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        let collection = Box::new(self.expression()?);
        let accessor = Box::new(self.expression()?);
        Ok(Expression::ElementAccess(ElementAccessExpr {
            base,
            collection,
            accessor,
        }))
    }

    #[inline(never)]
    fn callable_expression(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::Callable(self.callable(base)?))
    }

    #[inline(never)]
    fn type_of(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        let operand = Box::new(self.expression()?);
        Ok(Expression::TypeOf(TypeOfExpr { base, operand }))
    }

    #[inline(never)]
    fn eval(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        let source = Box::new(self.expression()?);
        Ok(Expression::Eval(EvalExpr { base, source }))
    }

    #[inline(never)]
    fn placeholder(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::Placeholder(PlaceholderExpr {
            base,
            name: self.read_string()?,
        }))
    }

    #[inline(never)]
    fn error_marker(&mut self, base: BaseNode) -> Result<Expression, DecodeError> {
        Ok(Expression::ErrorMarker(ErrorMarkerExpr {
            base,
            message: self.read_string()?,
        }))
    }
}

/// Decodes bytes produced by [`super::encode::encode`]. Any defect in the
/// input fails the whole decode.
pub fn decode(bytes: &[u8]) -> Result<Program, DecodeError> {
    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::InvalidMagic);
    }

    let mut decoder = Decoder::new(&bytes[MAGIC.len()..]);

    let version = decoder.read_u8()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let flags = decoder.read_u8()?;
    if flags & !FLAG_POSITIONS != 0 {
        return Err(DecodeError::InvalidTag {
            what: "flags",
            tag: flags,
        });
    }
    if flags & FLAG_POSITIONS != 0 {
        decoder.positions = true;
        decoder.file = Arc::from(decoder.read_string()?);
    }

    let program = decoder.program()?;

    let trailing = decoder.remaining();
    if trailing > 0 {
        return Err(DecodeError::TrailingBytes(trailing));
    }

    debug!(
        "Decoded program: {} procedure(s), {} command(s), {} event handler(s)",
        program.procedures.len(),
        program.commands.len(),
        program.events.len()
    );
    Ok(program)
}
