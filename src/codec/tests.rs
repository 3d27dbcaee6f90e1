//! Unit tests for the binary codec.

use std::collections::HashSet;

use super::{
    decode::MAX_DEPTH,
    encode::{FLAG_POSITIONS, MAGIC, VERSION},
    registry::{schema, REGISTRY},
    *,
};
use crate::{
    ast::{
        ast::{BaseNode, Kind, Program},
        expressions::{Expression, NilExpr, UnaryExpr},
        statements::{Step, StepKind},
    },
    builder::BuildOptions,
    compile_source,
};

const SOURCE: &str = r#":: title: Codec demo
# leading comment
func greet(needs name optional greeting returns text) means
:: purpose: say hello
  set text, parts[0].first = greeting + ", " + name # trailing
  if typeof name == "string" and not no name
    emit {"who": name, "n": [1, 2.5, -3]}
  else if some greeting
    ask "model", {{template}} with {"t": 0.5} into answer
  else
    fail
  endif
  for each item in items
    call tool.store.put(item, last)
    continue
  endfor
  on error do
    clear_error
  endon
  return text
endfunc

command
  promptuser "who?" into who
  call greet(who)
  must eval(```1 + 1```)
endcommand

on event "tick" named "ticker" as payload do
  while payload ** 2 < 10
    break
  endwhile
endon
"#;

fn build(source: &str) -> Program {
    let compilation = compile_source(source, Some("demo.ns".to_string()), &BuildOptions::default())
        .unwrap();
    compilation.result.unwrap();
    compilation.program
}

#[test]
fn test_registry_covers_every_kind() {
    let mut ids = HashSet::new();
    for kind in Kind::ALL {
        let schema = schema(kind).unwrap();
        assert_eq!(schema.kind, kind);
        assert!(ids.insert(kind.id()));
    }
    assert_eq!(REGISTRY.len(), Kind::ALL.len());
    assert!(schema(Kind::Untagged).is_none());
}

#[test]
fn test_header() {
    let bytes = encode(&build("command\n  emit 1\nendcommand\n"));
    assert_eq!(&bytes[..4], &MAGIC);
    assert_eq!(bytes[4], VERSION);
    assert_eq!(bytes[5], 0);
    assert_eq!(bytes[6], Kind::Program.id());
    assert_eq!(bytes[7], 5);
}

#[test]
fn test_round_trip() {
    let program = build(SOURCE);
    let decoded = decode(&encode(&program)).unwrap();

    assert_eq!(decoded, program);
    assert_eq!(decoded.comment_count(), 2);
    assert_eq!(decoded.metadata["title"], "Codec demo");
    assert_eq!(decoded.procedures["greet"].metadata["purpose"], "say hello");
    assert_eq!(decoded.procedures["greet"].error_handlers.len(), 1);
}

#[test]
fn test_round_trip_keeps_kinds() {
    let decoded = decode(&encode(&build(SOURCE))).unwrap();
    let procedure = &decoded.procedures["greet"];

    assert_eq!(decoded.base.kind, Kind::Program);
    assert_eq!(procedure.base.kind, Kind::Procedure);
    assert_eq!(procedure.steps[0].base.kind, Kind::Set);
    assert!(!procedure.base.start.is_set());
}

#[test]
fn test_round_trip_with_positions() {
    let program = build(SOURCE);
    let options = EncodeOptions {
        include_positions: true,
    };
    let bytes = encode_with_options(&program, options);
    assert_eq!(bytes[5], FLAG_POSITIONS);

    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded, program);

    let original = &program.procedures["greet"];
    let restored = &decoded.procedures["greet"];
    assert_eq!(restored.base.start, original.base.start);
    assert_eq!(restored.base.end, original.base.end);
    assert_eq!(restored.steps[0].base.end, original.steps[0].base.end);
    assert_eq!(&*restored.base.start.file, "demo.ns");
    assert_eq!(restored.comments[0].base.start.line, 2);
}

#[test]
fn test_numbers_keep_their_type() {
    let program = build("func f means\n  return 2, 2.0\nendfunc\n");
    let decoded = decode(&encode(&program)).unwrap();

    let StepKind::Return { values } = &decoded.procedures["f"].steps[0].kind else {
        panic!("expected a return step");
    };
    assert_eq!(values[0].to_string(), "2");
    assert_eq!(values[1].to_string(), "2.0");
}

#[test]
fn test_invalid_magic() {
    assert_eq!(decode(b"NSA"), Err(DecodeError::InvalidMagic));
    assert_eq!(decode(b"XXXX\x01\x00"), Err(DecodeError::InvalidMagic));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = encode(&build(SOURCE));
    bytes[4] = 9;
    assert_eq!(decode(&bytes), Err(DecodeError::UnsupportedVersion(9)));
}

#[test]
fn test_unknown_flags() {
    let mut bytes = encode(&build(SOURCE));
    bytes[5] = 0x80;
    assert!(matches!(
        decode(&bytes),
        Err(DecodeError::InvalidTag { what: "flags", .. })
    ));
}

#[test]
fn test_every_truncation_fails() {
    let bytes = encode(&build(SOURCE));
    for len in 0..bytes.len() {
        assert!(decode(&bytes[..len]).is_err(), "prefix of {} bytes decoded", len);
    }
}

#[test]
fn test_trailing_bytes() {
    let mut bytes = encode(&build(SOURCE));
    bytes.push(0);
    assert_eq!(decode(&bytes), Err(DecodeError::TrailingBytes(1)));
}

#[test]
fn test_unknown_type_id() {
    let mut bytes = encode(&build(SOURCE));
    bytes[6] = 0x7f;
    assert_eq!(decode(&bytes), Err(DecodeError::UnknownType(0x7f)));
}

#[test]
fn test_field_arity_mismatch() {
    let mut bytes = encode(&build(SOURCE));
    bytes[7] = 4;
    assert_eq!(
        decode(&bytes),
        Err(DecodeError::FieldArity {
            kind: Kind::Program,
            expected: 5,
            found: 4,
        })
    );
}

#[test]
fn test_unexpected_node() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&[VERSION, 0, Kind::Comment.id(), 1]);
    assert_eq!(
        decode(&bytes),
        Err(DecodeError::UnexpectedNode {
            expected: "program",
            found: Kind::Comment,
        })
    );
}

#[test]
fn test_invalid_utf8() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&[VERSION, FLAG_POSITIONS, 2, 0, 0, 0, 0xff, 0xfe]);
    assert_eq!(decode(&bytes), Err(DecodeError::InvalidUtf8));
}

#[test]
fn test_nesting_limit() {
    let emit_nested = |unary_ops: usize| {
        let mut expression = Expression::NilLiteral(NilExpr {
            base: BaseNode::default(),
        });
        for _ in 0..unary_ops {
            expression = Expression::UnaryOp(UnaryExpr {
                base: BaseNode::default(),
                operator: String::from("-"),
                operand: Box::new(expression),
            });
        }

        let mut program = build("command\n  emit 1\nendcommand\n");
        program.commands[0].steps = vec![Step::new(StepKind::Emit { value: expression })];
        program
    };

    // The step is level one and nil sits below the last unary op.
    let deepest = emit_nested(MAX_DEPTH - 2);
    assert_eq!(decode(&encode(&deepest)), Ok(deepest));

    assert_eq!(
        decode(&encode(&emit_nested(MAX_DEPTH))),
        Err(DecodeError::NestingTooDeep(MAX_DEPTH))
    );
}

#[test]
fn test_duplicate_procedure_rejected() {
    let program = build("func a means\n  emit 1\nendfunc\nfunc b means\n  emit 2\nendfunc\n");
    let mut bytes = encode(&program);

    // Names are written after a little-endian u32 length; rename `b` to `a`.
    let at = bytes
        .windows(5)
        .rposition(|window| window == [1, 0, 0, 0, b'b'])
        .unwrap();
    bytes[at + 4] = b'a';

    assert_eq!(
        decode(&bytes),
        Err(DecodeError::DuplicateProcedure(String::from("a")))
    );
}
