use proptest::prelude::*;

use crate::vm::codec::{decode, BytecodeReader, BytecodeWriter, DecodeError, EncodeError, Operand};
use crate::vm::disasm::disassemble;
use crate::vm::opcode::{ArgKind, CallArgumentsType, DreamProcOpcode};
use crate::vm::reference::DMReference;

const STRING_COUNT: i32 = 8;

fn strings() -> Vec<String> {
    (0..STRING_COUNT).map(|i| format!("s{}", i)).collect()
}

fn string_id() -> impl Strategy<Value = i32> {
    0..STRING_COUNT
}

fn reference() -> impl Strategy<Value = DMReference> {
    prop_oneof![
        Just(DMReference::Src),
        Just(DMReference::SelfRef),
        Just(DMReference::Usr),
        Just(DMReference::Args),
        Just(DMReference::World),
        Just(DMReference::SuperProc),
        Just(DMReference::ListIndex),
        Just(DMReference::Callee),
        Just(DMReference::Caller),
        Just(DMReference::Invalid),
        any::<u8>().prop_map(DMReference::Argument),
        any::<u8>().prop_map(DMReference::Local),
        any::<i32>().prop_map(DMReference::Global),
        any::<i32>().prop_map(DMReference::GlobalProc),
        string_id().prop_map(DMReference::Field),
        string_id().prop_map(DMReference::SrcField),
        string_id().prop_map(DMReference::SrcProc),
    ]
}

fn operand(kind: ArgKind) -> BoxedStrategy<Operand> {
    match kind {
        ArgKind::ArgType => prop_oneof![
            Just(CallArgumentsType::None),
            Just(CallArgumentsType::FromStack),
            Just(CallArgumentsType::FromStackKeyed),
            Just(CallArgumentsType::FromArgumentList),
            Just(CallArgumentsType::FromProcArguments),
        ]
        .prop_map(Operand::ArgType)
        .boxed(),
        ArgKind::Label => (0..4096i32).prop_map(Operand::Label).boxed(),
        ArgKind::Float => (-1.0e6f32..1.0e6f32).prop_map(Operand::Float).boxed(),
        ArgKind::String | ArgKind::Resource => string_id().prop_map(Operand::String).boxed(),
        ArgKind::Reference => reference().prop_map(Operand::Reference).boxed(),
        _ => any::<i32>().prop_map(Operand::Int).boxed(),
    }
}

/// An opcode together with operands that satisfy its metadata
fn instruction() -> impl Strategy<Value = (DreamProcOpcode, Vec<Operand>)> {
    prop::sample::select(DreamProcOpcode::ALL.to_vec()).prop_flat_map(|opcode| {
        let metadata = opcode.metadata();
        if metadata.variable_args {
            let item = opcode.variable_arg_kinds();
            (0usize..4)
                .prop_flat_map(move |count| {
                    let items: Vec<_> = (0..count)
                        .flat_map(|_| item.iter().map(|kind| operand(*kind)))
                        .collect();
                    (Just(count), items)
                })
                .prop_map(move |(count, items)| {
                    let mut args = vec![Operand::Int(count as i32)];
                    args.extend(items);
                    (opcode, args)
                })
                .boxed()
        } else {
            let args: Vec<_> = metadata.args.iter().map(|kind| operand(*kind)).collect();
            args.prop_map(move |args| (opcode, args)).boxed()
        }
    })
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(program in prop::collection::vec(instruction(), 1..8)) {
        let strings = strings();
        let mut writer = BytecodeWriter::new();
        let mut offsets = Vec::new();
        for (opcode, args) in &program {
            offsets.push(writer.position());
            writer.encode(*opcode, args).unwrap();
        }

        let decoded = decode(writer.bytes(), &strings).unwrap();
        prop_assert_eq!(decoded.len(), program.len());
        for ((instruction, (opcode, args)), offset) in decoded.iter().zip(&program).zip(&offsets) {
            prop_assert_eq!(instruction.offset, *offset);
            prop_assert_eq!(instruction.opcode, *opcode);
            prop_assert_eq!(instruction.args.as_slice(), args.as_slice());
        }
    }
}

#[test]
fn test_layout() {
    let mut writer = BytecodeWriter::new();
    writer
        .encode(DreamProcOpcode::PushFloat, &[Operand::Float(1.0)])
        .unwrap();
    writer
        .encode(DreamProcOpcode::Assign, &[Operand::Reference(DMReference::Local(3))])
        .unwrap();
    writer
        .encode(DreamProcOpcode::PushString, &[Operand::String(1)])
        .unwrap();

    let mut expected = vec![0x38];
    expected.extend_from_slice(&1.0f32.to_le_bytes());
    expected.extend_from_slice(&[0x09, 8, 3]);
    expected.extend_from_slice(&[0x03, 1, 0, 0, 0]);
    assert_eq!(writer.bytes(), expected.as_slice());
}

#[test]
fn test_encode_rejects_bad_operands() {
    let mut writer = BytecodeWriter::new();
    assert!(matches!(
        writer.encode(DreamProcOpcode::PushFloat, &[]),
        Err(EncodeError::ArgumentCount { expected: 1, found: 0, .. })
    ));
    assert!(matches!(
        writer.encode(DreamProcOpcode::PushFloat, &[Operand::Int(1)]),
        Err(EncodeError::ArgumentKind { index: 0, expected: ArgKind::Float, .. })
    ));
    assert!(matches!(
        writer.encode(DreamProcOpcode::PushNFloats, &[Operand::Int(2), Operand::Float(1.0)]),
        Err(EncodeError::ArgumentCount { expected: 3, .. })
    ));
    assert!(writer.bytes().is_empty());
}

#[test]
fn test_decode_errors() {
    let strings = strings();
    assert_eq!(
        decode(&[0x38, 0, 0], &strings),
        Err(DecodeError::Truncated { offset: 1 })
    );
    assert_eq!(
        decode(&[0x34], &strings),
        Err(DecodeError::UnknownOpcode { offset: 0, byte: 0x34 })
    );
    assert_eq!(
        decode(&[0x09, 42], &strings),
        Err(DecodeError::UnknownReference { offset: 1, tag: 42 })
    );
    assert_eq!(
        decode(&[0x03, 99, 0, 0, 0], &strings),
        Err(DecodeError::StringOutOfRange { offset: 1, index: 99 })
    );
    assert_eq!(
        decode(&[0x88, 0xFF, 0xFF, 0xFF, 0xFF], &strings),
        Err(DecodeError::NegativeCount { offset: 5, count: -1 })
    );
}

#[test]
fn test_reader_stops_after_error() {
    let strings = strings();
    let items: Vec<_> = BytecodeReader::new(&[0x11, 0x34, 0x11], &strings).collect();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(items[1].is_err());
}

#[test]
fn test_patch_label() {
    let mut writer = BytecodeWriter::new();
    writer.encode(DreamProcOpcode::Jump, &[Operand::Label(0)]).unwrap();
    writer.patch_int(1, 5);
    writer.encode(DreamProcOpcode::PushNull, &[]).unwrap();

    let decoded = decode(writer.bytes(), &[]).unwrap();
    assert_eq!(decoded[0].label(), Some(5));
    assert_eq!(decoded[1].offset, 5);
}

#[test]
fn test_disassemble() {
    let strings = vec!["hello".to_string(), "x".to_string()];
    let mut writer = BytecodeWriter::new();
    writer.encode(DreamProcOpcode::PushString, &[Operand::String(0)]).unwrap();
    writer
        .encode(DreamProcOpcode::Assign, &[Operand::Reference(DMReference::Field(1))])
        .unwrap();
    writer.encode(DreamProcOpcode::Jump, &[Operand::Label(0)]).unwrap();

    let listing = disassemble(writer.bytes(), &strings);
    let lines: Vec<_> = listing.lines().collect();
    assert_eq!(lines[0], "00000  PushString \"hello\"");
    assert_eq!(lines[1], "00005  Assign Field(\"x\")");
    assert_eq!(lines[2], "00011  Jump -> 00000");

    let broken = disassemble(&[0x11, 0xFE], &strings);
    assert!(broken.ends_with("error: Unknown opcode 0xFE at offset 1\n"));
}
