use std::collections::HashSet;

use crate::vm::opcode::{opcodes_fingerprint, opcodes_version, ArgKind, ControlFlow, DreamProcOpcode};
use crate::vm::reference::{DMReference, ReferenceType};

#[test]
fn test_catalog_bytes() {
    let all = DreamProcOpcode::ALL;
    assert_eq!(all.first(), Some(&DreamProcOpcode::BitShiftLeft));
    assert_eq!(all.last(), Some(&DreamProcOpcode::Animate));
    assert_eq!(DreamProcOpcode::Animate as u8, 0x9C);

    let bytes: HashSet<u8> = all.iter().map(|op| *op as u8).collect();
    assert_eq!(bytes.len(), all.len());
    for gap in [0x34u8, 0x37, 0x50, 0x5E, 0x62, 0x63, 0x6C, 0x94] {
        assert!(!bytes.contains(&gap), "0x{:02X} is reserved", gap);
        assert_eq!(DreamProcOpcode::try_from(gap), Err(gap));
    }
    assert_eq!(bytes.len(), 0x9C - 8);
    assert!(DreamProcOpcode::try_from(0u8).is_err());
    assert!(DreamProcOpcode::try_from(0x9Du8).is_err());
}

#[test]
fn test_try_from_matches_discriminant() {
    for opcode in DreamProcOpcode::ALL {
        assert_eq!(DreamProcOpcode::try_from(*opcode as u8), Ok(*opcode));
    }
}

#[test]
fn test_metadata() {
    let add = DreamProcOpcode::Add.metadata();
    assert_eq!(add.stack_delta, -1);
    assert!(add.args.is_empty());

    let call = DreamProcOpcode::Call.metadata();
    assert_eq!(call.args, &[ArgKind::Reference, ArgKind::ArgType, ArgKind::StackDelta]);

    let enumerate = DreamProcOpcode::EnumerateAssoc.metadata();
    assert_eq!(enumerate.args.last(), Some(&ArgKind::Label));

    let push_n = DreamProcOpcode::PushNOfStringFloats;
    assert!(push_n.metadata().variable_args);
    assert_eq!(push_n.variable_arg_kinds(), &[ArgKind::String, ArgKind::Float]);

    for opcode in DreamProcOpcode::ALL {
        let metadata = opcode.metadata();
        assert_eq!(
            metadata.variable_args,
            !opcode.variable_arg_kinds().is_empty(),
            "{}",
            opcode
        );
        if metadata.variable_args {
            assert_eq!(metadata.args.last(), Some(&ArgKind::Int), "{}", opcode);
        }
    }
}

#[test]
fn test_control_flow() {
    assert_eq!(DreamProcOpcode::Jump.control_flow(), ControlFlow::Jump);
    assert_eq!(DreamProcOpcode::Return.control_flow(), ControlFlow::Exit);
    assert_eq!(
        DreamProcOpcode::JumpIfFalse.control_flow(),
        ControlFlow::Branch { edge_delta: -1 }
    );
    assert_eq!(DreamProcOpcode::Add.control_flow(), ControlFlow::Next);

    // Everything that can branch carries a label
    for opcode in DreamProcOpcode::ALL {
        let has_label = opcode.metadata().args.contains(&ArgKind::Label);
        let branches = !matches!(opcode.control_flow(), ControlFlow::Next | ControlFlow::Exit);
        assert_eq!(has_label, branches, "{}", opcode);
    }
}

#[test]
fn test_fingerprint_is_stable() {
    assert_eq!(opcodes_fingerprint(), opcodes_fingerprint());
    let version = opcodes_version();
    assert_eq!(version.len(), 8);
    assert!(version.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_reference_tags() {
    assert_eq!(DMReference::Src.ref_type() as u8, 0);
    assert_eq!(DMReference::Local(3).ref_type() as u8, 8);
    assert_eq!(DMReference::Invalid.ref_type() as u8, 16);
    assert_eq!(ReferenceType::try_from(17u8), Err(17));

    assert_eq!(DMReference::Field(0).stack_operands(), 1);
    assert_eq!(DMReference::ListIndex.stack_operands(), 2);
    assert_eq!(DMReference::Local(0).stack_operands(), 0);
}

#[test]
fn test_reference_display() {
    let strings = vec!["name".to_string()];
    assert_eq!(DMReference::Local(2).to_string(), "Local(2)");
    assert_eq!(DMReference::SelfRef.to_string(), "Self");
    assert_eq!(DMReference::Field(0).display_with(&strings).to_string(), "Field(\"name\")");
    assert_eq!(DMReference::SrcProc(5).display_with(&strings).to_string(), "SrcProc(#5)");
}
