use super::compile;
use crate::util::diagnostic::WarningCode;
use crate::vm::{CallArgumentsType, DMReference, DreamProcOpcode, Operand};

#[test]
fn test_return_sum() {
    let compiled = compile("/proc/add()\n\treturn 1 + 2\n");
    compiled.assert_clean();

    assert_eq!(
        compiled.opcodes("add"),
        vec![
            DreamProcOpcode::PushFloat,
            DreamProcOpcode::PushFloat,
            DreamProcOpcode::Add,
            DreamProcOpcode::Return,
        ]
    );
    assert_eq!(compiled.proc("add").max_stack_size, 2);
}

#[test]
fn test_unknown_identifier_is_an_error() {
    let compiled = compile("/proc/test()\n\treturn nope\n");
    assert!(compiled.has_code(WarningCode::ItemDoesntExist));
    // The missing value is replaced by null
    assert_eq!(
        compiled.opcodes("test"),
        vec![DreamProcOpcode::PushNull, DreamProcOpcode::Return]
    );
}

#[test]
fn test_compound_assignment_on_a_local() {
    let compiled = compile("/proc/test()\n\tvar/x = 5\n\tx += 2\n\treturn x\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("test");
    let append = instructions
        .iter()
        .find(|instruction| instruction.opcode == DreamProcOpcode::Append)
        .expect("an Append");
    assert_eq!(append.args[0], Operand::Reference(DMReference::Local(0)));
}

#[test]
fn test_field_assignment_goes_through_src() {
    let compiled = compile(concat!(
        "/mob\n",
        "\tvar/health = 10\n",
        "\tproc/hurt()\n",
        "\t\tsrc.health -= 1\n",
        "\t\thealth = 3\n",
    ));
    compiled.assert_clean();

    let instructions = compiled.instructions("hurt");
    let remove = instructions
        .iter()
        .find(|instruction| instruction.opcode == DreamProcOpcode::Remove)
        .expect("a Remove");
    assert!(matches!(remove.args[0], Operand::Reference(DMReference::Field(_))));
    let assign = instructions
        .iter()
        .find(|instruction| instruction.opcode == DreamProcOpcode::Assign)
        .expect("an Assign");
    assert!(matches!(assign.args[0], Operand::Reference(DMReference::SrcField(_))));
}

#[test]
fn test_logical_assignment_skips_when_decided() {
    let compiled = compile("/proc/test()\n\tvar/x = 1\n\tx &&= 2\n\tx ||= 3\n");
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    assert!(opcodes.contains(&DreamProcOpcode::JumpIfFalseReference));
    assert!(opcodes.contains(&DreamProcOpcode::JumpIfTrueReference));
}

#[test]
fn test_logical_assignment_on_a_field_is_unsupported() {
    let compiled = compile("/datum\n\tvar/x\n/proc/test(datum/D)\n\tD.x &&= 1\n");
    assert!(compiled.has_code(WarningCode::UnsupportedAccess));
}

#[test]
fn test_writing_a_const_is_an_error() {
    let compiled = compile("/proc/test()\n\tvar/const/x = 1\n\tx = 2\n");
    assert!(compiled.has_code(WarningCode::WriteToConstant));
}

#[test]
fn test_null_conditional_chain() {
    let compiled = compile("/proc/test(a)\n\treturn a?.b\n");
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    assert_eq!(
        opcodes,
        vec![
            DreamProcOpcode::PushReferenceValue,
            DreamProcOpcode::JumpIfNullNoPop,
            DreamProcOpcode::DereferenceField,
            DreamProcOpcode::Return,
        ]
    );
}

#[test]
fn test_keyed_arguments() {
    let compiled = compile("/proc/target(a, b)\n/proc/test()\n\ttarget(b = 1)\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("test");
    let call = instructions
        .iter()
        .find(|instruction| instruction.opcode == DreamProcOpcode::Call)
        .expect("a Call");
    assert!(matches!(call.args[0], Operand::Reference(DMReference::GlobalProc(_))));
    assert_eq!(call.args[1], Operand::ArgType(CallArgumentsType::FromStackKeyed));
    assert_eq!(call.args[2], Operand::Int(2));
}

#[test]
fn test_parent_call_forwards_arguments() {
    let compiled = compile(concat!(
        "/mob/proc/act(x)\n",
        "\treturn x\n",
        "/mob/player/act(x)\n",
        "\treturn ..()\n",
    ));
    compiled.assert_clean();

    let override_proc = compiled
        .procs
        .iter()
        .rposition(|proc| proc.name == "act")
        .expect("an override");
    let strings: Vec<String> = compiled.tree.strings().iter().cloned().collect();
    let instructions = crate::vm::decode(&compiled.procs[override_proc].bytecode, &strings).unwrap();
    assert_eq!(instructions[0].opcode, DreamProcOpcode::Call);
    assert_eq!(instructions[0].args[0], Operand::Reference(DMReference::SuperProc));
    assert_eq!(
        instructions[0].args[1],
        Operand::ArgType(CallArgumentsType::FromProcArguments)
    );
}

#[test]
fn test_inferred_new_uses_declared_type() {
    let compiled = compile("/obj/item\n/proc/test()\n\tvar/obj/item/I = new\n\treturn I\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("test");
    let item = compiled
        .tree
        .type_id(&crate::frontend::dm::DreamPath::parse("/obj/item"))
        .unwrap();
    assert_eq!(instructions[0].opcode, DreamProcOpcode::PushType);
    assert_eq!(instructions[0].args[0], Operand::Int(item));
    assert_eq!(instructions[1].opcode, DreamProcOpcode::CreateObject);
}

#[test]
fn test_inferred_new_without_a_type_is_an_error() {
    let compiled = compile("/proc/test()\n\tvar/x = new\n");
    assert!(compiled.has_code(WarningCode::BadExpression));
}

#[test]
fn test_implicit_istype() {
    let compiled = compile("/mob\n/proc/test(mob/M)\n\treturn istype(M)\n");
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    assert_eq!(
        opcodes,
        vec![
            DreamProcOpcode::PushReferenceValue,
            DreamProcOpcode::PushType,
            DreamProcOpcode::IsType,
            DreamProcOpcode::Return,
        ]
    );
}

#[test]
fn test_string_interpolation_formats() {
    let compiled = compile("/proc/test(name)\n\treturn \"Hello, [name]!\"\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("test");
    let format = instructions
        .iter()
        .find(|instruction| instruction.opcode == DreamProcOpcode::FormatString)
        .expect("a FormatString");
    assert_eq!(format.args[1], Operand::Int(1));
}

#[test]
fn test_associative_list_literal() {
    let compiled = compile("/proc/test()\n\treturn list(a = 1, \"b\" = 2)\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("test");
    let list = instructions
        .iter()
        .find(|instruction| instruction.opcode == DreamProcOpcode::CreateAssociativeList)
        .expect("a CreateAssociativeList");
    assert_eq!(list.args[0], Operand::Int(2));
    assert_eq!(compiled.proc("test").max_stack_size, 4);
}

#[test]
fn test_short_circuit_and() {
    let compiled = compile("/proc/test(a, b)\n\treturn a && b\n");
    compiled.assert_clean();

    assert_eq!(
        compiled.opcodes("test"),
        vec![
            DreamProcOpcode::PushReferenceValue,
            DreamProcOpcode::BooleanAnd,
            DreamProcOpcode::PushReferenceValue,
            DreamProcOpcode::Return,
        ]
    );
}

#[test]
fn test_input_takes_at_most_four_arguments() {
    let compiled = compile("/proc/test()\n\treturn input(1, 2, 3, 4, 5)\n");
    assert!(compiled.has_code(WarningCode::InvalidArgumentCount));
}

#[test]
fn test_const_var_is_inlined() {
    let compiled = compile("/datum\n\tvar/const/LIMIT = 4\n\tproc/limit()\n\t\treturn LIMIT\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("limit");
    assert_eq!(instructions[0].opcode, DreamProcOpcode::PushFloat);
    assert_eq!(instructions[0].args[0], Operand::Float(4.0));
}
