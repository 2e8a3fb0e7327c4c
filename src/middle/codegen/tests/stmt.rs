use super::compile;
use crate::middle::artifact::ProcAttributes;
use crate::util::diagnostic::WarningCode;
use crate::vm::{DMReference, DreamProcOpcode, Operand};

#[test]
fn test_range_for_uses_a_range_enumerator() {
    let compiled = compile("/proc/test()\n\tvar/total = 0\n\tfor(var/i = 1 to 10 step 2)\n\t\ttotal += i\n\treturn total\n");
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    for expected in [
        DreamProcOpcode::CreateRangeEnumerator,
        DreamProcOpcode::Enumerate,
        DreamProcOpcode::DestroyEnumerator,
    ] {
        assert!(opcodes.contains(&expected), "missing {}", expected);
    }
}

#[test]
fn test_typed_list_for_filters() {
    let compiled = compile("/obj\n/proc/test(L)\n\tfor(var/obj/O in L)\n\t\tdel(O)\n\tfor(var/x in L)\n\t\tdel(x)\n");
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    assert!(opcodes.contains(&DreamProcOpcode::CreateFilteredListEnumerator));
    assert!(opcodes.contains(&DreamProcOpcode::CreateListEnumerator));
}

#[test]
fn test_c_style_for() {
    let compiled = compile("/proc/test()\n\tfor(var/i = 0, i < 3, i++)\n\t\tcontinue\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("test");
    assert!(instructions
        .iter()
        .any(|instruction| instruction.opcode == DreamProcOpcode::Increment
            && instruction.args[0] == Operand::Reference(DMReference::Local(0))));
    // The loop jumps back to its condition
    let last = instructions.last().unwrap();
    assert_eq!(last.opcode, DreamProcOpcode::Jump);
    assert!(last.label().unwrap() < last.offset);
}

#[test]
fn test_while_with_break() {
    let compiled = compile("/proc/test(a)\n\twhile(a)\n\t\tif(a > 3)\n\t\t\tbreak\n\t\ta++\n\treturn a\n");
    compiled.assert_clean();
    assert!(compiled.proc("test").max_stack_size >= 2);
}

#[test]
fn test_do_while() {
    let compiled = compile("/proc/test(a)\n\tdo\n\t\ta--\n\twhile(a > 0)\n");
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    assert_eq!(opcodes.last(), Some(&DreamProcOpcode::Jump));
    assert!(opcodes.contains(&DreamProcOpcode::Decrement));
}

#[test]
fn test_break_outside_a_loop() {
    let compiled = compile("/proc/test()\n\tbreak\n");
    assert!(compiled.has_code(WarningCode::BadLabel));
}

#[test]
fn test_labeled_break_leaves_the_outer_loop() {
    let compiled = compile(concat!(
        "/proc/test()\n",
        "\touter:\n",
        "\t\tfor(var/i = 1 to 3)\n",
        "\t\t\twhile(1)\n",
        "\t\t\t\tbreak outer\n",
    ));
    compiled.assert_clean();
}

#[test]
fn test_goto_to_a_missing_label() {
    let compiled = compile("/proc/test()\n\tgoto nowhere\n");
    assert!(compiled.has_code(WarningCode::BadLabel));
}

#[test]
fn test_switch_cases() {
    let compiled = compile(concat!(
        "/proc/test(a)\n",
        "\tswitch(a)\n",
        "\t\tif(1, 2)\n",
        "\t\t\treturn 0\n",
        "\t\tif(3 to 5)\n",
        "\t\t\treturn 1\n",
        "\t\telse\n",
        "\t\t\treturn 2\n",
    ));
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    let cases = opcodes
        .iter()
        .filter(|opcode| **opcode == DreamProcOpcode::SwitchCase)
        .count();
    assert_eq!(cases, 2);
    assert!(opcodes.contains(&DreamProcOpcode::SwitchCaseRange));
    assert_eq!(compiled.proc("test").max_stack_size, 3);
}

#[test]
fn test_spawn_body_returns() {
    let compiled = compile("/proc/test()\n\tspawn(10)\n\t\tworld << \"later\"\n\treturn 1\n");
    compiled.assert_clean();

    let opcodes = compiled.opcodes("test");
    let spawn = opcodes
        .iter()
        .position(|opcode| *opcode == DreamProcOpcode::Spawn)
        .expect("a Spawn");
    assert_eq!(opcodes[spawn + 4], DreamProcOpcode::PushNull);
    assert_eq!(opcodes[spawn + 5], DreamProcOpcode::Return);
}

#[test]
fn test_try_catch_binds_the_exception() {
    let compiled = compile("/proc/test()\n\ttry\n\t\tthrow 1\n\tcatch(var/e)\n\t\treturn e\n");
    compiled.assert_clean();

    let instructions = compiled.instructions("test");
    assert_eq!(instructions[0].opcode, DreamProcOpcode::Try);
    assert!(instructions
        .iter()
        .any(|instruction| instruction.opcode == DreamProcOpcode::EndTry));
    assert_eq!(compiled.proc("test").locals[0].add.as_deref(), Some("e"));
}

#[test]
fn test_duplicate_local() {
    let compiled = compile("/proc/test()\n\tvar/a = 1\n\tvar/a = 2\n");
    assert!(compiled.has_code(WarningCode::DuplicateVariable));
}

#[test]
fn test_too_many_locals_abandons_the_proc() {
    let mut source = String::from("/proc/test()\n");
    for index in 0..=256 {
        source.push_str(&format!("\tvar/v{}\n", index));
    }
    let compiled = compile(&source);

    assert!(compiled.has_code(WarningCode::InvalidBytecode));
    assert!(compiled.proc("test").bytecode.is_empty());
}

#[test]
fn test_default_argument_prologue() {
    let compiled = compile("/proc/test(a = 3)\n\treturn a\n");
    compiled.assert_clean();

    assert_eq!(
        &compiled.opcodes("test")[..6],
        &[
            DreamProcOpcode::PushReferenceValue,
            DreamProcOpcode::IsNull,
            DreamProcOpcode::JumpIfFalse,
            DreamProcOpcode::PushFloat,
            DreamProcOpcode::Assign,
            DreamProcOpcode::Pop,
        ]
    );
    assert_eq!(compiled.proc("test").arguments[0].name, "a");
}

#[test]
fn test_set_statements_become_attributes() {
    let compiled = compile(concat!(
        "/mob/verb/say()\n",
        "\tset name = \"Say\"\n",
        "\tset category = \"IC\"\n",
        "\tset hidden = 1\n",
        "\tset waitfor = 0\n",
        "\treturn\n",
    ));
    compiled.assert_clean();

    let say = compiled.proc("say");
    assert!(say.is_verb);
    assert_eq!(say.verb_name.as_deref(), Some("Say"));
    assert_eq!(say.verb_category.as_deref(), Some("IC"));
    assert!(say.attributes.contains(ProcAttributes::HIDDEN));
    assert!(say.attributes.contains(ProcAttributes::DISABLE_WAITFOR));
}

#[test]
fn test_unknown_set_attribute() {
    let compiled = compile("/proc/test()\n\tset colour = 1\n");
    assert!(compiled.has_code(WarningCode::InvalidSetStatement));
}

#[test]
fn test_proc_static_gets_a_global_slot() {
    let compiled = compile(concat!(
        "/proc/counter()\n",
        "\tvar/static/count = 0\n",
        "\tvar/static/list/seen = new\n",
        "\tcount++\n",
        "\treturn count\n",
    ));
    compiled.assert_clean();

    let names: Vec<&str> = compiled
        .tree
        .globals()
        .iter()
        .map(|global| global.name.as_str())
        .collect();
    assert!(names.contains(&"count"));
    assert!(names.contains(&"seen"));
    // `new` cannot be folded, so the global init proc assigns it
    let init = compiled.global_init.as_ref().expect("a global init proc");
    assert!(!init.bytecode.is_empty());

    let instructions = compiled.instructions("counter");
    assert!(instructions
        .iter()
        .filter_map(|instruction| instruction.args.first().and_then(Operand::as_reference))
        .any(|reference| matches!(reference, DMReference::Global(_))));
}
