//! Generated-input properties of the whole pipeline

use std::sync::Arc;

use quickcheck::{quickcheck, TestResult};

use dmcompiler::frontend::preprocessor::MemoryLoader;
use dmcompiler::util::diagnostic::SeverityTable;
use dmcompiler::vm::{decode, DreamProcOpcode};
use dmcompiler::{CompileOptions, CompileOutput, Compiler};

fn compile_source(
    source: String,
    options: CompileOptions,
) -> CompileOutput {
    let loader = MemoryLoader::new().with_file("main.dme", source);
    Compiler::new(
        options,
        Arc::new(loader),
        vec!["main.dme".to_string()],
        Arc::new(SeverityTable::new()),
    )
    .compile()
    .unwrap()
}

quickcheck! {
    /// A left-leaning sum never holds more than two operands
    fn prop_sum_needs_two_slots(terms: Vec<u16>) -> TestResult {
        if terms.is_empty() || terms.len() > 64 {
            return TestResult::discard();
        }
        let sum = terms.iter().map(u16::to_string).collect::<Vec<_>>().join(" + ");
        let output = compile_source(format!("/proc/sum()\n\treturn {}\n", sum), CompileOptions::default());
        let Some(artifact) = output.artifact else {
            return TestResult::failed();
        };

        let Some(proc) = artifact.procs.iter().find(|proc| proc.name == "sum") else {
            return TestResult::failed();
        };
        let expected = if terms.len() == 1 { 1 } else { 2 };
        let strings: Vec<String> = artifact.strings.iter().cloned().collect();
        let adds = decode(&proc.bytecode, &strings)
            .unwrap()
            .iter()
            .filter(|instruction| instruction.opcode == DreamProcOpcode::Add)
            .count();
        TestResult::from_bool(proc.max_stack_size == expected && adds == terms.len() - 1)
    }

    /// Defines given to the driver are visible to `#ifdef`
    fn prop_defines_are_visible(suffix: u32) -> bool {
        let name = format!("FLAG_{}", suffix);
        let source = format!("#ifdef {}\n/proc/flagged()\n#endif\n/proc/main()\n", name);
        let output = compile_source(source, CompileOptions::default().define(&name, "1"));
        output
            .artifact
            .is_some_and(|artifact| artifact.procs.iter().any(|proc| proc.name == "flagged"))
    }
}
