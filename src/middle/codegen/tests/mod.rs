//! Code generation tests
//!
//! - verify: stack verification of hand-written bytecode
//! - expr: expression lowering
//! - stmt: statements, loops and labels

mod expr;
mod stmt;

use crate::frontend::dm::parse_snippet;
use crate::middle::artifact::ProcDefinitionJson;
use crate::middle::codegen::compile_procs;
use crate::middle::objtree::ObjectTree;
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::vm::{decode, DreamProcOpcode, Instruction};

/// A compiled snippet
struct Compiled {
    tree: ObjectTree,
    procs: Vec<ProcDefinitionJson>,
    global_init: Option<ProcDefinitionJson>,
    sink: DiagnosticSink,
}

impl Compiled {
    fn proc(
        &self,
        name: &str,
    ) -> &ProcDefinitionJson {
        self.procs
            .iter()
            .find(|proc| proc.name == name)
            .unwrap_or_else(|| panic!("no proc named {}", name))
    }

    fn instructions(
        &self,
        name: &str,
    ) -> Vec<Instruction> {
        let strings: Vec<String> = self.tree.strings().iter().cloned().collect();
        decode(&self.proc(name).bytecode, &strings).expect("bytecode decodes")
    }

    fn opcodes(
        &self,
        name: &str,
    ) -> Vec<DreamProcOpcode> {
        self.instructions(name)
            .iter()
            .map(|instruction| instruction.opcode)
            .collect()
    }

    fn has_code(
        &self,
        code: WarningCode,
    ) -> bool {
        self.sink
            .diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.code == code)
    }

    fn assert_clean(&self) {
        let diagnostics = self.sink.diagnostics();
        assert!(!self.sink.has_errors(), "unexpected errors: {:?}", diagnostics);
    }
}

fn compile(source: &str) -> Compiled {
    let sink = DiagnosticSink::with_defaults();
    let file = parse_snippet("test.dm", source, &sink);
    let mut tree = ObjectTree::new();
    tree.add_file(file, &sink);
    tree.check_overrides(&sink);
    let (procs, global_init) = compile_procs(&mut tree, &sink);
    Compiled {
        tree,
        procs,
        global_init,
        sink,
    }
}
