//! # DM compiler benchmarks
//!
//! Criterion benchmarks over a generated project.
//!
//! ## Groups
//! - `frontend`: preprocessor lexing, DM lexing and parsing
//! - `compile`: the full pipeline down to the artifact
//! - `codec`: bytecode decoding
//!
//! ## Usage
//! ```bash
//! cargo bench           # everything
//! cargo bench frontend  # only the frontend group
//! ```

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use dmcompiler::frontend::core::lexer::Lexer;
use dmcompiler::frontend::dm::{parse_snippet, DmLexer};
use dmcompiler::frontend::preprocessor::{MemoryLoader, PreprocessorLexer};
use dmcompiler::util::diagnostic::{DiagnosticSink, SeverityTable};
use dmcompiler::util::span::Location;
use dmcompiler::{CompileOptions, Compiler};

/// `types` types, each with a few vars and procs
fn synthetic_source(types: usize) -> String {
    let mut source = String::from("#define LIMIT 10\n/proc/bounded(x)\n\treturn min(max(x, 0), LIMIT)\n");
    for index in 0..types {
        source.push_str(&format!(
            concat!(
                "/obj/item/thing{i}\n",
                "\tvar/health = {i}\n",
                "\tvar/list/parts = list(\"a\", \"b\")\n",
                "\tproc/damage(amount = 1)\n",
                "\t\thealth -= bounded(amount)\n",
                "\t\tif(health <= 0)\n",
                "\t\t\tdel(src)\n",
                "\t\treturn health\n",
                "\tproc/describe()\n",
                "\t\tvar/summary = \"\"\n",
                "\t\tfor(var/part in parts)\n",
                "\t\t\tsummary += \"[part] \"\n",
                "\t\treturn summary\n",
            ),
            i = index
        ));
    }
    source
}

// ============================================================================
// Frontend
// ============================================================================

fn bench_preprocessor_lexer(c: &mut Criterion) {
    let source = synthetic_source(200);
    c.bench_function("preprocessor_lex", |b| {
        b.iter(|| {
            let sink = DiagnosticSink::with_defaults();
            PreprocessorLexer::new("bench.dm", black_box(&source), sink)
                .into_tokens()
                .count()
        })
    });
}

fn bench_dm_lexer(c: &mut Criterion) {
    let source = synthetic_source(200);
    c.bench_function("dm_lex", |b| {
        b.iter(|| {
            let sink = DiagnosticSink::with_defaults();
            let tokens = PreprocessorLexer::new("bench.dm", black_box(&source), sink).into_tokens();
            DmLexer::new(tokens, Location::in_source(Arc::from("bench.dm")))
                .into_tokens()
                .count()
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    let source = synthetic_source(200);
    c.bench_function("parse", |b| {
        b.iter(|| {
            let sink = DiagnosticSink::with_defaults();
            parse_snippet("bench.dm", black_box(&source), &sink)
        })
    });
}

// ============================================================================
// Full pipeline
// ============================================================================

fn bench_compile(c: &mut Criterion) {
    let loader = MemoryLoader::new().with_file("bench.dme", synthetic_source(200));
    c.bench_function("compile", |b| {
        b.iter(|| {
            let compiler = Compiler::new(
                CompileOptions::default(),
                Arc::new(loader.clone()),
                vec!["bench.dme".to_string()],
                Arc::new(SeverityTable::new()),
            );
            let output = compiler.compile().expect("in-memory compile");
            assert!(output.succeeded());
            output
        })
    });
}

// ============================================================================
// Codec
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let loader = MemoryLoader::new().with_file("bench.dme", synthetic_source(50));
    let compiler = Compiler::new(
        CompileOptions::default(),
        Arc::new(loader),
        vec!["bench.dme".to_string()],
        Arc::new(SeverityTable::new()),
    );
    let artifact = compiler
        .compile()
        .expect("in-memory compile")
        .artifact
        .expect("an artifact");
    let strings: Vec<String> = artifact.strings.iter().cloned().collect();

    c.bench_function("decode_all_procs", |b| {
        b.iter(|| {
            artifact
                .procs
                .iter()
                .map(|proc| dmcompiler::vm::decode(black_box(&proc.bytecode), &strings).map(|code| code.len()))
                .sum::<Result<usize, _>>()
        })
    });
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(
    name = frontend;
    config = Criterion::default().sample_size(30);
    targets = bench_preprocessor_lexer, bench_dm_lexer, bench_parse
);

criterion_group!(
    name = compile;
    config = Criterion::default().sample_size(10);
    targets = bench_compile
);

criterion_group!(
    name = codec;
    config = Criterion::default().sample_size(50);
    targets = bench_decode
);

criterion_main!(frontend, compile, codec);
