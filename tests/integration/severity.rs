//! Pragma configuration through to rendered output

use std::sync::Arc;

use dmcompiler::frontend::preprocessor::MemoryLoader;
use dmcompiler::util::config::CompilerConfig;
use dmcompiler::util::diagnostic::{EmitterConfig, ErrorLevel, JsonEmitter, TextEmitter, WarningCode};
use dmcompiler::{CompileOptions, Compiler};

const EMPTY_PROC: &str = "/proc/nothing() {}\n/proc/main()\n\treturn 1\n";

fn run(pragmas: &str) -> Vec<dmcompiler::util::diagnostic::Diagnostic> {
    let config = CompilerConfig::from_toml(pragmas).unwrap();
    let (table, rejected) = config.severity_table();
    assert!(rejected.is_empty(), "{:?}", rejected);

    let loader = MemoryLoader::new().with_file("main.dme", EMPTY_PROC);
    let compiler = Compiler::new(
        CompileOptions::from_config(&config),
        Arc::new(loader),
        vec!["main.dme".to_string()],
        Arc::new(table),
    );
    let output = compiler.compile().unwrap();
    assert!(output.succeeded());
    output.diagnostics()
}

fn text(show_notices: bool) -> TextEmitter {
    TextEmitter::with_config(EmitterConfig {
        use_colors: false,
        show_notices,
    })
}

#[test]
fn test_notice_shows_only_when_requested() {
    let diagnostics = run("[pragmas]\nEmptyProc = \"notice\"\n");
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == WarningCode::EmptyProc && diagnostic.level == ErrorLevel::Notice));

    assert!(!text(false).render_all(&diagnostics).contains("OD3101"));
    assert!(text(true).render_all(&diagnostics).contains("OD3101"));

    let quiet = JsonEmitter::new(false).render_all(&diagnostics).unwrap();
    let loud = JsonEmitter::new(true).render_all(&diagnostics).unwrap();
    assert!(!quiet.contains("EmptyProc"));
    assert!(loud.contains("EmptyProc"));
}

#[test]
fn test_disabled_code_never_appears() {
    let diagnostics = run("[pragmas]\nEmptyProc = \"disabled\"\n");

    assert!(diagnostics.iter().all(|diagnostic| diagnostic.code != WarningCode::EmptyProc));
    assert!(!text(true).render_all(&diagnostics).contains("OD3101"));
}

#[test]
fn test_warning_level_still_compiles() {
    let diagnostics = run("[pragmas]\nOD3101 = \"warning\"\n");

    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == WarningCode::EmptyProc && diagnostic.level == ErrorLevel::Warning));
    assert!(text(false).render_all(&diagnostics).contains("OD3101"));
}

#[test]
fn test_fatal_codes_cannot_be_demoted() {
    let config = CompilerConfig::from_toml("[pragmas]\nBadToken = \"disabled\"\n").unwrap();
    let (table, rejected) = config.severity_table();

    assert_eq!(rejected.len(), 1);
    assert_eq!(table.level(WarningCode::BadToken), ErrorLevel::Error);
}
