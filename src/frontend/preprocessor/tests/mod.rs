//! Preprocessor stage tests
//!
//! - directives: conditionals, defines, pragmas
//! - includes: include resolution through a `SourceLoader`

mod directives;

use std::sync::Arc;

use super::{render_text, MemoryLoader, Preprocessor};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};

/// Preprocess `main.dm` holding `source`, plus any extra files
fn run_with(
    source: &str,
    files: &[(&str, &str)],
    setup: impl FnOnce(&mut Preprocessor),
) -> (String, Preprocessor) {
    let mut loader = MemoryLoader::new().with_file("main.dm", source);
    for (path, text) in files {
        loader.insert(path, *text);
    }
    let sink = DiagnosticSink::with_defaults();
    let mut preprocessor = Preprocessor::new(Arc::new(loader), sink.clone());
    setup(&mut preprocessor);
    preprocessor.include_file("main.dm", None);
    let text = render_text(preprocessor.by_ref(), &sink);
    (text, preprocessor)
}

fn run(source: &str) -> (String, DiagnosticSink) {
    let (text, preprocessor) = run_with(source, &[], |_| {});
    (text, preprocessor.sink().clone())
}

fn count(
    sink: &DiagnosticSink,
    code: WarningCode,
) -> usize {
    sink.diagnostics().iter().filter(|d| d.code == code).count()
}
