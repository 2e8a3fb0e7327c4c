//! Compilation driver
//!
//! Runs every stage over a set of root files:
//!
//! 1. preprocess, pulling includes through a [`SourceLoader`]
//! 2. lex and parse into one [`ast::File`]
//! 3. build the [`ObjectTree`] and generate proc bytecode
//! 4. parse the included maps in parallel
//! 5. assemble the artifact and write it
//!
//! All stages report to one [`DiagnosticSink`]. A stage that ends with
//! errors stops the run, so an artifact only exists for error-free input.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::frontend::dm::{ast, DmLexer, DmParser};
use crate::frontend::dmm::{self, DreamMapJson, MapTypes};
use crate::frontend::preprocessor::{FsLoader, Preprocessor, SourceLoader};
use crate::middle::{self, compile_procs, DreamCompiledJson, ObjectTree};
use crate::util::config::CompilerConfig;
use crate::util::diagnostic::{Diagnostic, DiagnosticSink, ErrorLevel, SeverityTable, WarningCode};
use crate::util::span::Location;

/// Per-run settings
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Object-like macros defined before the first file
    pub defines: IndexMap<String, String>,
    pub dm_version: String,
    pub dm_build: String,
    pub suppress_unimplemented: bool,
    pub pretty_artifact: bool,
    /// Artifact path. Defaults to the first input with a `.json` extension.
    pub output: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from_config(&CompilerConfig::default())
    }
}

impl CompileOptions {
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            defines: config.defines.clone(),
            dm_version: config.build.dm_version.clone(),
            dm_build: config.build.dm_build.clone(),
            suppress_unimplemented: config.build.suppress_unimplemented,
            pretty_artifact: config.output.pretty_artifact,
            output: None,
        }
    }

    pub fn define(
        mut self,
        name: &str,
        value: &str,
    ) -> Self {
        self.defines.insert(name.to_string(), value.to_string());
        self
    }
}

/// Problems with the inputs themselves, before any source is read
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("No input files")]
    NoInputFiles,

    #[error("Input file {} does not exist", .0.display())]
    MissingInput(PathBuf),

    #[error("Input file {} is outside the project directory {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// What a run produced
#[derive(Debug)]
pub struct CompileOutput {
    /// Present only when no stage reported an error
    pub artifact: Option<DreamCompiledJson>,
    /// Where the artifact was written, if anywhere
    pub written: Option<PathBuf>,
    pub sink: DiagnosticSink,
}

impl CompileOutput {
    pub fn succeeded(&self) -> bool {
        self.artifact.is_some() && !self.sink.has_errors()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.sink.diagnostics()
    }
}

/// The parsed project, before any code is generated
#[derive(Debug)]
pub struct ParsedProject {
    pub file: ast::File,
    /// Map files included by the source, in inclusion order
    pub maps: Vec<String>,
    pub interface: Option<String>,
}

/// One compilation over a fixed set of root files
pub struct Compiler {
    options: CompileOptions,
    loader: Arc<dyn SourceLoader>,
    files: Vec<String>,
    default_output: Option<PathBuf>,
    sink: DiagnosticSink,
}

impl Compiler {
    /// Compile `files`, named by logical paths `loader` understands.
    ///
    /// The severity table must be complete; it is read-only from here on.
    pub fn new(
        options: CompileOptions,
        loader: Arc<dyn SourceLoader>,
        files: Vec<String>,
        severities: Arc<SeverityTable>,
    ) -> Self {
        let sink = DiagnosticSink::new(severities);
        if options.suppress_unimplemented {
            match sink.set_pragma(WarningCode::UnimplementedAccess, ErrorLevel::Disabled) {
                Ok(()) => sink.forced_warning(
                    Location::UNKNOWN,
                    "Unimplemented proc & var warnings are currently suppressed",
                ),
                Err(err) => sink.forced_warning(Location::UNKNOWN, err.to_string()),
            }
        }

        Self {
            options,
            loader,
            files,
            default_output: None,
            sink,
        }
    }

    /// Compile files on disk. Includes resolve relative to the first
    /// file's directory, which every other input must live under.
    pub fn for_paths(
        paths: &[PathBuf],
        options: CompileOptions,
        severities: Arc<SeverityTable>,
    ) -> Result<Self, CompileError> {
        let first = paths.first().ok_or(CompileError::NoInputFiles)?;
        let root = first.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if !path.is_file() {
                return Err(CompileError::MissingInput(path.clone()));
            }
            let relative = path.strip_prefix(&root).map_err(|_| CompileError::OutsideRoot {
                path: path.clone(),
                root: root.clone(),
            })?;
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }

        let mut compiler = Self::new(options, Arc::new(FsLoader::new(root)), files, severities);
        compiler.default_output = Some(first.with_extension("json"));
        Ok(compiler)
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// A preprocessor with every root file pushed and the defines set
    pub fn preprocessor(&self) -> Preprocessor {
        let mut preprocessor = Preprocessor::new(self.loader.clone(), self.sink.clone());
        preprocessor.set_version(&self.options.dm_version, &self.options.dm_build);
        for (name, value) in &self.options.defines {
            preprocessor.define(name, value);
        }
        // The include stack runs last-pushed first
        for file in self.files.iter().rev() {
            preprocessor.include_file(file, None);
        }
        preprocessor
    }

    /// Preprocess and parse every root file
    pub fn parse(&self) -> ParsedProject {
        let mut preprocessor = self.preprocessor();
        let name = self.files.first().map(String::as_str).unwrap_or("<internal>");

        debug!("Parsing");
        let file = {
            let lexer = DmLexer::new(&mut preprocessor, Location::in_source(Arc::from(name)));
            DmParser::new(lexer, self.sink.clone()).parse_file()
        };
        debug!(
            "Parsed {} top-level statements with {} diagnostics",
            file.block.statements.len(),
            self.sink.len()
        );

        ParsedProject {
            file,
            maps: preprocessor.maps().to_vec(),
            interface: preprocessor.interface().map(str::to_string),
        }
    }

    /// Run every stage and write the artifact if nothing failed.
    ///
    /// Source problems end up in the returned sink. `Err` is only for
    /// failing to write the artifact.
    pub fn compile(&self) -> anyhow::Result<CompileOutput> {
        info!("Compiling {}", self.files.join(", "));

        let parsed = self.parse();
        if self.sink.has_errors() {
            return Ok(self.failed());
        }

        let mut tree = ObjectTree::new();
        tree.add_file(parsed.file, &self.sink);
        tree.check_overrides(&self.sink);
        if self.sink.has_errors() {
            return Ok(self.failed());
        }

        let (procs, global_init) = compile_procs(&mut tree, &self.sink);
        let maps = self.convert_maps(&parsed.maps, &tree);
        if self.sink.has_errors() {
            return Ok(self.failed());
        }

        let artifact = middle::assemble(&tree, procs, global_init, maps, parsed.interface);
        let written = match self.options.output.clone().or_else(|| self.default_output.clone()) {
            Some(path) => {
                artifact.write_to(&path, self.options.pretty_artifact)?;
                info!("Wrote {}", path.display());
                Some(path)
            }
            None => None,
        };

        Ok(CompileOutput {
            artifact: Some(artifact),
            written,
            sink: self.sink.clone(),
        })
    }

    fn failed(&self) -> CompileOutput {
        info!("Compilation stopped after {} errors", self.sink.error_count());
        CompileOutput {
            artifact: None,
            written: None,
            sink: self.sink.clone(),
        }
    }

    /// Parse maps in parallel, then stack them along z in inclusion order.
    /// A map with errors is reported but left out.
    fn convert_maps(
        &self,
        paths: &[String],
        types: &dyn MapTypes,
    ) -> Vec<DreamMapJson> {
        let parsed: Vec<(DreamMapJson, DiagnosticSink)> = paths
            .par_iter()
            .filter_map(|path| {
                let location = Location::in_source(Arc::from(path.as_str()));
                match self.loader.load(path) {
                    Ok(text) => {
                        debug!("Converting map {}", path);
                        let sink = self.sink.fork();
                        Some((dmm::parse_map(path, &text, sink.clone(), types), sink))
                    }
                    Err(err) => {
                        self.sink.emit(
                            WarningCode::MissingIncludedFile,
                            location,
                            format!("Could not read map \"{}\": {:#}", path, err),
                        );
                        None
                    }
                }
            })
            .collect();

        let mut z_offset = 0;
        let mut maps = Vec::with_capacity(parsed.len());
        for (mut map, sink) in parsed {
            self.sink.absorb(&sink);
            map.offset_z(z_offset);
            z_offset = z_offset.saturating_add(1).max(map.max_z);
            if !sink.has_errors() {
                maps.push(map);
            }
        }
        maps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::preprocessor::MemoryLoader;

    const CODE: &str = "/turf/floor\n/area/station\n/mob\n\tvar/health = 10\n\tproc/hurt()\n\t\thealth--\n";
    const MAP: &str = "\"a\" = (/turf/floor,/area/station)\n\n(1,1,1) = {\"\naa\n\"}\n";

    fn in_memory(
        loader: MemoryLoader,
        options: CompileOptions,
    ) -> Compiler {
        Compiler::new(
            options,
            Arc::new(loader),
            vec!["main.dme".to_string()],
            Arc::new(SeverityTable::new()),
        )
    }

    #[test]
    fn test_compile_project_with_map() {
        let loader = MemoryLoader::new()
            .with_file("main.dme", "#include \"code.dm\"\n#include \"maps/one.dmm\"\n")
            .with_file("code.dm", CODE)
            .with_file("maps/one.dmm", MAP);
        let output = in_memory(loader, CompileOptions::default()).compile().unwrap();

        assert!(output.succeeded(), "{:?}", output.diagnostics());
        assert!(output.written.is_none());
        let artifact = output.artifact.unwrap();
        assert_eq!(artifact.maps.len(), 1);
        assert!(artifact.types.iter().any(|ty| ty.path == "/mob"));
        assert!(artifact.procs.iter().any(|proc| proc.name == "hurt"));
    }

    #[test]
    fn test_maps_stack_along_z() {
        let loader = MemoryLoader::new()
            .with_file(
                "main.dme",
                "#include \"code.dm\"\n#include \"one.dmm\"\n#include \"two.dmm\"\n",
            )
            .with_file("code.dm", CODE)
            .with_file("one.dmm", MAP)
            .with_file("two.dmm", MAP);
        let output = in_memory(loader, CompileOptions::default()).compile().unwrap();

        let maps = output.artifact.unwrap().maps;
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].blocks[0].z, 1);
        assert_eq!(maps[1].blocks[0].z, 2);
    }

    #[test]
    fn test_errors_withhold_the_artifact() {
        let loader = MemoryLoader::new().with_file("main.dme", "/proc/test()\n\treturn nope\n");
        let output = in_memory(loader, CompileOptions::default()).compile().unwrap();

        assert!(!output.succeeded());
        assert!(output.artifact.is_none());
        assert!(output.sink.has_errors());
    }

    #[test]
    fn test_unclosed_call_is_one_error() {
        let source = "/proc/a()\n\treturn f(1, 2\n/proc/f(a, b)\n\treturn a + b\n";
        let loader = MemoryLoader::new().with_file("main.dme", source);
        let output = in_memory(loader, CompileOptions::default()).compile().unwrap();

        assert!(output.artifact.is_none());
        assert_eq!(output.sink.error_count(), 1, "{:?}", output.diagnostics());
    }

    #[test]
    fn test_defines_reach_the_source() {
        let source = "#ifdef DEBUG\n/proc/debug_only()\n#endif\n/proc/always()\n";
        let loader = MemoryLoader::new().with_file("main.dme", source);

        let plain = in_memory(loader.clone(), CompileOptions::default()).compile().unwrap();
        let debug = in_memory(loader, CompileOptions::default().define("DEBUG", "1"))
            .compile()
            .unwrap();

        let has = |output: &CompileOutput, name: &str| {
            output
                .artifact
                .as_ref()
                .is_some_and(|artifact| artifact.procs.iter().any(|proc| proc.name == name))
        };
        assert!(!has(&plain, "debug_only"));
        assert!(has(&debug, "debug_only"));
        assert!(has(&plain, "always"));
    }

    #[test]
    fn test_suppressing_unimplemented_warns_once() {
        let loader = MemoryLoader::new().with_file("main.dme", "/proc/test()\n");
        let options = CompileOptions {
            suppress_unimplemented: true,
            ..CompileOptions::default()
        };
        let compiler = in_memory(loader, options);

        assert_eq!(compiler.sink().level(WarningCode::UnimplementedAccess), ErrorLevel::Disabled);
        assert_eq!(compiler.sink().warning_count(), 1);
    }

    #[test]
    fn test_for_paths_writes_next_to_the_input() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("game.dme");
        std::fs::write(&main, "#include \"code/mob.dm\"\n").unwrap();
        std::fs::create_dir(dir.path().join("code")).unwrap();
        std::fs::write(dir.path().join("code/mob.dm"), CODE).unwrap();

        let compiler =
            Compiler::for_paths(&[main.clone()], CompileOptions::default(), Arc::new(SeverityTable::new()))
                .unwrap();
        let output = compiler.compile().unwrap();

        assert!(output.succeeded(), "{:?}", output.diagnostics());
        let written = output.written.unwrap();
        assert_eq!(written, main.with_extension("json"));
        let text = std::fs::read_to_string(&written).unwrap();
        assert_eq!(
            DreamCompiledJson::from_json_str(&text).unwrap(),
            output.artifact.unwrap()
        );
    }

    #[test]
    fn test_for_paths_rejects_bad_inputs() {
        let severities = Arc::new(SeverityTable::new());
        assert!(matches!(
            Compiler::for_paths(&[], CompileOptions::default(), severities.clone()),
            Err(CompileError::NoInputFiles)
        ));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.dme");
        assert!(matches!(
            Compiler::for_paths(&[missing], CompileOptions::default(), severities),
            Err(CompileError::MissingInput(_))
        ));
    }
}
