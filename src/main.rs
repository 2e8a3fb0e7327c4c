//! DM Compiler - CLI

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use tracing::debug;

use dmcompiler::frontend::dm::ast::print_tree;
use dmcompiler::frontend::dmm::{self, PathTypes};
use dmcompiler::frontend::ntsl;
use dmcompiler::frontend::preprocessor::render_text;
use dmcompiler::middle::DreamCompiledJson;
use dmcompiler::util::config::CompilerConfig;
use dmcompiler::util::diagnostic::{Diagnostic, DiagnosticSink, EmitterConfig, JsonEmitter, TextEmitter};
use dmcompiler::util::logger::{self, LogLevel};
use dmcompiler::{compiler_for, disassemble_artifact, CompileOptions, Compiler, NAME, VERSION};

/// Compiles DM projects into stack-machine bytecode
#[derive(Parser, Debug)]
#[command(name = "dmc")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Settings shared by every command that reads DM source
#[derive(ClapArgs, Debug)]
struct SourceArgs {
    /// Define a macro, as NAME or NAME=VALUE
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Configuration file. Defaults to dmc.toml next to the first input.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print notice-level diagnostics
    #[arg(long)]
    notices: bool,

    /// Print diagnostics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a project to a JSON artifact
    Compile {
        /// Root files, usually a single .dme
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Artifact path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Silence warnings about unimplemented features
        #[arg(long)]
        suppress_unimplemented: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the preprocessed source
    Preprocess {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Parse a project and report syntax errors
    Parse {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Dump the syntax tree
        #[arg(long)]
        ast: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Parse map files
    Map {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Parse an NTSL script and list its procs
    Ntsl {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Disassemble the procs of a compiled artifact
    Disasm {
        #[arg(value_name = "ARTIFACT")]
        artifact: PathBuf,

        /// Only procs with this name
        #[arg(long = "proc", value_name = "NAME")]
        proc_name: Option<String>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    logger::init_with_level(if args.verbose { LogLevel::Debug } else { LogLevel::Info });
    debug!("{} {} on {}", NAME, VERSION, std::env::consts::OS);

    match args.command {
        Commands::Compile {
            files,
            output,
            suppress_unimplemented,
            source,
        } => {
            let config = load_config(&source, &files[0])?;
            let mut options = options_for(&source, &config);
            options.output = output;
            options.suppress_unimplemented |= suppress_unimplemented;

            let compiler = compiler_for(&files, &config, options)?;
            let output = compiler.compile()?;
            let diagnostics = output.diagnostics();
            report(&diagnostics, &source, &config)?;

            let emitter = TextEmitter::new();
            if output.succeeded() {
                println!("{}", emitter.summary(&diagnostics).green());
                if let Some(path) = &output.written {
                    println!("Wrote {}", path.display());
                }
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{}", emitter.summary(&diagnostics).red());
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Preprocess { file, source } => {
            let (compiler, config) = source_compiler(&file, &source)?;
            let text = render_text(compiler.preprocessor(), compiler.sink());
            print!("{}", text);
            finish(compiler.sink(), &source, &config)
        }
        Commands::Parse { file, ast, source } => {
            let (compiler, config) = source_compiler(&file, &source)?;
            let parsed = compiler.parse();
            if ast {
                print!("{}", print_tree(&parsed.file));
            }
            for map in &parsed.maps {
                println!("map {}", map);
            }
            if let Some(interface) = &parsed.interface {
                println!("interface {}", interface);
            }
            finish(compiler.sink(), &source, &config)
        }
        Commands::Map { files } => parse_maps(&files),
        Commands::Ntsl { file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let sink = DiagnosticSink::with_defaults();
            let script = ntsl::parse_script(&file.display().to_string(), &text, sink.clone());

            for proc in &script.procs {
                let vars: Vec<&str> = proc.used_vars.iter().map(String::as_str).collect();
                println!("def {}() uses [{}]", proc.definition.name, vars.join(", "));
            }
            eprint!("{}", text_emitter(false).render_all(&sink.diagnostics()));
            Ok(exit_code(&sink))
        }
        Commands::Disasm { artifact, proc_name } => {
            let text =
                std::fs::read_to_string(&artifact).with_context(|| format!("Failed to read {}", artifact.display()))?;
            let compiled = DreamCompiledJson::from_json_str(&text)
                .with_context(|| format!("{} is not a compiled artifact", artifact.display()))?;

            let fingerprint = dmcompiler::vm::opcodes_version();
            if compiled.metadata.version != fingerprint {
                eprintln!(
                    "{} artifact was built for instruction set {}, this is {}",
                    "warning:".yellow().bold(),
                    compiled.metadata.version,
                    fingerprint
                );
            }
            print!("{}", disassemble_artifact(&compiled, proc_name.as_deref()));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `--config`, else `dmc.toml` beside `first`, else defaults
fn load_config(
    source: &SourceArgs,
    first: &Path,
) -> Result<CompilerConfig> {
    let path = match &source.config {
        Some(path) => path.clone(),
        None => {
            let beside = first.with_file_name("dmc.toml");
            if !beside.is_file() {
                return Ok(CompilerConfig::default());
            }
            beside
        }
    };
    debug!("Loading configuration from {}", path.display());
    CompilerConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

fn options_for(
    source: &SourceArgs,
    config: &CompilerConfig,
) -> CompileOptions {
    let mut options = CompileOptions::from_config(config);
    for define in &source.defines {
        let (name, value) = define.split_once('=').unwrap_or((define.as_str(), ""));
        options.defines.insert(name.to_string(), value.to_string());
    }
    options
}

fn source_compiler(
    file: &Path,
    source: &SourceArgs,
) -> Result<(Compiler, CompilerConfig)> {
    let config = load_config(source, file)?;
    let options = options_for(source, &config);
    let compiler = compiler_for(&[file.to_path_buf()], &config, options)?;
    Ok((compiler, config))
}

fn text_emitter(show_notices: bool) -> TextEmitter {
    TextEmitter::with_config(EmitterConfig {
        use_colors: std::io::stderr().is_terminal(),
        show_notices,
    })
}

fn report(
    diagnostics: &[Diagnostic],
    source: &SourceArgs,
    config: &CompilerConfig,
) -> Result<()> {
    let show_notices = source.notices || config.output.notices_as_warnings;
    if source.json || config.output.json_diagnostics {
        let json = JsonEmitter::new(show_notices)
            .render_all(diagnostics)
            .context("Failed to serialize diagnostics")?;
        println!("{}", json);
    } else {
        eprint!("{}", text_emitter(show_notices).render_all(diagnostics));
    }
    Ok(())
}

fn finish(
    sink: &DiagnosticSink,
    source: &SourceArgs,
    config: &CompilerConfig,
) -> Result<ExitCode> {
    report(&sink.diagnostics(), source, config)?;
    Ok(exit_code(sink))
}

fn exit_code(sink: &DiagnosticSink) -> ExitCode {
    if sink.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Parse maps without an object tree, one thread per file
fn parse_maps(files: &[PathBuf]) -> Result<ExitCode> {
    let sink = DiagnosticSink::with_defaults();
    let results: Vec<Result<String>> = files
        .par_iter()
        .map(|file| {
            let text =
                std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
            let map_sink = sink.fork();
            let map = dmm::parse_map(&file.display().to_string(), &text, map_sink.clone(), &PathTypes);
            sink.absorb(&map_sink);
            Ok(format!(
                "{}: {}x{}x{}, {} cell definitions, {} blocks",
                file.display(),
                map.max_x,
                map.max_y,
                map.max_z,
                map.cell_definitions.len(),
                map.blocks.len()
            ))
        })
        .collect();

    for line in results {
        println!("{}", line?);
    }
    eprint!("{}", text_emitter(false).render_all(&sink.diagnostics()));
    Ok(exit_code(&sink))
}
