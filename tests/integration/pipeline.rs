//! End-to-end compilation of projects on disk

use std::path::{Path, PathBuf};

use dmcompiler::util::config::CompilerConfig;
use dmcompiler::util::diagnostic::ErrorLevel;
use dmcompiler::vm::{decode, DreamProcOpcode};
use dmcompiler::{compiler_for, disassemble_artifact, CompileOptions};

const CODE: &str = "\
/turf/floor
/area/station
/mob/player
\tvar/score = 0
\tproc/win()
\t\tscore += 10
\t\treturn score
/proc/add()
\treturn 1 + 2
";

const MAP: &str = "\
\"aa\" = (/turf/floor,/area/station)
\"ab\" = (/mob/player,/turf/floor,/area/station)

(1,1,1) = {\"
aaab
abaa
\"}
";

/// Write `files` under a fresh directory and return it with the `.dme` path
fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, text).unwrap();
    }
    let dme = dir.path().join("game.dme");
    (dir, dme)
}

fn compile(dme: &Path) -> dmcompiler::CompileOutput {
    let config = CompilerConfig::default();
    compiler_for(&[dme.to_path_buf()], &config, CompileOptions::from_config(&config))
        .unwrap()
        .compile()
        .unwrap()
}

#[test]
fn test_project_with_map_and_interface() {
    let (_dir, dme) = project(&[
        (
            "game.dme",
            "#include \"code/mob.dm\"\n#include \"maps/station.dmm\"\n#include \"skin.dmf\"\n",
        ),
        ("code/mob.dm", CODE),
        ("maps/station.dmm", MAP),
        ("skin.dmf", "window \"main\"\n"),
    ]);
    let output = compile(&dme);
    assert!(output.succeeded(), "{:?}", output.diagnostics());

    let artifact = output.artifact.unwrap();
    assert_eq!(artifact.types[0].path, "/");
    assert_eq!(artifact.interface.as_deref(), Some("skin.dmf"));
    assert_eq!(artifact.maps.len(), 1);
    assert_eq!(artifact.maps[0].cell_definitions.len(), 2);
    assert_eq!(output.written, Some(dme.with_extension("json")));
}

#[test]
fn test_arithmetic_proc() {
    let (_dir, dme) = project(&[("game.dme", CODE)]);
    let output = compile(&dme);
    let artifact = output.artifact.unwrap();

    let add = artifact.procs.iter().find(|proc| proc.name == "add").unwrap();
    let strings: Vec<String> = artifact.strings.iter().cloned().collect();
    let opcodes: Vec<DreamProcOpcode> = decode(&add.bytecode, &strings)
        .unwrap()
        .iter()
        .map(|instruction| instruction.opcode)
        .collect();
    assert_eq!(
        opcodes,
        vec![
            DreamProcOpcode::PushFloat,
            DreamProcOpcode::PushFloat,
            DreamProcOpcode::Add,
            DreamProcOpcode::Return,
        ]
    );
    assert_eq!(add.max_stack_size, 2);
}

#[test]
fn test_disassembly_names_the_proc() {
    let (_dir, dme) = project(&[("game.dme", CODE)]);
    let artifact = compile(&dme).artifact.unwrap();

    let listing = disassemble_artifact(&artifact, Some("add"));
    assert!(listing.starts_with("proc /add (max stack 2)"), "{}", listing);
    assert!(listing.contains("PushFloat 1"));
    assert!(listing.contains("Add"));
    assert!(!listing.contains("win"));

    let everything = disassemble_artifact(&artifact, None);
    assert!(everything.contains("proc /mob/player/win"));
}

#[test]
fn test_bad_map_cell_withholds_the_artifact() {
    let bad_map = "\"aa\" = (/turf/floor)\n\"abc\" = (/turf/floor)\n\n(1,1,1) = {\"\naa\n\"}\n";
    let (_dir, dme) = project(&[
        ("game.dme", "#include \"code.dm\"\n#include \"bad.dmm\"\n"),
        ("code.dm", CODE),
        ("bad.dmm", bad_map),
    ]);
    let output = compile(&dme);

    assert!(!output.succeeded());
    assert!(output.written.is_none());
    let errors: Vec<_> = output
        .diagnostics()
        .into_iter()
        .filter(|diagnostic| diagnostic.level == ErrorLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].message.contains("Invalid cell definition name length"));
}

#[test]
fn test_missing_include_is_reported() {
    let (_dir, dme) = project(&[("game.dme", "#include \"nowhere.dm\"\n/proc/main()\n\treturn\n")]);
    let output = compile(&dme);

    assert!(output
        .diagnostics()
        .iter()
        .any(|diagnostic| diagnostic.message.contains("nowhere.dm")));
}
