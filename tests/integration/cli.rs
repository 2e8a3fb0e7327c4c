//! The `dmc` binary

use std::path::Path;
use std::process::{Command, Output};

fn dmc(
    dir: &Path,
    args: &[&str],
) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dmc"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("dmc runs")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const SOURCE: &str = "#ifdef HARD_MODE\n/proc/difficulty()\n\treturn 2\n#else\n/proc/difficulty()\n\treturn 1\n#endif\n";

#[test]
fn test_compile_then_disassemble() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("game.dme"), SOURCE).unwrap();

    let compiled = dmc(dir.path(), &["compile", "game.dme", "-o", "out.json"]);
    assert!(compiled.status.success(), "{}", String::from_utf8_lossy(&compiled.stderr));
    assert!(stdout(&compiled).contains("Compilation succeeded"));
    assert!(dir.path().join("out.json").is_file());

    let listing = dmc(dir.path(), &["disasm", "out.json", "--proc", "difficulty"]);
    assert!(listing.status.success());
    assert!(stdout(&listing).contains("PushFloat 1"));
}

#[test]
fn test_define_flag_reaches_the_preprocessor() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("game.dme"), SOURCE).unwrap();

    let text = dmc(dir.path(), &["preprocess", "game.dme", "-D", "HARD_MODE"]);
    assert!(text.status.success());
    assert!(stdout(&text).contains("return 2"));
    assert!(!stdout(&text).contains("return 1"));
}

#[test]
fn test_config_beside_the_input_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("game.dme"), SOURCE).unwrap();
    std::fs::write(
        dir.path().join("dmc.toml"),
        "[defines]\nHARD_MODE = \"1\"\n\n[output]\npretty_artifact = false\n",
    )
    .unwrap();

    let compiled = dmc(dir.path(), &["compile", "game.dme"]);
    assert!(compiled.status.success());

    let artifact = std::fs::read_to_string(dir.path().join("game.json")).unwrap();
    assert!(!artifact.contains('\n'));
    let listing = dmc(dir.path(), &["disasm", "game.json"]);
    assert!(stdout(&listing).contains("PushFloat 2"));
}

#[test]
fn test_errors_give_a_failing_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("game.dme"), "/proc/broken()\n\treturn (1 +\n").unwrap();

    let compiled = dmc(dir.path(), &["compile", "game.dme", "--json"]);
    assert!(!compiled.status.success());
    assert!(!dir.path().join("game.json").exists());
    assert!(stdout(&compiled).contains("\"level\""));
}

#[test]
fn test_map_and_ntsl_commands() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("test.dmm"),
        "\"a\" = (/turf/floor,/area/space)\n\n(1,1,1) = {\"\naa\naa\n\"}\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("relay.ntsl"), "def relay() {\n\t$count = 1;\n\treturn $count;\n}\n").unwrap();

    let map = dmc(dir.path(), &["map", "test.dmm"]);
    assert!(map.status.success());
    assert!(stdout(&map).contains("2x2x1"));

    let script = dmc(dir.path(), &["ntsl", "relay.ntsl"]);
    assert!(script.status.success(), "{}", String::from_utf8_lossy(&script.stderr));
    assert!(stdout(&script).contains("def relay() uses [count]"));
}
