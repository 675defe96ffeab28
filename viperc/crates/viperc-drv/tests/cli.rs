//! End-to-end driver tests.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn viperc() -> Command {
    Command::cargo_bin("viperc").expect("binary built")
}

fn source_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write source");
    file
}

#[test]
fn no_input_files_exits_one() {
    viperc()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no input files"));
}

#[test]
fn missing_file_exits_one() {
    viperc()
        .arg("definitely-not-here.vpr")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not read file"));
}

#[test]
fn valid_program_exits_zero() {
    let file = source_file("let i32 main() = { return 0; };");
    viperc()
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn parse_error_exits_one_with_caret() {
    let file = source_file("let i32 a = ;\nlet i32 b = 1;");
    viperc()
        .arg(file.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: expected primary expression"))
        .stderr(predicate::str::contains("let i32 a = ;"))
        .stderr(predicate::str::contains("^"));
}

#[test]
fn type_error_exits_one() {
    let file = source_file("let bool f() = return 1;");
    viperc()
        .arg(file.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("return type mismatch"));
}

#[test]
fn warnings_do_not_fail_the_build() {
    let file = source_file("let i32 f() = { let i32 unused_one; return 0; };");
    viperc()
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: unused variable 'unused_one'"));
}

#[test]
fn wno_disables_a_warning() {
    let file = source_file("let i32 f() = { let i32 unused_one; return 0; };");
    viperc()
        .arg("-Wno-unused-variable")
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn w_reenables_a_warning() {
    let file = source_file("let i32 f() = { let i32 unused_one; return 0; };");
    viperc()
        .arg("-Wno-unused-variable")
        .arg("-Wunused-variable")
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("unused variable"));
}

#[test]
fn unknown_warning_name_is_ignored() {
    let file = source_file("let i32 main() = { return 0; };");
    viperc()
        .arg("-Wno-such-warning")
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn emit_tokens_dumps_the_stream() {
    let file = source_file("let i32 x = 42;");
    viperc()
        .arg("--emit")
        .arg("tokens")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("LetKeyword"))
        .stdout(predicate::str::contains("IntegerLiteral \"42\""));
}

#[test]
fn emit_ast_dumps_the_tree() {
    let file = source_file("let i32 main() = { return 0; };");
    viperc()
        .arg("--emit")
        .arg("ast")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Function"))
        .stdout(predicate::str::contains("\"main\""));
}

#[test]
fn unknown_option_exits_one() {
    viperc()
        .arg("--frobnicate")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown option"));
}

#[test]
fn empty_input_is_accepted() {
    let file = source_file("");
    viperc().arg(file.path()).assert().success();
}

#[test]
fn struct_and_class_program_compiles() {
    let file = source_file(
        "struct P { i32 x; i32 y; };\n\
         class Counter { i32 n; i32 bump() = { this.n += 1; return this.n; }; };\n\
         let i32 read(P* p) = return p.x + p.y;\n",
    );
    viperc()
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}
