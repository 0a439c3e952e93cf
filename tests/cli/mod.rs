// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::Result;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("projects")
        .join(name)
}

fn tsprobe(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_tsprobe"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()?)
}

fn query(name: &str) -> Result<(i32, String)> {
    let root = fixture(name);
    let output = tsprobe(&["--project", &root.to_string_lossy()])?;
    Ok((
        output.status.code().unwrap_or(-1),
        String::from_utf8(output.stdout)?,
    ))
}

#[test]
fn prints_both_types() -> Result<()> {
    let (code, stdout) = query("ok")?;
    assert_eq!(code, 0, "{stdout}");
    assert_eq!(
        stdout,
        "First type: (name: string) => string\nSecond type: (...data: any[]) => void\n"
    );
    Ok(())
}

#[test]
fn output_is_stable() -> Result<()> {
    let first = query("aliases")?;
    let second = query("aliases")?;
    assert_eq!(first, second);
    assert_eq!(first.0, 0);
    Ok(())
}

#[test]
fn type_errors_exit_with_failure() -> Result<()> {
    let (code, stdout) = query("type-error")?;
    assert_eq!(code, 1);
    // The block of diagnostics is followed by an empty line.
    assert_eq!(
        stdout,
        "main.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.\n\n"
    );
    Ok(())
}

#[test]
fn project_paths_are_normalized() -> Result<()> {
    let root = fixture("ok").join("..").join("type-error");
    let output = tsprobe(&["--project", &root.to_string_lossy()])?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8(output.stdout)?,
        "main.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.\n\n"
    );
    Ok(())
}

#[test]
fn shape_errors_exit_with_failure() -> Result<()> {
    let (code, stdout) = query("not-a-call")?;
    assert_eq!(code, 1);
    assert_eq!(stdout, "Error - Expected \"const x = 1;\" to be a call-expression\n");
    Ok(())
}

#[test]
fn missing_project() -> Result<()> {
    let (code, stdout) = query("nowhere")?;
    assert_eq!(code, 1);
    assert!(stdout.starts_with("Error - Path at \""), "{stdout}");
    assert!(stdout.ends_with(" does not appear to be a TypeScript project\n"));
    Ok(())
}

#[test]
fn pretty_diagnostics_show_source() -> Result<()> {
    let root = fixture("type-error");
    let output = tsprobe(&["--project", &root.to_string_lossy(), "--pretty"])?;
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("const count: number = \"three\";"), "{stdout}");
    assert!(stdout.contains("error TS2322: Type 'string'"), "{stdout}");
    Ok(())
}

#[test]
fn diagnose_lists_every_file() -> Result<()> {
    let root = fixture("type-error");
    let output = tsprobe(&["--project", &root.to_string_lossy(), "diagnose"])?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8(output.stdout)?,
        "main.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.\n"
    );

    let root = fixture("ok");
    let output = tsprobe(&["--project", &root.to_string_lossy(), "diagnose"])?;
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn parse_subcommand() -> Result<()> {
    let file = fixture("ok").join("main.ts");
    let output = tsprobe(&["parse", &file.to_string_lossy()])?;
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Import"), "{stdout}");
    assert!(stdout.contains("Function"), "{stdout}");
    Ok(())
}
