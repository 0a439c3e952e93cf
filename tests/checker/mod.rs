// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use test_generator::test_resources;
use tsprobe::unstable::*;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Case {
    pub note: String,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
    pub files: BTreeMap<String, String>,
    // Declared name in main.ts -> rendered type.
    #[serde(default)]
    pub types: BTreeMap<String, String>,
    // Expected diagnostic codes for main.ts, in order.
    #[serde(default)]
    pub codes: Vec<u32>,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn write_files(dir: &Path, files: &BTreeMap<String, String>) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    for (name, contents) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
    }
    Ok(())
}

fn case_dir(file: &str, idx: usize) -> PathBuf {
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Path::new(env!("CARGO_TARGET_TMPDIR"))
        .join("checker")
        .join(format!("{stem}-{idx}"))
}

fn run_case(dir: &Path, case: &Case) -> Result<()> {
    write_files(dir, &case.files)?;
    let mut options = CompilerOptions::new();
    for (name, value) in &case.options {
        options.set(name, value.clone());
    }

    let main = dir.join("main.ts");
    let program = Program::new(&[main.clone()], &options)?;
    let file = program
        .file_index(&main)
        .ok_or_else(|| anyhow!("main.ts was not loaded"))?;

    let diagnostics = program.pre_emit_diagnostics(file);
    let codes: Vec<u32> = diagnostics.iter().map(|d| d.code).collect();
    if codes != case.codes {
        bail!(
            "diagnostic mismatch\nexpected {:?}\nactual   {:?}\n{}",
            case.codes,
            codes,
            format_diagnostics(&diagnostics, dir)
        );
    }
    for expected in &case.messages {
        if !diagnostics.iter().any(|d| d.message.contains(expected.as_str())) {
            bail!(
                "no diagnostic contains `{expected}`\n{}",
                format_diagnostics(&diagnostics, dir)
            );
        }
    }

    let checker = program.type_checker();
    for (name, expected) in &case.types {
        let stmt = program
            .file(file)
            .statements
            .iter()
            .find(|s| match s.as_ref() {
                Stmt::Function(f) => f.name.text() == name,
                Stmt::Var(v) => v.name.text() == name,
                _ => false,
            })
            .ok_or_else(|| anyhow!("no declaration named {name}"))?;
        let ty = checker
            .declared_type(stmt)
            .ok_or_else(|| anyhow!("{name} has no type"))?;
        let actual = checker.type_to_string(&ty, stmt);
        if &actual != expected {
            bail!("type of {name}\nexpected {expected}\nactual   {actual}");
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {}", file);

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for (idx, case) in test.cases.iter().enumerate() {
        print!("case {} ", &case.note);
        if let Err(e) = run_case(&case_dir(file, idx), case) {
            bail!("case {} failed: {e}", case.note);
        }
        println!("passed");
    }
    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/checker/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn type_at_call_targets() -> Result<()> {
    let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("checker").join("callees");
    let mut files = BTreeMap::new();
    files.insert(
        "main.ts".to_string(),
        "const log = (msg: string) => {};\nfunction main() {\n  log(\"a\");\n  console.log(1);\n}\n"
            .to_string(),
    );
    write_files(&dir, &files)?;

    let main = dir.join("main.ts");
    let program = Program::new(&[main.clone()], &CompilerOptions::new())?;
    let file = program
        .source_file(&main)
        .ok_or_else(|| anyhow!("main.ts was not loaded"))?;
    let Stmt::Function(f) = file.statements[1].as_ref() else {
        bail!("expected a function");
    };
    let body = f.body.as_ref().ok_or_else(|| anyhow!("missing body"))?;

    let checker = program.type_checker();
    let mut rendered = vec![];
    for stmt in &body.statements {
        let Stmt::Expr { expr, .. } = stmt.as_ref() else {
            bail!("expected an expression statement");
        };
        let Expr::Call { callee, .. } = expr.as_ref() else {
            bail!("expected a call");
        };
        let ty = checker.type_at_location(callee);
        rendered.push(checker.type_to_string(&ty, &file.statements[1]));
    }
    assert_eq!(
        rendered,
        vec!["(msg: string) => void", "(...data: any[]) => void"]
    );
    Ok(())
}
