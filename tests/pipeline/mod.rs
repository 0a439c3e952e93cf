// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tsprobe::unstable::*;
use tsprobe::{BuiltinEngine, TypeEngine};

fn project(name: &str) -> Project {
    Project::new(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("projects")
            .join(name),
    )
}

fn parse_file(name: &str, contents: &str) -> Result<Ref<SourceFile>> {
    let source = Source::from_contents(name, contents.to_string())?;
    Ok(Ref::new(Parser::new(&source)?.parse()?))
}

/// Serves in-memory files and names every callee `typeof <callee text>`.
#[derive(Default)]
struct FakeEngine {
    files: BTreeMap<PathBuf, String>,
    config_errors: Vec<Diagnostic>,
    diagnostics: Vec<Diagnostic>,
    lookups: Cell<usize>,
}

impl FakeEngine {
    fn with_main(root: &Path, contents: &str) -> Self {
        let mut engine = FakeEngine::default();
        engine
            .files
            .insert(root.join("main.ts"), contents.to_string());
        engine
    }
}

impl TypeEngine for FakeEngine {
    type Program = Vec<Ref<SourceFile>>;
    type Type = String;

    fn parse_config(&self, _config_path: &Path, _root: &Path) -> Result<ParsedConfig> {
        Ok(ParsedConfig {
            file_names: self.files.keys().cloned().collect(),
            options: CompilerOptions::new(),
            errors: self.config_errors.clone(),
        })
    }

    fn create_program(
        &self,
        root_files: &[PathBuf],
        _options: &CompilerOptions,
    ) -> Result<Self::Program> {
        root_files
            .iter()
            .map(|path| {
                let contents = self
                    .files
                    .get(path)
                    .ok_or_else(|| anyhow!("{} is not a fake file", path.display()))?;
                let source = Source::from_contents(path.clone(), contents.clone())?;
                Ok(Ref::new(Parser::new(&source)?.parse()?))
            })
            .collect()
    }

    fn source_file(&self, program: &Self::Program, path: &Path) -> Option<Ref<SourceFile>> {
        program.iter().find(|f| f.source.file() == path).cloned()
    }

    fn pre_emit_diagnostics(
        &self,
        _program: &Self::Program,
        _file: &Ref<SourceFile>,
    ) -> Vec<Diagnostic> {
        self.diagnostics.clone()
    }

    fn type_at_location(&self, _program: &Self::Program, node: &Ref<Expr>) -> String {
        self.lookups.set(self.lookups.get() + 1);
        format!("typeof {}", node.span().text())
    }

    fn type_to_string(&self, _program: &Self::Program, ty: &String, _enclosing: &Ref<Stmt>) -> String {
        ty.clone()
    }
}

#[test]
fn builtin_engine_reports_callee_types() -> Result<()> {
    let report = run(&BuiltinEngine::new(), &project("ok"))?;
    assert_eq!(report.first, "(name: string) => string");
    assert_eq!(report.second, "(...data: any[]) => void");
    assert_eq!(
        report.to_string(),
        "First type: (name: string) => string\nSecond type: (...data: any[]) => void"
    );
    Ok(())
}

#[test]
fn alias_names_are_kept() -> Result<()> {
    let report = run(&BuiltinEngine::new(), &project("aliases"))?;
    assert_eq!(report.first, "Handler");
    assert_eq!(report.second, "<T>(value: T) => Box<T>");
    Ok(())
}

#[test]
fn demo_project_prints_alias_names() -> Result<()> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("input");
    let report = run(&BuiltinEngine::new(), &Project::new(root))?;
    // `Formatter` is declared in lib.ts and not imported into main.ts.
    assert_eq!(report.first, "Formatter");
    assert_eq!(report.second, "<T>(name: string, value: T) => T[]");
    Ok(())
}

#[test]
fn roots_with_parent_components() -> Result<()> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("projects")
        .join("ok")
        .join("..")
        .join("type-error");
    let project = Project::new(root.clone());
    assert!(!project.root.components().any(|c| c == Component::ParentDir));
    match run(&BuiltinEngine::new(), &project) {
        Ok(report) => bail!("expected a failure, got {report:?}"),
        Err(err) => assert_eq!(
            err.render(&project.root, false),
            "main.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.\n"
        ),
    }

    let project = Project::new(root.join("..").join("nowhere"));
    match run(&BuiltinEngine::new(), &project) {
        Ok(report) => bail!("expected a failure, got {report:?}"),
        Err(err) => {
            let rendered = err.render(&project.root, false);
            assert!(!rendered.contains(".."), "{rendered}");
            assert!(rendered.contains("projects/nowhere\" does not appear"), "{rendered}");
        }
    }
    Ok(())
}

#[test]
fn repeated_runs_agree() -> Result<()> {
    let engine = BuiltinEngine::new();
    let first = run(&engine, &project("aliases"))?;
    let second = run(&engine, &project("aliases"))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn failures_render_like_the_command_line() -> Result<()> {
    let engine = BuiltinEngine::new();
    let cases = [
        (
            "not-a-function",
            "Error - Unable to find expected function-declaration in 'main.ts'",
        ),
        (
            "too-few",
            "Error - Unable to find expected body of function-declaration (found 1 statement(s), expected at least 2)",
        ),
        (
            "not-a-call",
            "Error - Expected \"const x = 1;\" to be a call-expression",
        ),
        (
            "missing-body",
            "Error - Unable to find expected body of function-declaration",
        ),
        (
            "missing-source",
            "Error - Unable to get source-file 'main.ts'",
        ),
        (
            "type-error",
            "main.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.\n",
        ),
    ];
    for (name, expected) in cases {
        let project = project(name);
        match run(&engine, &project) {
            Ok(report) => bail!("{name}: expected a failure, got {report:?}"),
            Err(err) => assert_eq!(err.render(&project.root, false), expected, "{name}"),
        }
    }
    Ok(())
}

#[test]
fn not_a_project() {
    let project = project("does-not-exist");
    let err = match run(&BuiltinEngine::new(), &project) {
        Ok(report) => panic!("expected a failure, got {report:?}"),
        Err(err) => err,
    };
    assert!(matches!(err, QueryError::NotAProject { .. }));
    let rendered = err.render(&project.root, false);
    assert!(rendered.starts_with("Error - Path at \""), "{rendered}");
    assert!(rendered.ends_with("does-not-exist\" does not appear to be a TypeScript project"));
}

#[test]
fn config_errors_stop_the_query() {
    let project = project("bad-config");
    let err = match run(&BuiltinEngine::new(), &project) {
        Ok(report) => panic!("expected a failure, got {report:?}"),
        Err(err) => err,
    };
    let rendered = err.render(&project.root, false);
    assert!(rendered.starts_with("Errors parsing \""), "{rendered}");
    assert!(rendered.ends_with(
        "tsconfig.json\"\ntsconfig.json(4,5): error TS5023: Unknown compiler option 'bogus'.\n"
    ));
    assert_eq!(err.diagnostics().map(|d| d.len()), Some(1));
}

#[test]
fn syntax_errors_are_reported_first() {
    let project = project("syntax-error");
    let err = match run(&BuiltinEngine::new(), &project) {
        Ok(report) => panic!("expected a failure, got {report:?}"),
        Err(err) => err,
    };
    assert!(matches!(err, QueryError::TypeCheck { .. }));
    let rendered = err.render(&project.root, false);
    assert!(rendered.starts_with("main.ts(2,"), "{rendered}");
    assert!(rendered.contains(": error TS"), "{rendered}");
}

#[test]
fn fake_engine_drives_the_query() -> Result<()> {
    let project = project("ok");
    let engine = FakeEngine::with_main(
        &project.root,
        "const a = 1;\nfunction main() {\n  first(1);\n  obj.second();\n  third();\n}\n",
    );
    let report = run(&engine, &project)?;
    assert_eq!(report.first, "typeof first");
    assert_eq!(report.second, "typeof obj.second");
    assert_eq!(engine.lookups.get(), 2);
    Ok(())
}

#[test]
fn diagnostics_gate_type_lookups() -> Result<()> {
    let project = project("ok");
    let mut engine = FakeEngine::with_main(
        &project.root,
        "const a = 1;\nfunction main() {\n  first();\n  second();\n}\n",
    );
    engine.diagnostics.push(Diagnostic::error(None, 2304, "Cannot find name 'first'."));

    match run(&engine, &project) {
        Ok(report) => bail!("expected a failure, got {report:?}"),
        Err(err) => {
            assert_eq!(err.render(&project.root, false), "error TS2304: Cannot find name 'first'.\n");
        }
    }
    assert_eq!(engine.lookups.get(), 0);
    Ok(())
}

#[test]
fn config_errors_gate_program_creation() -> Result<()> {
    let project = project("ok");
    let mut engine = FakeEngine::with_main(&project.root, "this is not parsed");
    engine
        .config_errors
        .push(Diagnostic::error(None, 5023, "Unknown compiler option 'x'."));
    match run(&engine, &project) {
        Ok(report) => bail!("expected a failure, got {report:?}"),
        Err(QueryError::ConfigDiagnostics { diagnostics, .. }) => {
            assert_eq!(diagnostics.len(), 1);
        }
        Err(err) => bail!("unexpected error {err}"),
    }
    Ok(())
}

#[test]
fn call_site_shapes() -> Result<()> {
    let cases = [
        ("function main() {}\n", "Unable to find expected function-declaration in 'main.ts'"),
        ("const a = 1;\n", "Unable to find expected function-declaration in 'main.ts'"),
        (
            "const a = 1;\nconst main = () => { f(); g(); };\n",
            "Unable to find expected function-declaration in 'main.ts'",
        ),
        (
            "const a = 1;\nfunction main() {}\n",
            "Unable to find expected body of function-declaration (found 0 statement(s), expected at least 2)",
        ),
        (
            "const a = 1;\nfunction main() {\n  f();\n  g.h;\n}\n",
            "Expected \"g.h\" to be a call-expression",
        ),
        (
            "const a = 1;\nfunction main() {\n  return;\n  f();\n}\n",
            "Expected \"return;\" to be a call-expression",
        ),
    ];
    for (ts, expected) in cases {
        let file = parse_file("main.ts", ts)?;
        match locate_call_sites(&file, "main.ts") {
            Ok(calls) => bail!("{ts}: expected a failure, got {} callees", calls.callees.len()),
            Err(err) => assert_eq!(err.to_string(), expected, "{ts}"),
        }
    }

    // Only the first two body statements matter.
    let file = parse_file(
        "main.ts",
        "const a = 1;\nfunction main() {\n  f();\n  (g)(1);\n  let x = 2;\n}\n",
    )?;
    let calls = locate_call_sites(&file, "main.ts")?;
    let texts: Vec<&str> = calls.callees.iter().map(|c| c.span().text()).collect();
    assert_eq!(texts, vec!["f", "(g)"]);
    Ok(())
}
