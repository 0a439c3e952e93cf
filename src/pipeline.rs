// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The call-target type query.
//!
//! Stages run strictly in order and each one either hands its output to the
//! next or stops the whole query with a [`QueryError`]:
//!
//! `Start -> ConfigLoaded -> ProgramBuilt -> DiagnosticsClean ->
//! StatementsLocated -> TypesReported`

use crate::ast::*;
use crate::config::ParsedConfig;
use crate::diagnostics::{self, Diagnostic};
use crate::engine::TypeEngine;
use crate::program::normalize_path;

use core::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "tsconfig.json";
pub const TARGET_FILE: &str = "main.ts";

/// Position of the queried function among the top-level statements of the
/// target file. Purely positional; nothing else identifies the declaration.
pub const TARGET_DECLARATION_INDEX: usize = 1;

/// Number of leading body statements that must be calls.
pub const REQUIRED_CALL_STATEMENTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub target_file: String,
}

impl Project {
    /// `root` is normalized lexically so that reported paths can be shown
    /// relative to it.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = normalize_path(&root.into());
        Self {
            config_path: root.join(CONFIG_FILE),
            root,
            target_file: TARGET_FILE.to_string(),
        }
    }

    pub fn with_target_file(mut self, name: &str) -> Self {
        self.target_file = name.to_string();
        self
    }

    pub fn target_path(&self) -> PathBuf {
        normalize_path(&self.root.join(&self.target_file))
    }
}

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("Unable to find expected function-declaration in '{file}'")]
    NotAFunctionDeclaration { file: String },

    #[error("Unable to find expected body of function-declaration")]
    MissingBody,

    #[error(
        "Unable to find expected body of function-declaration (found {found} statement(s), expected at least {})",
        REQUIRED_CALL_STATEMENTS
    )]
    TooFewStatements { found: usize },

    #[error("Expected \"{text}\" to be a call-expression")]
    NotACallExpression { text: String },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Path at {} does not appear to be a TypeScript project", quoted(.root))]
    NotAProject { root: PathBuf },

    #[error("Errors parsing {}", quoted(.path))]
    ConfigDiagnostics {
        path: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Unable to get source-file '{name}'")]
    MissingSourceFile { name: String },

    #[error("{} error(s) found in the target file", .diagnostics.len())]
    TypeCheck { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

fn quoted(path: &Path) -> String {
    let path = path.display().to_string();
    serde_json::to_string(&path).unwrap_or(path)
}

impl QueryError {
    pub fn diagnostics(&self) -> Option<&[Diagnostic]> {
        match self {
            QueryError::ConfigDiagnostics { diagnostics, .. }
            | QueryError::TypeCheck { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }

    /// What the command line prints for this failure. Diagnostic paths are
    /// shown relative to `root`.
    pub fn render(&self, root: &Path, pretty: bool) -> String {
        let block = |diagnostics: &[Diagnostic]| {
            if pretty {
                diagnostics::format_diagnostics_with_context(diagnostics)
            } else {
                diagnostics::format_diagnostics(diagnostics, root)
            }
        };
        match self {
            QueryError::ConfigDiagnostics { diagnostics, .. } => {
                format!("{self}\n{}", block(diagnostics))
            }
            QueryError::TypeCheck { diagnostics } => block(diagnostics),
            _ => format!("Error - {self}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ConfigLoaded,
    ProgramBuilt,
    DiagnosticsClean,
    StatementsLocated,
    TypesReported,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Start => "start",
            Stage::ConfigLoaded => "config-loaded",
            Stage::ProgramBuilt => "program-built",
            Stage::DiagnosticsClean => "diagnostics-clean",
            Stage::StatementsLocated => "statements-located",
            Stage::TypesReported => "types-reported",
        })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("{stage} -> {next}");
    *stage = next;
}

/// The two callee expressions of the target function.
#[derive(Debug, Clone)]
pub struct CallSites {
    pub declaration: Ref<Stmt>,
    pub callees: Vec<Ref<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub first: String,
    pub second: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "First type: {}", self.first)?;
        write!(f, "Second type: {}", self.second)
    }
}

pub fn run<E: TypeEngine>(engine: &E, project: &Project) -> Result<Report, QueryError> {
    let mut stage = Stage::Start;
    info!("querying project {}", project.root.display());

    let config = load_config(engine, project)?;
    advance(&mut stage, Stage::ConfigLoaded);

    let program = engine.create_program(&config.file_names, &config.options)?;
    advance(&mut stage, Stage::ProgramBuilt);

    let file = target_source_file(engine, &program, project)?;
    check_diagnostics(engine, &program, &file)?;
    advance(&mut stage, Stage::DiagnosticsClean);

    let calls = locate_call_sites(&file, &project.target_file)?;
    advance(&mut stage, Stage::StatementsLocated);

    let report = report_types(engine, &program, &calls);
    advance(&mut stage, Stage::TypesReported);
    Ok(report)
}

/// Pre-emit diagnostics for every input file, without running the query.
pub fn diagnose<E: TypeEngine>(engine: &E, project: &Project) -> Result<Vec<Diagnostic>, QueryError> {
    let config = load_config(engine, project)?;
    let program = engine.create_program(&config.file_names, &config.options)?;
    let mut all = vec![];
    for path in &config.file_names {
        if let Some(file) = engine.source_file(&program, path) {
            all.extend(engine.pre_emit_diagnostics(&program, &file));
        }
    }
    diagnostics::sort_and_deduplicate(&mut all);
    Ok(all)
}

pub fn load_config<E: TypeEngine>(engine: &E, project: &Project) -> Result<ParsedConfig, QueryError> {
    if !project.config_path.is_file() {
        return Err(QueryError::NotAProject {
            root: project.root.clone(),
        });
    }
    let config = engine.parse_config(&project.config_path, &project.root)?;
    if !config.errors.is_empty() {
        return Err(QueryError::ConfigDiagnostics {
            path: project.config_path.clone(),
            diagnostics: config.errors,
        });
    }
    info!("{} input file(s)", config.file_names.len());
    Ok(config)
}

pub fn target_source_file<E: TypeEngine>(
    engine: &E,
    program: &E::Program,
    project: &Project,
) -> Result<Ref<SourceFile>, QueryError> {
    engine
        .source_file(program, &project.target_path())
        .ok_or_else(|| QueryError::MissingSourceFile {
            name: project.target_file.clone(),
        })
}

/// Stops the query when the target file has any pre-emit diagnostic.
pub fn check_diagnostics<E: TypeEngine>(
    engine: &E,
    program: &E::Program,
    file: &Ref<SourceFile>,
) -> Result<(), QueryError> {
    let diagnostics = engine.pre_emit_diagnostics(program, file);
    info!("{} diagnostic(s) in {}", diagnostics.len(), file.source.file().display());
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(QueryError::TypeCheck { diagnostics })
    }
}

pub fn locate_call_sites(file: &Ref<SourceFile>, name: &str) -> Result<CallSites, ShapeError> {
    let not_a_function = || ShapeError::NotAFunctionDeclaration {
        file: name.to_string(),
    };
    let stmt = file
        .statements
        .get(TARGET_DECLARATION_INDEX)
        .ok_or_else(not_a_function)?;
    let body = match stmt.as_ref() {
        Stmt::Function(FunctionDecl { body: Some(body), .. }) => body,
        Stmt::Function(_) => return Err(ShapeError::MissingBody),
        _ => return Err(not_a_function()),
    };
    if body.statements.len() < REQUIRED_CALL_STATEMENTS {
        return Err(ShapeError::TooFewStatements {
            found: body.statements.len(),
        });
    }

    let callees = body.statements[..REQUIRED_CALL_STATEMENTS]
        .iter()
        .map(call_target)
        .collect::<Result<Vec<_>, _>>()?;
    debug!("located calls to {:?}", callees);
    Ok(CallSites {
        declaration: stmt.clone(),
        callees,
    })
}

fn call_target(stmt: &Ref<Stmt>) -> Result<Ref<Expr>, ShapeError> {
    let expr = match stmt.as_ref() {
        Stmt::Expr { expr, .. } => expr,
        other => {
            return Err(ShapeError::NotACallExpression {
                text: other.span().text().to_string(),
            })
        }
    };
    match expr.as_ref() {
        Expr::Call { callee, .. } => Ok(callee.clone()),
        other => Err(ShapeError::NotACallExpression {
            text: other.span().text().to_string(),
        }),
    }
}

pub fn report_types<E: TypeEngine>(engine: &E, program: &E::Program, calls: &CallSites) -> Report {
    let mut rendered = calls.callees.iter().map(|callee| {
        let ty = engine.type_at_location(program, callee);
        engine.type_to_string(program, &ty, &calls.declaration)
    });
    Report {
        first: rendered.next().unwrap_or_default(),
        second: rendered.next().unwrap_or_default(),
    }
}
