// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::binder::*;
use crate::checker::{CheckerState, TypeChecker};
use crate::config::CompilerOptions;
use crate::diagnostics::Diagnostic;
use crate::lexer::Source;
use crate::parser::Parser;

use core::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use log::{debug, info};

const EXTENSIONS: [&str; 2] = [".ts", ".d.ts"];

/// All parsed and bound input files together with the options they were
/// compiled with. Read-only once built; type information is computed lazily
/// through [`Program::type_checker`].
pub struct Program {
    options: CompilerOptions,
    files: Vec<Ref<SourceFile>>,
    paths: BTreeMap<PathBuf, usize>,
    syntax_diagnostics: Vec<Vec<Diagnostic>>,
    global_diagnostics: Vec<Diagnostic>,
    // Import statement -> resolved file.
    resolutions: BTreeMap<usize, Option<usize>>,
    binder: Binder,
    pub(crate) state: RefCell<CheckerState>,
}

impl Program {
    /// Loads, parses and binds the root files and every file they import.
    pub fn new(root_files: &[PathBuf], options: &CompilerOptions) -> Result<Program> {
        let mut program = Program {
            options: options.clone(),
            files: vec![],
            paths: BTreeMap::new(),
            syntax_diagnostics: vec![],
            global_diagnostics: vec![],
            resolutions: BTreeMap::new(),
            binder: Binder::default(),
            state: RefCell::new(CheckerState::default()),
        };

        let mut queue: VecDeque<PathBuf> = root_files.iter().map(|p| normalize_path(p)).collect();
        while let Some(path) = queue.pop_front() {
            if program.paths.contains_key(&path) {
                continue;
            }
            let source = match Source::from_file(&path) {
                Ok(source) => source,
                Err(_) => {
                    let msg = format!("File '{}' not found.", path.display());
                    program
                        .global_diagnostics
                        .push(Diagnostic::error(None, 6053, &msg));
                    continue;
                }
            };
            debug!("parsing {}", path.display());

            let (file, syntax) = parse_source(&source)?;
            for stmt in &file.statements {
                if let Stmt::Import(import) = stmt.as_ref() {
                    if let Some(target) = resolve_module_path(&path, &import.module_name) {
                        queue.push_back(target);
                    }
                }
            }
            program.paths.insert(path, program.files.len());
            program.files.push(Ref::new(file));
            program.syntax_diagnostics.push(syntax);
        }

        // Resolve imports now that every reachable file has an index.
        for file in &program.files {
            for stmt in &file.statements {
                if let Stmt::Import(import) = stmt.as_ref() {
                    let target = resolve_module_path(file.source.file(), &import.module_name)
                        .and_then(|p| program.paths.get(&p).copied());
                    program.resolutions.insert(stmt.id(), target);
                }
            }
        }

        program.binder = Binder::bind(&program.files);
        info!(
            "program built: {} root file(s), {} file(s) total",
            root_files.len(),
            program.files.len()
        );
        Ok(program)
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn files(&self) -> &[Ref<SourceFile>] {
        &self.files
    }

    pub fn file(&self, idx: usize) -> &Ref<SourceFile> {
        &self.files[idx]
    }

    pub fn source_file(&self, path: &Path) -> Option<Ref<SourceFile>> {
        self.file_index(path).map(|idx| self.files[idx].clone())
    }

    pub fn file_index(&self, path: &Path) -> Option<usize> {
        self.paths.get(&normalize_path(path)).copied()
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// The file an import statement refers to, if it could be resolved.
    pub fn resolved_import(&self, import: &Ref<Stmt>) -> Option<usize> {
        self.resolutions.get(&import.id()).copied().flatten()
    }

    pub fn syntactic_diagnostics(&self, file: usize) -> &[Diagnostic] {
        &self.syntax_diagnostics[file]
    }

    pub fn global_diagnostics(&self) -> &[Diagnostic] {
        &self.global_diagnostics
    }

    pub fn type_checker(&self) -> TypeChecker<'_> {
        TypeChecker::new(self)
    }

    /// Syntax errors of `file`; when there are none, program-wide and semantic
    /// errors instead.
    pub fn pre_emit_diagnostics(&self, file: usize) -> Vec<Diagnostic> {
        let syntax = self.syntactic_diagnostics(file);
        if !syntax.is_empty() {
            return syntax.to_vec();
        }
        let mut diagnostics = self.global_diagnostics.clone();
        diagnostics.extend(self.type_checker().semantic_diagnostics(file));
        diagnostics
    }
}

// A syntax error ends parsing of the file; the file is kept with the
// statements that are not available.
fn parse_source(source: &Source) -> Result<(SourceFile, Vec<Diagnostic>)> {
    let parsed = Parser::new(source).and_then(|mut parser| parser.parse());
    match parsed {
        Ok(file) => Ok((file, vec![])),
        Err(err) => match err.downcast::<Diagnostic>() {
            Ok(diagnostic) => Ok((
                SourceFile {
                    source: source.clone(),
                    statements: vec![],
                },
                vec![diagnostic],
            )),
            Err(err) => Err(err),
        },
    }
}

/// Resolves a relative module specifier against the importing file, trying
/// `.ts`, `.d.ts` and `index.ts`.
pub fn resolve_module_path(from: &Path, specifier: &str) -> Option<PathBuf> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let dir = from.parent()?;
    let base = normalize_path(&dir.join(specifier));
    let base_str = base.to_string_lossy();

    let mut candidates = vec![];
    if base_str.ends_with(".ts") {
        candidates.push(base.clone());
    }
    for ext in EXTENSIONS {
        candidates.push(PathBuf::from(format!("{base_str}{ext}")));
    }
    for ext in EXTENSIONS {
        candidates.push(base.join(format!("index{ext}")));
    }
    candidates.into_iter().find(|p| p.is_file())
}

/// Lexically removes `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            c => out.push(c.as_os_str()),
        }
    }
    out
}
