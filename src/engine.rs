// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::config::{self, CompilerOptions, ParsedConfig};
use crate::diagnostics::Diagnostic;
use crate::program::Program;
use crate::types::Type;

use std::path::{Path, PathBuf};

use anyhow::Result;

/// Type-checking capabilities the query pipeline is driven through.
///
/// The pipeline never inspects a program or a type directly; everything it
/// needs goes through this trait so that it can be exercised against any
/// checker, including fakes in tests.
pub trait TypeEngine {
    type Program;
    type Type;

    /// Parses a config file into input files, options and positioned
    /// diagnostics. `Err` is reserved for I/O failures.
    fn parse_config(&self, config_path: &Path, root: &Path) -> Result<ParsedConfig>;

    fn create_program(&self, root_files: &[PathBuf], options: &CompilerOptions)
        -> Result<Self::Program>;

    /// The parsed file at `path`, if it is part of `program`.
    fn source_file(&self, program: &Self::Program, path: &Path) -> Option<Ref<SourceFile>>;

    /// Syntax errors of `file`, or program-wide and semantic errors when it
    /// parsed cleanly.
    fn pre_emit_diagnostics(&self, program: &Self::Program, file: &Ref<SourceFile>)
        -> Vec<Diagnostic>;

    fn type_at_location(&self, program: &Self::Program, node: &Ref<Expr>) -> Self::Type;

    /// Renders `ty` as seen from `enclosing`.
    fn type_to_string(
        &self,
        program: &Self::Program,
        ty: &Self::Type,
        enclosing: &Ref<Stmt>,
    ) -> String;
}

/// The checker shipped with the crate.
#[derive(Debug, Clone, Default)]
pub struct BuiltinEngine {}

impl BuiltinEngine {
    pub fn new() -> Self {
        Self {}
    }
}

impl TypeEngine for BuiltinEngine {
    type Program = Program;
    type Type = Type;

    fn parse_config(&self, config_path: &Path, root: &Path) -> Result<ParsedConfig> {
        config::read_config(config_path, root)
    }

    fn create_program(&self, root_files: &[PathBuf], options: &CompilerOptions) -> Result<Program> {
        Program::new(root_files, options)
    }

    fn source_file(&self, program: &Program, path: &Path) -> Option<Ref<SourceFile>> {
        program.source_file(path)
    }

    fn pre_emit_diagnostics(&self, program: &Program, file: &Ref<SourceFile>) -> Vec<Diagnostic> {
        match program.file_index(file.source.file()) {
            Some(idx) => program.pre_emit_diagnostics(idx),
            None => vec![],
        }
    }

    fn type_at_location(&self, program: &Program, node: &Ref<Expr>) -> Type {
        program.type_checker().type_at_location(node)
    }

    fn type_to_string(&self, program: &Program, ty: &Type, enclosing: &Ref<Stmt>) -> String {
        program.type_checker().type_to_string(ty, enclosing)
    }
}
