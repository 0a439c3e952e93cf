// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Reports the static types of two call targets in a small TypeScript project.
//!
//! The project's `tsconfig.json` is read, all inputs are parsed, bound and
//! checked, and if `main.ts` is free of errors the callees of the first two
//! statements of its second top-level declaration are typed and printed.
//! Checking goes through the [`TypeEngine`] trait; [`BuiltinEngine`] is the
//! implementation shipped with the crate.

mod ast;
mod binder;
mod checker;
mod config;
mod diagnostics;
mod engine;
mod lexer;
mod parser;
mod pipeline;
mod program;
mod types;

pub use config::{CompilerOptions, ParsedConfig};
pub use diagnostics::{Category, Diagnostic};
pub use engine::{BuiltinEngine, TypeEngine};
pub use pipeline::{diagnose, run, Project, QueryError, Report, ShapeError};
pub use program::Program;
pub use types::Type;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::binder::*;
    pub use crate::checker::*;
    pub use crate::config::*;
    pub use crate::diagnostics::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
    pub use crate::pipeline::*;
    pub use crate::program::*;
    pub use crate::types::*;
}
