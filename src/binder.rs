// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! File-level symbol tables.
//!
//! Every source file gets two namespaces, values and types. Imports are bound
//! in both and resolved lazily against the exporting file.

use crate::ast::*;
use crate::diagnostics::Diagnostic;
use crate::lexer::Span;

use std::collections::BTreeMap;

pub type SymbolId = usize;

#[derive(Debug, Clone)]
pub enum Declaration {
    // Overload signatures followed by the implementation.
    Function(Vec<Ref<Stmt>>),
    Variable(Ref<Stmt>),
    TypeAlias(Ref<Stmt>),
    Import { stmt: Ref<Stmt>, index: usize },
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub file: usize,
    pub decl: Declaration,
}

impl Symbol {
    pub fn is_value(&self) -> bool {
        !matches!(self.decl, Declaration::TypeAlias(_))
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self.decl,
            Declaration::TypeAlias(_) | Declaration::Import { .. }
        )
    }

    /// The import statement and specifier an import symbol was bound from.
    pub fn import(&self) -> Option<(&ImportDecl, usize)> {
        match &self.decl {
            Declaration::Import { stmt, index } => match stmt.as_ref() {
                Stmt::Import(decl) => Some((decl, *index)),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct FileSymbols {
    pub values: BTreeMap<String, SymbolId>,
    pub types: BTreeMap<String, SymbolId>,
    pub exported_values: BTreeMap<String, SymbolId>,
    pub exported_types: BTreeMap<String, SymbolId>,
}

#[derive(Debug, Default)]
pub struct Binder {
    symbols: Vec<Symbol>,
    files: Vec<FileSymbols>,
    diagnostics: Vec<Vec<Diagnostic>>,
}

impl Binder {
    pub fn bind(files: &[Ref<SourceFile>]) -> Binder {
        let mut binder = Binder::default();
        for (idx, file) in files.iter().enumerate() {
            binder.files.push(FileSymbols::default());
            binder.diagnostics.push(vec![]);
            for stmt in &file.statements {
                binder.bind_statement(idx, stmt);
            }
        }
        binder
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn file(&self, file: usize) -> &FileSymbols {
        &self.files[file]
    }

    pub fn diagnostics(&self, file: usize) -> &[Diagnostic] {
        &self.diagnostics[file]
    }

    fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol);
        self.symbols.len() - 1
    }

    fn duplicate(&mut self, file: usize, existing: Option<SymbolId>, name: &Span) {
        let mut spans = vec![name.clone()];
        if let Some(id) = existing {
            if let Some(span) = self.declaration_name(id) {
                spans.insert(0, span);
            }
        }
        for span in spans {
            let msg = format!("Duplicate identifier '{}'.", span.text());
            self.diagnostics[file].push(Diagnostic::error(Some(span), 2300, &msg));
        }
    }

    fn declaration_name(&self, id: SymbolId) -> Option<Span> {
        match &self.symbols[id].decl {
            Declaration::Function(decls) => match decls.first().map(|d| d.as_ref()) {
                Some(Stmt::Function(f)) => Some(f.name.clone()),
                _ => None,
            },
            Declaration::Variable(stmt) => match stmt.as_ref() {
                Stmt::Var(v) => Some(v.name.clone()),
                _ => None,
            },
            Declaration::TypeAlias(stmt) => match stmt.as_ref() {
                Stmt::TypeAlias(t) => Some(t.name.clone()),
                _ => None,
            },
            Declaration::Import { .. } => self.symbols[id]
                .import()
                .map(|(decl, index)| decl.specifiers[index].local().clone()),
        }
    }

    fn bind_statement(&mut self, file: usize, stmt: &Ref<Stmt>) {
        match stmt.as_ref() {
            Stmt::Function(f) => {
                let name = f.name.text().to_string();
                if let Some(&existing) = self.files[file].values.get(&name) {
                    if let Declaration::Function(decls) = &mut self.symbols[existing].decl {
                        decls.push(stmt.clone());
                        if f.modifiers.export {
                            self.files[file].exported_values.insert(name, existing);
                        }
                    } else {
                        self.duplicate(file, Some(existing), &f.name);
                    }
                    return;
                }
                let id = self.add_symbol(Symbol {
                    name: name.clone(),
                    file,
                    decl: Declaration::Function(vec![stmt.clone()]),
                });
                self.files[file].values.insert(name.clone(), id);
                if f.modifiers.export {
                    self.files[file].exported_values.insert(name, id);
                }
            }
            Stmt::Var(v) => {
                let name = v.name.text().to_string();
                if let Some(&existing) = self.files[file].values.get(&name) {
                    self.duplicate(file, Some(existing), &v.name);
                    return;
                }
                let id = self.add_symbol(Symbol {
                    name: name.clone(),
                    file,
                    decl: Declaration::Variable(stmt.clone()),
                });
                self.files[file].values.insert(name.clone(), id);
                if v.modifiers.export {
                    self.files[file].exported_values.insert(name, id);
                }
            }
            Stmt::TypeAlias(t) => {
                let name = t.name.text().to_string();
                if let Some(&existing) = self.files[file].types.get(&name) {
                    self.duplicate(file, Some(existing), &t.name);
                    return;
                }
                let id = self.add_symbol(Symbol {
                    name: name.clone(),
                    file,
                    decl: Declaration::TypeAlias(stmt.clone()),
                });
                self.files[file].types.insert(name.clone(), id);
                if t.modifiers.export {
                    self.files[file].exported_types.insert(name, id);
                }
            }
            Stmt::Import(import) => {
                for (index, spec) in import.specifiers.iter().enumerate() {
                    let local = spec.local();
                    let name = local.text().to_string();
                    let existing = self.files[file]
                        .values
                        .get(&name)
                        .or_else(|| self.files[file].types.get(&name))
                        .copied();
                    if existing.is_some() {
                        self.duplicate(file, existing, local);
                        continue;
                    }
                    let id = self.add_symbol(Symbol {
                        name: name.clone(),
                        file,
                        decl: Declaration::Import {
                            stmt: stmt.clone(),
                            index,
                        },
                    });
                    self.files[file].values.insert(name.clone(), id);
                    self.files[file].types.insert(name, id);
                }
            }
            Stmt::Expr { .. } | Stmt::Return { .. } | Stmt::Empty { .. } => (),
        }
    }
}
