// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type inference and semantic validation.
//!
//! Each file is walked once, lazily, recording the type of every expression
//! it contains along with the semantic diagnostics found on the way. Types of
//! top-level symbols are computed on demand (and cached) so that files can
//! refer to each other in any order.

use crate::ast::*;
use crate::binder::*;
use crate::diagnostics::{self, Diagnostic};
use crate::lexer::Span;
use crate::program::Program;
use crate::types::*;
use std::rc::Rc;

use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
pub(crate) struct CheckerState {
    next_type_var: u32,
    symbol_types: BTreeMap<SymbolId, Type>,
    resolving_symbols: BTreeSet<SymbolId>,
    resolving_aliases: BTreeSet<usize>,
    checked: BTreeMap<usize, Rc<FileCheck>>,
}

/// Result of walking one file.
#[derive(Debug, Default)]
pub struct FileCheck {
    pub diagnostics: Vec<Diagnostic>,
    pub node_types: BTreeMap<usize, Type>,
}

#[derive(Clone)]
enum TypeBinding {
    Param(Type),
    Alias(Ref<Stmt>),
}

#[derive(Default)]
struct Scope {
    values: BTreeMap<String, Type>,
    types: BTreeMap<String, TypeBinding>,
}

struct FunctionFrame {
    declared: Option<Type>,
    returns: Vec<Type>,
}

// Walk state. Top-level names are not kept in `scopes`; they are looked up
// through the binder.
struct Ctx {
    file: usize,
    scopes: Vec<Scope>,
    frames: Vec<FunctionFrame>,
    diagnostics: Vec<Diagnostic>,
    node_types: BTreeMap<usize, Type>,
}

impl Ctx {
    fn new(file: usize) -> Self {
        Self {
            file,
            scopes: vec![],
            frames: vec![],
            diagnostics: vec![],
            node_types: BTreeMap::new(),
        }
    }

    fn error(&mut self, span: &Span, code: u32, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(Some(span.clone()), code, msg));
    }

    fn declare_value(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.values.insert(name.to_string(), ty);
        }
    }

    fn declare_type(&mut self, name: &str, binding: TypeBinding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.types.insert(name.to_string(), binding);
        }
    }
}

enum Body<'a> {
    Block(&'a Block),
    Expr(&'a Ref<Expr>),
}

enum ImportTarget {
    Unresolved,
    Missing,
    Found(SymbolId),
}

fn keyword_type(name: &str) -> Option<Type> {
    Some(match name {
        "any" => Type::Any,
        "unknown" => Type::Unknown,
        "never" => Type::Never,
        "void" => Type::Void,
        "undefined" => Type::Undefined,
        "null" => Type::Null,
        "number" => Type::Number,
        "string" => Type::String,
        "boolean" => Type::Boolean,
        "object" => Type::NonPrimitive,
        "true" => Type::BooleanLiteral(true),
        "false" => Type::BooleanLiteral(false),
        _ => return None,
    })
}

fn global_value(name: &str) -> Option<Type> {
    match name {
        "undefined" => Some(Type::Undefined),
        "NaN" | "Infinity" => Some(Type::Number),
        "console" => {
            let log = Type::function(
                vec![],
                vec![ParamType {
                    name: "data".to_string(),
                    ty: Type::Array(Box::new(Type::Any)),
                    optional: false,
                    rest: true,
                }],
                Type::Void,
            );
            let props = ["log", "info", "warn", "error"]
                .iter()
                .map(|name| Property {
                    name: name.to_string(),
                    optional: false,
                    ty: log.clone(),
                })
                .collect();
            Some(Type::Object(Rc::new(props)))
        }
        _ => None,
    }
}

fn is_number_like(ty: &Type) -> bool {
    match ty.resolved() {
        Type::Number | Type::NumberLiteral(_) => true,
        Type::Union(types) => types.iter().all(is_number_like),
        _ => false,
    }
}

fn is_string_like(ty: &Type) -> bool {
    match ty.resolved() {
        Type::String | Type::StringLiteral(_) => true,
        Type::Union(types) => types.iter().all(is_string_like),
        _ => false,
    }
}

// A declared return type that does not require a `return` statement.
fn allows_no_return(ty: &Type) -> bool {
    match ty.resolved() {
        Type::Void | Type::Any | Type::Unknown | Type::Undefined | Type::Never => true,
        Type::Union(types) => types.iter().any(allows_no_return),
        _ => false,
    }
}

// Parameter type for the argument at `idx`; rest parameters yield their
// element type.
fn param_type_at(f: &FunctionType, idx: usize) -> Option<Type> {
    let last = f.params.last()?;
    match f.params.get(idx) {
        Some(p) if p.rest => Some(element_type(&p.ty)),
        Some(p) => Some(p.ty.clone()),
        None if last.rest => Some(element_type(&last.ty)),
        None => None,
    }
}

fn element_type(ty: &Type) -> Type {
    match ty.resolved() {
        Type::Array(elem) => (**elem).clone(),
        _ => Type::Any,
    }
}

// Collects type variable candidates by walking `param` and `arg` in parallel.
fn infer_from(param: &Type, arg: &Type, vars: &[TypeVar], bindings: &mut BTreeMap<u32, Type>) {
    match param.resolved() {
        Type::TypeVar(v) if vars.iter().any(|x| x.id == v.id) => {
            if !bindings.contains_key(&v.id) && !matches!(arg, Type::Never) {
                bindings.insert(v.id, arg.clone());
            }
        }
        Type::Array(p) => {
            if let Type::Array(a) = arg.resolved() {
                infer_from(p, a, vars, bindings);
            }
        }
        Type::Function(pf) => {
            if let Type::Function(af) = arg.resolved() {
                for (pp, ap) in pf.params.iter().zip(af.params.iter()) {
                    infer_from(&pp.ty, &ap.ty, vars, bindings);
                }
                infer_from(&pf.ret, &af.ret, vars, bindings);
            }
        }
        Type::Object(pp) => {
            for p in pp.iter() {
                if let Some(a) = arg.property(&p.name) {
                    infer_from(&p.ty, &a.ty, vars, bindings);
                }
            }
        }
        Type::Union(members) => {
            let candidates: Vec<&Type> = members
                .iter()
                .filter(|m| matches!(m, Type::TypeVar(v) if vars.iter().any(|x| x.id == v.id)))
                .collect();
            if candidates.len() == 1 {
                infer_from(candidates[0], arg, vars, bindings);
            }
        }
        _ => (),
    }
}

pub struct TypeChecker<'p> {
    program: &'p Program,
    strict_null_checks: bool,
    no_implicit_any: bool,
}

impl<'p> TypeChecker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            strict_null_checks: program.options().strict_null_checks(),
            no_implicit_any: program.options().no_implicit_any(),
        }
    }

    pub fn semantic_diagnostics(&self, file: usize) -> Vec<Diagnostic> {
        self.check_file(file).diagnostics.clone()
    }

    /// The type recorded for `node` when its file was checked.
    pub fn type_at_location(&self, node: &Ref<Expr>) -> Type {
        match self.program.file_index(node.span().source.file()) {
            Some(file) => self
                .check_file(file)
                .node_types
                .get(&node.id())
                .cloned()
                .unwrap_or(Type::Any),
            None => Type::Any,
        }
    }

    /// Renders `ty` as seen from within `enclosing`.
    pub fn type_to_string(&self, ty: &Type, enclosing: &Ref<Stmt>) -> String {
        match self.program.file_index(enclosing.span().source.file()) {
            Some(file) => {
                TypeFormatter::new(self.local_alias_names(file, Some(enclosing))).format(ty)
            }
            None => TypeFormatter::default().format(ty),
        }
    }

    /// Type of the function or variable declared by a top-level statement.
    pub fn declared_type(&self, stmt: &Ref<Stmt>) -> Option<Type> {
        let file = self.program.file_index(stmt.span().source.file())?;
        let name = match stmt.as_ref() {
            Stmt::Function(f) => &f.name,
            Stmt::Var(v) => &v.name,
            _ => return None,
        };
        let id = *self.program.binder().file(file).values.get(name.text())?;
        self.symbol_value_type(id)
    }

    fn formatter(&self, file: usize) -> TypeFormatter {
        TypeFormatter::new(self.local_alias_names(file, None))
    }

    /// Names under which alias declarations are known in `file` (and inside
    /// the body of `enclosing`), keyed by declaration.
    fn local_alias_names(&self, file: usize, enclosing: Option<&Ref<Stmt>>) -> BTreeMap<usize, String> {
        let binder = self.program.binder();
        let mut names = BTreeMap::new();
        for (name, &id) in &binder.file(file).types {
            match &binder.symbol(id).decl {
                Declaration::TypeAlias(stmt) => {
                    names.insert(stmt.id(), name.clone());
                }
                Declaration::Import { stmt, index } => {
                    if let ImportTarget::Found(target) = self.import_target(stmt, *index, false) {
                        if let Declaration::TypeAlias(alias) = &binder.symbol(target).decl {
                            names.insert(alias.id(), name.clone());
                        }
                    }
                }
                _ => (),
            }
        }
        if let Some(Stmt::Function(f)) = enclosing.map(|s| s.as_ref()) {
            for stmt in f.body.iter().flat_map(|b| b.statements.iter()) {
                if let Stmt::TypeAlias(alias) = stmt.as_ref() {
                    names.insert(stmt.id(), alias.name.text().to_string());
                }
            }
        }
        names
    }

    fn check_file(&self, file: usize) -> Rc<FileCheck> {
        if let Some(check) = self.program.state.borrow().checked.get(&file) {
            return check.clone();
        }

        let mut ctx = Ctx::new(file);
        ctx.diagnostics
            .extend_from_slice(self.program.binder().diagnostics(file));
        let source_file = self.program.file(file).clone();
        for stmt in &source_file.statements {
            self.check_statement(&mut ctx, stmt, true);
        }
        diagnostics::sort_and_deduplicate(&mut ctx.diagnostics);

        let check = Rc::new(FileCheck {
            diagnostics: ctx.diagnostics,
            node_types: ctx.node_types,
        });
        self.program
            .state
            .borrow_mut()
            .checked
            .insert(file, check.clone());
        check
    }

    fn fresh_var(&self, name: &str, constraint: Option<Box<Type>>) -> TypeVar {
        let mut state = self.program.state.borrow_mut();
        state.next_type_var += 1;
        TypeVar {
            name: name.to_string(),
            id: state.next_type_var,
            constraint,
        }
    }

    // Runs `f` and drops the diagnostics it reported.
    fn silently<T>(&self, ctx: &mut Ctx, f: impl FnOnce(&mut Ctx) -> T) -> T {
        let len = ctx.diagnostics.len();
        let result = f(ctx);
        ctx.diagnostics.truncate(len);
        result
    }

    fn not_assignable(&self, ctx: &mut Ctx, span: &Span, source: &Type, target: &Type) {
        let fmt = self.formatter(ctx.file);
        let msg = format!(
            "Type '{}' is not assignable to type '{}'.",
            fmt.format(&source.widen_for(target)),
            fmt.format(target)
        );
        ctx.error(span, 2322, &msg);
    }

    fn check_statement(&self, ctx: &mut Ctx, stmt: &Ref<Stmt>, top_level: bool) {
        match stmt.as_ref() {
            Stmt::Import(import) => self.check_import(ctx, stmt, import),
            Stmt::Function(f) => {
                let ty = self.check_function_decl(ctx, f);
                if !top_level {
                    ctx.declare_value(f.name.text(), ty);
                }
            }
            Stmt::Var(v) => {
                let ty = self.check_var(ctx, v);
                if !top_level {
                    ctx.declare_value(v.name.text(), ty);
                }
            }
            Stmt::TypeAlias(alias) => {
                if !top_level {
                    ctx.declare_type(alias.name.text(), TypeBinding::Alias(stmt.clone()));
                }
                ctx.scopes.push(Scope::default());
                for tp in &alias.type_params {
                    let var = self.fresh_var(tp.name.text(), None);
                    ctx.declare_type(tp.name.text(), TypeBinding::Param(Type::TypeVar(var)));
                }
                self.resolve_type(ctx, &alias.ty);
                ctx.scopes.pop();
            }
            Stmt::Expr { expr, .. } => {
                self.infer_expr(ctx, expr, None);
            }
            Stmt::Return { value, .. } => {
                let declared = ctx.frames.last().and_then(|f| f.declared.clone());
                let ty = match value {
                    Some(value) => {
                        let ty = self.infer_expr(ctx, value, declared.as_ref());
                        if let Some(declared) = &declared {
                            if !ty.is_assignable_to(declared, self.strict_null_checks) {
                                self.not_assignable(ctx, value.span(), &ty, declared);
                            }
                        }
                        ty
                    }
                    None => Type::Void,
                };
                if let Some(frame) = ctx.frames.last_mut() {
                    frame.returns.push(ty);
                }
            }
            Stmt::Empty { .. } => (),
        }
    }

    fn check_block(&self, ctx: &mut Ctx, statements: &[Ref<Stmt>]) {
        // Function declarations and aliases are usable before they appear.
        for stmt in statements {
            match stmt.as_ref() {
                Stmt::TypeAlias(alias) => {
                    ctx.declare_type(alias.name.text(), TypeBinding::Alias(stmt.clone()))
                }
                Stmt::Function(f) => {
                    let ty = self.silently(ctx, |ctx| self.check_function_decl(ctx, f));
                    ctx.declare_value(f.name.text(), ty);
                }
                _ => (),
            }
        }
        for stmt in statements {
            self.check_statement(ctx, stmt, false);
        }
    }

    fn check_import(&self, ctx: &mut Ctx, stmt: &Ref<Stmt>, import: &ImportDecl) {
        let Some(target) = self.program.resolved_import(stmt) else {
            let msg = format!(
                "Cannot find module '{}' or its corresponding type declarations.",
                import.module_name
            );
            ctx.error(&import.module, 2307, &msg);
            return;
        };
        let symbols = self.program.binder().file(target);
        for spec in &import.specifiers {
            let name = spec.name.text();
            if !symbols.exported_values.contains_key(name)
                && !symbols.exported_types.contains_key(name)
            {
                let msg = format!(
                    "Module '\"{}\"' has no exported member '{name}'.",
                    import.module_name
                );
                ctx.error(&spec.name, 2305, &msg);
            }
        }
    }

    fn check_function_decl(&self, ctx: &mut Ctx, f: &FunctionDecl) -> Type {
        if f.body.is_none() && f.signature.return_type.is_none() && self.no_implicit_any {
            let msg = format!(
                "'{}', which lacks return-type annotation, implicitly has an 'any' return type.",
                f.name.text()
            );
            ctx.error(&f.name, 7010, &msg);
        }
        self.check_function_like(ctx, &f.signature, f.body.as_ref().map(Body::Block), None)
    }

    fn check_function_like(
        &self,
        ctx: &mut Ctx,
        signature: &Signature,
        body: Option<Body<'_>>,
        contextual: Option<&FunctionType>,
    ) -> Type {
        ctx.scopes.push(Scope::default());

        let mut type_params = vec![];
        for tp in &signature.type_params {
            let constraint = tp
                .constraint
                .as_ref()
                .map(|c| Box::new(self.resolve_type(ctx, c)));
            let var = self.fresh_var(tp.name.text(), constraint);
            ctx.declare_type(tp.name.text(), TypeBinding::Param(Type::TypeVar(var.clone())));
            type_params.push(var);
        }

        let mut params = vec![];
        for (idx, p) in signature.params.iter().enumerate() {
            let ty = match (&p.ty, contextual.and_then(|c| param_type_at(c, idx))) {
                (Some(t), _) => self.resolve_type(ctx, t),
                (None, Some(t)) if p.rest => Type::Array(Box::new(t)),
                (None, Some(t)) => t,
                (None, None) => match &p.default {
                    Some(default) => self.infer_expr(ctx, default, None).widen(),
                    None => {
                        if self.no_implicit_any {
                            let msg = format!(
                                "Parameter '{}' implicitly has an 'any' type.",
                                p.name.text()
                            );
                            ctx.error(&p.name, 7006, &msg);
                        }
                        if p.rest {
                            Type::Array(Box::new(Type::Any))
                        } else {
                            Type::Any
                        }
                    }
                },
            };
            if let (Some(default), Some(_)) = (&p.default, &p.ty) {
                let default_ty = self.infer_expr(ctx, default, Some(&ty));
                if !default_ty.is_assignable_to(&ty, self.strict_null_checks) {
                    self.not_assignable(ctx, default.span(), &default_ty, &ty);
                }
            }

            let local = if p.optional && self.strict_null_checks {
                Type::union(vec![ty.clone(), Type::Undefined])
            } else {
                ty.clone()
            };
            ctx.declare_value(p.name.text(), local);
            params.push(ParamType {
                name: p.name.text().to_string(),
                ty,
                optional: p.optional || p.default.is_some(),
                rest: p.rest,
            });
        }

        let declared = signature
            .return_type
            .as_ref()
            .map(|t| self.resolve_type(ctx, t));
        let expected_ret = declared.clone().or_else(|| contextual.map(|c| c.ret.clone()));

        let ret = match body {
            None => declared.unwrap_or(Type::Any),
            Some(Body::Expr(expr)) => {
                ctx.frames.push(FunctionFrame {
                    declared: declared.clone(),
                    returns: vec![],
                });
                let ty = self.infer_expr(ctx, expr, expected_ret.as_ref());
                ctx.frames.pop();
                match declared {
                    Some(declared) => {
                        if !ty.is_assignable_to(&declared, self.strict_null_checks) {
                            self.not_assignable(ctx, expr.span(), &ty, &declared);
                        }
                        declared
                    }
                    None => ty.widen(),
                }
            }
            Some(Body::Block(block)) => {
                ctx.frames.push(FunctionFrame {
                    declared: declared.clone(),
                    returns: vec![],
                });
                self.check_block(ctx, &block.statements);
                let returns = ctx.frames.pop().map(|f| f.returns).unwrap_or_default();
                match declared {
                    Some(declared) => {
                        if returns.is_empty() && !allows_no_return(&declared) {
                            if let Some(t) = &signature.return_type {
                                ctx.error(
                                    t.span(),
                                    2355,
                                    "A function whose declared type is neither 'undefined', 'void', nor 'any' must return a value.",
                                );
                            }
                        }
                        declared
                    }
                    None if returns.is_empty() => Type::Void,
                    None => Type::union(returns.iter().map(|t| t.widen()).collect()),
                }
            }
        };

        ctx.scopes.pop();
        Type::function(type_params, params, ret)
    }

    fn check_var(&self, ctx: &mut Ctx, v: &VarDecl) -> Type {
        let declared = v.ty.as_ref().map(|t| self.resolve_type(ctx, t));
        let init = v
            .init
            .as_ref()
            .map(|e| self.infer_expr(ctx, e, declared.as_ref()));

        if let (Some(declared), Some(init)) = (&declared, &init) {
            if !init.is_assignable_to(declared, self.strict_null_checks) {
                self.not_assignable(ctx, &v.name, init, declared);
            }
        }

        match (declared, init) {
            (Some(declared), _) => declared,
            (None, Some(init)) if v.kind == VarKind::Const => init,
            (None, Some(init)) => init.widen(),
            (None, None) => Type::Any,
        }
    }

    fn import_target(&self, stmt: &Ref<Stmt>, index: usize, value: bool) -> ImportTarget {
        let Stmt::Import(import) = stmt.as_ref() else {
            return ImportTarget::Unresolved;
        };
        let Some(file) = self.program.resolved_import(stmt) else {
            return ImportTarget::Unresolved;
        };
        let name = import.specifiers[index].name.text();
        let symbols = self.program.binder().file(file);
        let (first, second) = if value {
            (&symbols.exported_values, &symbols.exported_types)
        } else {
            (&symbols.exported_types, &symbols.exported_values)
        };
        match first.get(name).or_else(|| second.get(name)) {
            Some(&id) => ImportTarget::Found(id),
            None => ImportTarget::Missing,
        }
    }

    /// Type of a top-level value symbol. `None` if the symbol only names a type.
    fn symbol_value_type(&self, id: SymbolId) -> Option<Type> {
        if let Some(ty) = self.program.state.borrow().symbol_types.get(&id) {
            return Some(ty.clone());
        }
        let symbol = self.program.binder().symbol(id).clone();
        if !symbol.is_value() {
            return None;
        }
        if !self.program.state.borrow_mut().resolving_symbols.insert(id) {
            // Circular reference.
            return Some(Type::Any);
        }

        let ty = match &symbol.decl {
            Declaration::Function(decls) => {
                // With overloads the first signature without a body wins.
                let decl = decls
                    .iter()
                    .find(|d| decls.len() > 1 && matches!(d.as_ref(), Stmt::Function(f) if f.body.is_none()))
                    .unwrap_or(&decls[0]);
                match decl.as_ref() {
                    Stmt::Function(f) => {
                        let mut ctx = Ctx::new(symbol.file);
                        Some(self.check_function_decl(&mut ctx, f))
                    }
                    _ => Some(Type::Any),
                }
            }
            Declaration::Variable(stmt) => match stmt.as_ref() {
                Stmt::Var(v) => {
                    let mut ctx = Ctx::new(symbol.file);
                    Some(self.check_var(&mut ctx, v))
                }
                _ => Some(Type::Any),
            },
            Declaration::TypeAlias(_) => None,
            Declaration::Import { stmt, index } => match self.import_target(stmt, *index, true) {
                ImportTarget::Found(target) => self.symbol_value_type(target),
                ImportTarget::Unresolved | ImportTarget::Missing => Some(Type::Any),
            },
        };

        let mut state = self.program.state.borrow_mut();
        state.resolving_symbols.remove(&id);
        if let Some(ty) = &ty {
            state.symbol_types.insert(id, ty.clone());
        }
        ty
    }

    fn lookup_value(&self, ctx: &mut Ctx, span: &Span) -> Type {
        let name = span.text();
        if let Some(ty) = ctx.scopes.iter().rev().find_map(|s| s.values.get(name)) {
            return ty.clone();
        }

        let symbols = self.program.binder().file(ctx.file);
        if let Some(&id) = symbols.values.get(name) {
            if let Some(ty) = self.symbol_value_type(id) {
                return ty;
            }
        } else if let Some(ty) = global_value(name) {
            return ty;
        }

        let is_type = ctx.scopes.iter().any(|s| s.types.contains_key(name))
            || symbols.types.contains_key(name)
            || keyword_type(name).is_some();
        if is_type {
            let msg = format!("'{name}' only refers to a type, but is being used as a value here.");
            ctx.error(span, 2693, &msg);
        } else {
            ctx.error(span, 2304, &format!("Cannot find name '{name}'."));
        }
        Type::Any
    }

    fn infer_expr(&self, ctx: &mut Ctx, expr: &Ref<Expr>, expected: Option<&Type>) -> Type {
        let ty = self.infer_expr_kind(ctx, expr, expected);
        ctx.node_types.insert(expr.id(), ty.clone());
        ty
    }

    fn infer_expr_kind(&self, ctx: &mut Ctx, expr: &Ref<Expr>, expected: Option<&Type>) -> Type {
        match expr.as_ref() {
            Expr::Ident { span } => self.lookup_value(ctx, span),
            Expr::Number { value, .. } => Type::NumberLiteral(*value),
            Expr::String { value, .. } => Type::StringLiteral(value.clone()),
            Expr::Bool { value, .. } => Type::BooleanLiteral(*value),
            Expr::Null { .. } => Type::Null,
            Expr::Array { items, .. } => {
                let expected_elem = expected.map(element_type);
                let types: Vec<Type> = items
                    .iter()
                    .map(|item| self.infer_expr(ctx, item, expected_elem.as_ref()).widen())
                    .collect();
                Type::Array(Box::new(Type::union(types)))
            }
            Expr::Object { fields, .. } => {
                let mut props: Vec<Property> = vec![];
                for (key, value) in fields {
                    let expected_prop = expected
                        .and_then(|t| t.property(key.text()))
                        .map(|p| p.ty.clone());
                    let ty = self.infer_expr(ctx, value, expected_prop.as_ref()).widen();
                    props.retain(|p| p.name != key.text());
                    props.push(Property {
                        name: key.text().to_string(),
                        optional: false,
                        ty,
                    });
                }
                Type::Object(Rc::new(props))
            }
            Expr::Call {
                span,
                callee,
                type_args,
                args,
            } => self.check_call(ctx, span, callee, type_args, args),
            Expr::Member {
                object, property, ..
            } => {
                let object_ty = self.infer_expr(ctx, object, None);
                self.property_type(ctx, &object_ty, property)
            }
            Expr::Arrow {
                signature, body, ..
            } => {
                let contextual = expected.and_then(|t| match t.resolved() {
                    Type::Function(f) => Some(f.clone()),
                    _ => None,
                });
                let body = match body {
                    ArrowBody::Expr(e) => Body::Expr(e),
                    ArrowBody::Block(b) => Body::Block(b),
                };
                self.check_function_like(ctx, signature, Some(body), contextual.as_deref())
            }
            Expr::Paren { expr, .. } => self.infer_expr(ctx, expr, expected),
            Expr::Unary { op, expr, .. } => {
                let ty = self.infer_expr(ctx, expr, None);
                match (op, ty) {
                    (UnaryOp::Not, _) => Type::Boolean,
                    (UnaryOp::Minus, Type::NumberLiteral(n)) => Type::NumberLiteral(-n),
                    (UnaryOp::Minus, _) => Type::Number,
                }
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let lt = self.infer_expr(ctx, lhs, None);
                let rt = self.infer_expr(ctx, rhs, None);
                self.binary_type(ctx, *op, (lhs, &lt), (rhs, &rt))
            }
        }
    }

    fn binary_type(
        &self,
        ctx: &mut Ctx,
        op: BinOp,
        (lhs, lt): (&Ref<Expr>, &Type),
        (rhs, rt): (&Ref<Expr>, &Type),
    ) -> Type {
        match op {
            BinOp::Add => {
                if lt.is_any() || rt.is_any() {
                    Type::Any
                } else if is_string_like(lt) || is_string_like(rt) {
                    Type::String
                } else if is_number_like(lt) && is_number_like(rt) {
                    Type::Number
                } else {
                    let fmt = self.formatter(ctx.file);
                    let msg = format!(
                        "Operator '+' cannot be applied to types '{}' and '{}'.",
                        fmt.format(&lt.widen()),
                        fmt.format(&rt.widen())
                    );
                    ctx.error(lhs.span(), 2365, &msg);
                    Type::Any
                }
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                if !(lt.is_any() || is_number_like(lt)) {
                    ctx.error(
                        lhs.span(),
                        2362,
                        "The left-hand side of an arithmetic operation must be of type 'any', 'number', 'bigint' or an enum type.",
                    );
                }
                if !(rt.is_any() || is_number_like(rt)) {
                    ctx.error(
                        rhs.span(),
                        2363,
                        "The right-hand side of an arithmetic operation must be of type 'any', 'number', 'bigint' or an enum type.",
                    );
                }
                Type::Number
            }
            op if op.is_comparison() => Type::Boolean,
            BinOp::And => rt.clone(),
            _ => Type::union(vec![lt.clone(), rt.clone()]),
        }
    }

    fn property_type(&self, ctx: &mut Ctx, object: &Type, property: &Span) -> Type {
        let name = property.text();
        let found = match object.resolved() {
            Type::Any => Some(Type::Any),
            Type::Object(props) => props.iter().find(|p| p.name == name).map(|p| {
                if p.optional && self.strict_null_checks {
                    Type::union(vec![p.ty.clone(), Type::Undefined])
                } else {
                    p.ty.clone()
                }
            }),
            Type::Array(_) | Type::String | Type::StringLiteral(_) if name == "length" => {
                Some(Type::Number)
            }
            Type::Union(members) => {
                let types: Option<Vec<Type>> = members
                    .iter()
                    .map(|m| m.property(name).map(|p| p.ty.clone()))
                    .collect();
                types.map(Type::union)
            }
            _ => None,
        };
        found.unwrap_or_else(|| {
            let msg = format!(
                "Property '{name}' does not exist on type '{}'.",
                self.formatter(ctx.file).format(object)
            );
            ctx.error(property, 2339, &msg);
            Type::Any
        })
    }

    fn check_call(
        &self,
        ctx: &mut Ctx,
        span: &Span,
        callee: &Ref<Expr>,
        type_args: &[Ref<TypeExpr>],
        args: &[Ref<Expr>],
    ) -> Type {
        let callee_ty = self.infer_expr(ctx, callee, None);
        let f = match callee_ty.resolved() {
            Type::Function(f) => f.clone(),
            resolved => {
                if !matches!(resolved, Type::Any) {
                    ctx.error(callee.span(), 2349, "This expression is not callable.");
                }
                for arg in args {
                    self.infer_expr(ctx, arg, None);
                }
                return Type::Any;
            }
        };

        let mut bindings: BTreeMap<u32, Type> = BTreeMap::new();
        if !type_args.is_empty() {
            let explicit: Vec<Type> = type_args.iter().map(|t| self.resolve_type(ctx, t)).collect();
            if explicit.len() != f.type_params.len() {
                let msg = format!(
                    "Expected {} type arguments, but got {}.",
                    f.type_params.len(),
                    explicit.len()
                );
                ctx.error(span, 2558, &msg);
            } else {
                for (var, ty) in f.type_params.iter().zip(explicit) {
                    bindings.insert(var.id, ty);
                }
            }
        }

        let infer = type_args.is_empty();
        let mut arg_types = vec![];
        for (idx, arg) in args.iter().enumerate() {
            let param = param_type_at(&f, idx);
            let expected = param.as_ref().map(|p| {
                let mut contextual = bindings.clone();
                for var in &f.type_params {
                    contextual.entry(var.id).or_insert(Type::Any);
                }
                p.substitute(&contextual)
            });
            let arg_ty = self.infer_expr(ctx, arg, expected.as_ref());
            if let (true, Some(param)) = (infer, &param) {
                infer_from(param, &arg_ty, &f.type_params, &mut bindings);
            }
            arg_types.push(arg_ty);
        }
        for var in &f.type_params {
            bindings.entry(var.id).or_insert(Type::Unknown);
        }

        let min = f.min_args();
        let max = f.max_args();
        if args.len() < min || max.is_some_and(|m| args.len() > m) {
            let expected = match max {
                None => format!("at least {min}"),
                Some(m) if m == min => m.to_string(),
                Some(m) => format!("{min}-{m}"),
            };
            let msg = format!("Expected {expected} arguments, but got {}.", args.len());
            ctx.error(span, 2554, &msg);
        } else {
            for (idx, (arg, arg_ty)) in args.iter().zip(arg_types.iter()).enumerate() {
                let Some(param) = param_type_at(&f, idx) else {
                    continue;
                };
                let param = param.substitute(&bindings);
                if !arg_ty.is_assignable_to(&param, self.strict_null_checks) {
                    let fmt = self.formatter(ctx.file);
                    let msg = format!(
                        "Argument of type '{}' is not assignable to parameter of type '{}'.",
                        fmt.format(&arg_ty.widen_for(&param)),
                        fmt.format(&param)
                    );
                    ctx.error(arg.span(), 2345, &msg);
                }
            }
        }

        f.ret.substitute(&bindings)
    }

    fn resolve_type(&self, ctx: &mut Ctx, ty: &Ref<TypeExpr>) -> Type {
        match ty.as_ref() {
            TypeExpr::Named { name, args, .. } => self.resolve_named_type(ctx, name, args),
            TypeExpr::StringLiteral { value, .. } => Type::StringLiteral(value.clone()),
            TypeExpr::NumberLiteral { value, .. } => Type::NumberLiteral(*value),
            TypeExpr::Array { elem, .. } => Type::Array(Box::new(self.resolve_type(ctx, elem))),
            TypeExpr::Union { types, .. } => {
                let types = types.iter().map(|t| self.resolve_type(ctx, t)).collect();
                Type::union(types)
            }
            TypeExpr::Function { signature, .. } => {
                self.check_function_like(ctx, signature, None, None)
            }
            TypeExpr::Object { members, .. } => {
                let props = members
                    .iter()
                    .map(|m| Property {
                        name: m.name.text().to_string(),
                        optional: m.optional,
                        ty: self.resolve_type(ctx, &m.ty),
                    })
                    .collect();
                Type::Object(Rc::new(props))
            }
            TypeExpr::Paren { ty, .. } => self.resolve_type(ctx, ty),
        }
    }

    fn resolve_named_type(&self, ctx: &mut Ctx, name: &Span, args: &[Ref<TypeExpr>]) -> Type {
        let text = name.text();
        let args: Vec<Type> = args.iter().map(|a| self.resolve_type(ctx, a)).collect();

        let local = ctx
            .scopes
            .iter()
            .rev()
            .find_map(|s| s.types.get(text).cloned());
        match local {
            Some(TypeBinding::Param(ty)) => {
                if !args.is_empty() {
                    ctx.error(name, 2315, &format!("Type '{text}' is not generic."));
                }
                return ty;
            }
            Some(TypeBinding::Alias(stmt)) => {
                return self.instantiate_alias(ctx, None, &stmt, args, name);
            }
            None => (),
        }

        if args.is_empty() {
            if let Some(ty) = keyword_type(text) {
                return ty;
            }
        }
        if text == "Array" && args.len() == 1 {
            return Type::Array(Box::new(args[0].clone()));
        }

        let symbols = self.program.binder().file(ctx.file);
        if let Some(&id) = symbols.types.get(text) {
            return self.symbol_type_reference(ctx, id, args, name);
        }
        if symbols.values.contains_key(text) || ctx.scopes.iter().any(|s| s.values.contains_key(text)) {
            return self.value_as_type(ctx, name);
        }

        ctx.error(name, 2304, &format!("Cannot find name '{text}'."));
        Type::Any
    }

    fn symbol_type_reference(&self, ctx: &mut Ctx, id: SymbolId, args: Vec<Type>, name: &Span) -> Type {
        let binder = self.program.binder();
        let symbol = binder.symbol(id);
        match &symbol.decl {
            Declaration::TypeAlias(stmt) => {
                self.instantiate_alias(ctx, Some(symbol.file), stmt, args, name)
            }
            Declaration::Import { stmt, index } => match self.import_target(stmt, *index, false) {
                ImportTarget::Found(target) if binder.symbol(target).is_type() => {
                    self.symbol_type_reference(ctx, target, args, name)
                }
                ImportTarget::Found(_) => self.value_as_type(ctx, name),
                ImportTarget::Unresolved | ImportTarget::Missing => Type::Any,
            },
            _ => self.value_as_type(ctx, name),
        }
    }

    fn value_as_type(&self, ctx: &mut Ctx, name: &Span) -> Type {
        let msg = format!(
            "'{0}' refers to a value, but is being used as a type here. Did you mean 'typeof {0}'?",
            name.text()
        );
        ctx.error(name, 2749, &msg);
        Type::Any
    }

    /// Instantiates an alias with `args`. Top-level aliases (`file` is set)
    /// resolve in a fresh walk of their own file, local ones in `ctx`.
    fn instantiate_alias(
        &self,
        ctx: &mut Ctx,
        file: Option<usize>,
        stmt: &Ref<Stmt>,
        args: Vec<Type>,
        name: &Span,
    ) -> Type {
        let Stmt::TypeAlias(alias) = stmt.as_ref() else {
            return Type::Any;
        };
        let alias_name = alias.name.text().to_string();
        if alias.type_params.len() != args.len() {
            let msg = if alias.type_params.is_empty() {
                format!("Type '{alias_name}' is not generic.")
            } else {
                format!(
                    "Generic type '{alias_name}' requires {} type argument(s).",
                    alias.type_params.len()
                )
            };
            ctx.error(name, if alias.type_params.is_empty() { 2315 } else { 2314 }, &msg);
            return Type::Any;
        }

        let decl = stmt.id();
        let make = |args: Vec<Type>, target: Type| {
            Type::Alias(Rc::new(AliasType {
                name: alias_name.clone(),
                decl,
                args,
                target,
            }))
        };
        if !self.program.state.borrow_mut().resolving_aliases.insert(decl) {
            // Recursive reference.
            return make(args, Type::Any);
        }

        let mut scope = Scope::default();
        for (tp, arg) in alias.type_params.iter().zip(args.iter()) {
            scope
                .types
                .insert(tp.name.text().to_string(), TypeBinding::Param(arg.clone()));
        }
        let target = match file {
            Some(file) => {
                let mut alias_ctx = Ctx::new(file);
                alias_ctx.scopes.push(scope);
                self.resolve_type(&mut alias_ctx, &alias.ty)
            }
            None => {
                ctx.scopes.push(scope);
                let target = self.silently(ctx, |ctx| self.resolve_type(ctx, &alias.ty));
                ctx.scopes.pop();
                target
            }
        };

        self.program
            .state
            .borrow_mut()
            .resolving_aliases
            .remove(&decl);
        make(args, target)
    }
}
