// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;
use std::rc::Rc;

use core::{cmp, fmt, ops::Deref};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
                | BinOp::Eq
                | BinOp::Ne
                | BinOp::StrictEq
                | BinOp::StrictNe
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Not,
    Minus,
}

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> cmp::Ord for NodeRef<T> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        Rc::as_ptr(&self.r).cmp(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::PartialOrd for NodeRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }

    /// Address used as an identity key for per-node caches.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.r) as *const u8 as usize
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug)]
pub enum Expr {
    Ident {
        span: Span,
    },

    Number {
        span: Span,
        value: f64,
    },

    String {
        span: Span,
        value: String,
    },

    Bool {
        span: Span,
        value: bool,
    },

    Null {
        span: Span,
    },

    Array {
        span: Span,
        items: Vec<Ref<Expr>>,
    },

    Object {
        span: Span,
        fields: Vec<(Span, Ref<Expr>)>,
    },

    Call {
        span: Span,
        callee: Ref<Expr>,
        type_args: Vec<Ref<TypeExpr>>,
        args: Vec<Ref<Expr>>,
    },

    Member {
        span: Span,
        object: Ref<Expr>,
        property: Span,
    },

    Arrow {
        span: Span,
        signature: Signature,
        body: ArrowBody,
    },

    Paren {
        span: Span,
        expr: Ref<Expr>,
    },

    Unary {
        span: Span,
        op: UnaryOp,
        expr: Ref<Expr>,
    },

    Binary {
        span: Span,
        op: BinOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Ident { span }
            | Number { span, .. }
            | String { span, .. }
            | Bool { span, .. }
            | Null { span }
            | Array { span, .. }
            | Object { span, .. }
            | Call { span, .. }
            | Member { span, .. }
            | Arrow { span, .. }
            | Paren { span, .. }
            | Unary { span, .. }
            | Binary { span, .. } => span,
        }
    }
}

#[derive(Debug)]
pub enum ArrowBody {
    Expr(Ref<Expr>),
    Block(Block),
}

#[derive(Debug)]
pub struct TypeParam {
    pub name: Span,
    pub constraint: Option<Ref<TypeExpr>>,
}

#[derive(Debug)]
pub struct Param {
    pub span: Span,
    pub name: Span,
    pub optional: bool,
    pub rest: bool,
    pub ty: Option<Ref<TypeExpr>>,
    pub default: Option<Ref<Expr>>,
}

/// Type parameters, parameters and return annotation shared by function
/// declarations, arrow functions and function types.
#[derive(Debug)]
pub struct Signature {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_type: Option<Ref<TypeExpr>>,
}

#[derive(Debug)]
pub struct PropertySignature {
    pub name: Span,
    pub optional: bool,
    pub ty: Ref<TypeExpr>,
}

#[derive(Debug)]
pub enum TypeExpr {
    // Keywords (`number`, `void`, ...) and references to aliases or type parameters.
    Named {
        span: Span,
        name: Span,
        args: Vec<Ref<TypeExpr>>,
    },

    StringLiteral {
        span: Span,
        value: String,
    },

    NumberLiteral {
        span: Span,
        value: f64,
    },

    Array {
        span: Span,
        elem: Ref<TypeExpr>,
    },

    Union {
        span: Span,
        types: Vec<Ref<TypeExpr>>,
    },

    Function {
        span: Span,
        signature: Signature,
    },

    Object {
        span: Span,
        members: Vec<PropertySignature>,
    },

    Paren {
        span: Span,
        ty: Ref<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn span(&self) -> &Span {
        use TypeExpr::*;
        match self {
            Named { span, .. }
            | StringLiteral { span, .. }
            | NumberLiteral { span, .. }
            | Array { span, .. }
            | Union { span, .. }
            | Function { span, .. }
            | Object { span, .. }
            | Paren { span, .. } => span,
        }
    }
}

#[derive(Debug)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Ref<Stmt>>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Modifiers {
    pub export: bool,
    pub declare: bool,
}

#[derive(Debug)]
pub struct ImportSpecifier {
    pub name: Span,
    pub alias: Option<Span>,
}

impl ImportSpecifier {
    /// The name the import is bound to in the importing file.
    pub fn local(&self) -> &Span {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

#[derive(Debug)]
pub struct ImportDecl {
    pub span: Span,
    pub specifiers: Vec<ImportSpecifier>,
    pub module: Span,
    pub module_name: String,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub span: Span,
    pub modifiers: Modifiers,
    pub name: Span,
    pub signature: Signature,
    pub body: Option<Block>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

#[derive(Debug)]
pub struct VarDecl {
    pub span: Span,
    pub modifiers: Modifiers,
    pub kind: VarKind,
    pub name: Span,
    pub ty: Option<Ref<TypeExpr>>,
    pub init: Option<Ref<Expr>>,
}

#[derive(Debug)]
pub struct TypeAliasDecl {
    pub span: Span,
    pub modifiers: Modifiers,
    pub name: Span,
    pub type_params: Vec<TypeParam>,
    pub ty: Ref<TypeExpr>,
}

#[derive(Debug)]
pub enum Stmt {
    Import(ImportDecl),
    Function(FunctionDecl),
    Var(VarDecl),
    TypeAlias(TypeAliasDecl),
    Expr { span: Span, expr: Ref<Expr> },
    Return { span: Span, value: Option<Ref<Expr>> },
    Empty { span: Span },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Import(d) => &d.span,
            Stmt::Function(d) => &d.span,
            Stmt::Var(d) => &d.span,
            Stmt::TypeAlias(d) => &d.span,
            Stmt::Expr { span, .. } | Stmt::Return { span, .. } | Stmt::Empty { span } => span,
        }
    }
}

#[derive(Debug)]
pub struct SourceFile {
    pub source: Source,
    pub statements: Vec<Ref<Stmt>>,
}
