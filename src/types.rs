// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Static types produced by the checker and their display form.

use std::rc::Rc;

use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Number,
    String,
    Boolean,
    // The `object` keyword.
    NonPrimitive,

    NumberLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),

    Array(Box<Type>),
    Union(Vec<Type>),
    Function(Rc<FunctionType>),
    Object(Rc<Vec<Property>>),
    TypeVar(TypeVar),
    Alias(Rc<AliasType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub optional: bool,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeVar {
    pub name: String,
    pub id: u32,
    pub constraint: Option<Box<Type>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamType {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub type_params: Vec<TypeVar>,
    pub params: Vec<ParamType>,
    pub ret: Type,
}

impl FunctionType {
    pub fn min_args(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.optional && !p.rest)
            .count()
    }

    /// `None` when a rest parameter accepts any number of arguments.
    pub fn max_args(&self) -> Option<usize> {
        match self.params.last() {
            Some(p) if p.rest => None,
            _ => Some(self.params.len()),
        }
    }
}

/// A reference to a type alias. `decl` identifies the alias declaration so that
/// the formatter can print it under its local name.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasType {
    pub name: String,
    pub decl: usize,
    pub args: Vec<Type>,
    pub target: Type,
}

impl Type {
    pub fn function(type_params: Vec<TypeVar>, params: Vec<ParamType>, ret: Type) -> Type {
        Type::Function(Rc::new(FunctionType {
            type_params,
            params,
            ret,
        }))
    }

    /// Strips alias references.
    pub fn resolved(&self) -> &Type {
        let mut ty = self;
        while let Type::Alias(alias) = ty {
            ty = &alias.target;
        }
        ty
    }

    pub fn is_any(&self) -> bool {
        matches!(self.resolved(), Type::Any)
    }

    /// Replaces literal types by their primitive base type.
    pub fn widen(&self) -> Type {
        match self {
            Type::NumberLiteral(_) => Type::Number,
            Type::StringLiteral(_) => Type::String,
            Type::BooleanLiteral(_) => Type::Boolean,
            Type::Union(types) => Type::union(types.iter().map(|t| t.widen()).collect()),
            _ => self.clone(),
        }
    }

    /// `self` as shown in a relation error against `target`: literals are
    /// widened unless `target` could itself hold literal types.
    pub fn widen_for(&self, target: &Type) -> Type {
        if target.has_literal_members() {
            self.clone()
        } else {
            self.widen()
        }
    }

    fn has_literal_members(&self) -> bool {
        match self.resolved() {
            Type::NumberLiteral(_)
            | Type::StringLiteral(_)
            | Type::BooleanLiteral(_)
            | Type::Boolean
            | Type::TypeVar(_) => true,
            Type::Union(types) => types.iter().any(|t| t.has_literal_members()),
            _ => false,
        }
    }

    /// Builds a normalized union: nested unions are flattened, duplicates and
    /// literals covered by their base type are dropped, `true | false` becomes
    /// `boolean`.
    pub fn union(types: Vec<Type>) -> Type {
        let mut members: Vec<Type> = vec![];
        let mut stack: Vec<Type> = types.into_iter().rev().collect();
        while let Some(t) = stack.pop() {
            match t {
                Type::Union(inner) => stack.extend(inner.into_iter().rev()),
                Type::Never => (),
                Type::Any => return Type::Any,
                Type::Unknown => return Type::Unknown,
                t if !members.contains(&t) => members.push(t),
                _ => (),
            }
        }

        let has = |members: &Vec<Type>, t: &Type| members.contains(t);
        if has(&members, &Type::BooleanLiteral(true)) && has(&members, &Type::BooleanLiteral(false))
        {
            let pos = members
                .iter()
                .position(|t| matches!(t, Type::BooleanLiteral(_)))
                .unwrap_or(0);
            members.retain(|t| !matches!(t, Type::BooleanLiteral(_)));
            members.insert(pos.min(members.len()), Type::Boolean);
        }

        let snapshot = members.clone();
        members.retain(|t| match t {
            Type::NumberLiteral(_) => !has(&snapshot, &Type::Number),
            Type::StringLiteral(_) => !has(&snapshot, &Type::String),
            Type::BooleanLiteral(_) => !has(&snapshot, &Type::Boolean),
            _ => true,
        });

        match members.len() {
            0 => Type::Never,
            1 => members.remove(0),
            _ => Type::Union(members),
        }
    }

    /// Replaces type variables bound in `map`.
    pub fn substitute(&self, map: &BTreeMap<u32, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::TypeVar(v) => map.get(&v.id).cloned().unwrap_or_else(|| self.clone()),
            Type::Array(elem) => Type::Array(Box::new(elem.substitute(map))),
            Type::Union(types) => Type::union(types.iter().map(|t| t.substitute(map)).collect()),
            Type::Object(props) => Type::Object(Rc::new(
                props
                    .iter()
                    .map(|p| Property {
                        name: p.name.clone(),
                        optional: p.optional,
                        ty: p.ty.substitute(map),
                    })
                    .collect(),
            )),
            Type::Function(f) => Type::function(
                f.type_params.clone(),
                f.params
                    .iter()
                    .map(|p| ParamType {
                        name: p.name.clone(),
                        ty: p.ty.substitute(map),
                        optional: p.optional,
                        rest: p.rest,
                    })
                    .collect(),
                f.ret.substitute(map),
            ),
            Type::Alias(a) => Type::Alias(Rc::new(AliasType {
                name: a.name.clone(),
                decl: a.decl,
                args: a.args.iter().map(|t| t.substitute(map)).collect(),
                target: a.target.substitute(map),
            })),
            _ => self.clone(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        match self.resolved() {
            Type::Object(props) => props.iter().find(|p| p.name == name),
            _ => None,
        }
    }

    /// Structural assignability of `self` to `target`.
    pub fn is_assignable_to(&self, target: &Type, strict_null_checks: bool) -> bool {
        let source = self.resolved();
        let target = target.resolved();

        match (source, target) {
            (_, Type::Any | Type::Unknown) | (Type::Any | Type::Never, _) => return true,
            (Type::Union(types), _) => {
                return types
                    .iter()
                    .all(|t| t.is_assignable_to(target, strict_null_checks))
            }
            (_, Type::Union(types)) => {
                return types
                    .iter()
                    .any(|t| source.is_assignable_to(t, strict_null_checks))
            }
            (Type::Null | Type::Undefined, _) if !strict_null_checks => return true,
            _ => (),
        }

        if source == target {
            return true;
        }

        match (source, target) {
            (Type::Undefined, Type::Void) => true,
            (Type::NumberLiteral(_), Type::Number)
            | (Type::StringLiteral(_), Type::String)
            | (Type::BooleanLiteral(_), Type::Boolean) => true,
            (
                Type::Array(_) | Type::Function(_) | Type::Object(_) | Type::NonPrimitive,
                Type::NonPrimitive,
            ) => true,
            (Type::Array(s), Type::Array(t)) => s.is_assignable_to(t, strict_null_checks),
            (Type::TypeVar(v), _) => match &v.constraint {
                Some(c) => c.is_assignable_to(target, strict_null_checks),
                None => false,
            },
            (Type::Object(s), Type::Object(t)) => t.iter().all(|tp| {
                match s.iter().find(|sp| sp.name == tp.name) {
                    Some(sp) => {
                        (tp.optional || !sp.optional)
                            && sp.ty.is_assignable_to(&tp.ty, strict_null_checks)
                    }
                    None => tp.optional,
                }
            }),
            (Type::Function(s), Type::Function(t)) => {
                let s = erase_type_params(s);
                let t = erase_type_params(t);
                if s.min_args() > t.params.len() && t.max_args().is_some() {
                    return false;
                }
                let params_ok = s.params.iter().zip(t.params.iter()).all(|(sp, tp)| {
                    // Parameters are compared bivariantly.
                    tp.ty.is_assignable_to(&sp.ty, strict_null_checks)
                        || sp.ty.is_assignable_to(&tp.ty, strict_null_checks)
                });
                params_ok
                    && (matches!(t.ret.resolved(), Type::Void)
                        || s.ret.is_assignable_to(&t.ret, strict_null_checks))
            }
            _ => false,
        }
    }
}

fn erase_type_params(f: &FunctionType) -> FunctionType {
    let map: BTreeMap<u32, Type> = f.type_params.iter().map(|v| (v.id, Type::Any)).collect();
    FunctionType {
        type_params: vec![],
        params: f
            .params
            .iter()
            .map(|p| ParamType {
                name: p.name.clone(),
                ty: p.ty.substitute(&map),
                optional: p.optional,
                rest: p.rest,
            })
            .collect(),
        ret: f.ret.substitute(&map),
    }
}

/// Renders types the way they read in source code.
///
/// Alias references always print by name, whether or not the alias can be
/// named from the context the formatter was created for. An alias imported
/// under another name prints under that local name.
#[derive(Debug, Default, Clone)]
pub struct TypeFormatter {
    // Alias declaration -> the name it is known by locally.
    local_names: BTreeMap<usize, String>,
}

impl TypeFormatter {
    pub fn new(local_names: BTreeMap<usize, String>) -> Self {
        Self { local_names }
    }

    pub fn format(&self, ty: &Type) -> String {
        let mut out = String::new();
        self.write(&mut out, ty);
        out
    }

    fn write(&self, out: &mut String, ty: &Type) {
        match ty {
            Type::Any => out.push_str("any"),
            Type::Unknown => out.push_str("unknown"),
            Type::Never => out.push_str("never"),
            Type::Void => out.push_str("void"),
            Type::Undefined => out.push_str("undefined"),
            Type::Null => out.push_str("null"),
            Type::Number => out.push_str("number"),
            Type::String => out.push_str("string"),
            Type::Boolean => out.push_str("boolean"),
            Type::NonPrimitive => out.push_str("object"),
            Type::NumberLiteral(n) => out.push_str(&format_number(*n)),
            Type::StringLiteral(s) => {
                out.push_str(&serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}")))
            }
            Type::BooleanLiteral(b) => out.push_str(if *b { "true" } else { "false" }),
            Type::Array(elem) => {
                self.write_operand(out, elem);
                out.push_str("[]");
            }
            Type::Union(types) => {
                for (idx, t) in types.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(" | ");
                    }
                    self.write_operand(out, t);
                }
            }
            Type::Function(f) => self.write_function(out, f),
            Type::Object(props) if props.is_empty() => out.push_str("{}"),
            Type::Object(props) => {
                out.push_str("{ ");
                for p in props.iter() {
                    out.push_str(&p.name);
                    if p.optional {
                        out.push('?');
                    }
                    out.push_str(": ");
                    self.write(out, &p.ty);
                    out.push_str("; ");
                }
                out.push('}');
            }
            Type::TypeVar(v) => out.push_str(&v.name),
            Type::Alias(alias) => {
                let name = self.local_names.get(&alias.decl).unwrap_or(&alias.name);
                out.push_str(name);
                if !alias.args.is_empty() {
                    out.push('<');
                    for (idx, a) in alias.args.iter().enumerate() {
                        if idx > 0 {
                            out.push_str(", ");
                        }
                        self.write(out, a);
                    }
                    out.push('>');
                }
            }
        }
    }

    // Function types and unions need parentheses inside arrays and unions.
    fn write_operand(&self, out: &mut String, ty: &Type) {
        let needs_parens = match ty {
            Type::Function(_) | Type::Union(_) => true,
            _ => false,
        };
        if needs_parens {
            out.push('(');
            self.write(out, ty);
            out.push(')');
        } else {
            self.write(out, ty);
        }
    }

    fn write_function(&self, out: &mut String, f: &FunctionType) {
        if !f.type_params.is_empty() {
            out.push('<');
            for (idx, v) in f.type_params.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                out.push_str(&v.name);
                if let Some(c) = &v.constraint {
                    out.push_str(" extends ");
                    self.write(out, c);
                }
            }
            out.push('>');
        }
        out.push('(');
        for (idx, p) in f.params.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            if p.rest {
                out.push_str("...");
            }
            out.push_str(&p.name);
            if p.optional {
                out.push('?');
            }
            out.push_str(": ");
            self.write(out, &p.ty);
        }
        out.push_str(") => ");
        self.write(out, &f.ret);
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e21 {
        let mut s = String::new();
        let _ = write!(s, "{}", n as i64);
        s
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{n}")
    }
}
