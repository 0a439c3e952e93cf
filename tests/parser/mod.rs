// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use test_generator::test_resources;
use tsprobe::unstable::*;

macro_rules! my_assert_eq {
    ($left:expr, $right:expr, $($arg:tt)+) => {
	match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
		    return Err(anyhow!("mismatch:\nleft  = {:?}\nright = {:?}\n{}",
		     		       &$left, &$right, format_args!($($arg)+)));
                }
            }
	}
    }
}

fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident { span } => span.text().to_string(),
        Expr::Number { value, .. } => format!("{value}"),
        Expr::String { value, .. } => format!("{value:?}"),
        Expr::Bool { value, .. } => format!("{value}"),
        Expr::Null { .. } => "null".to_string(),
        Expr::Array { items, .. } => format!("[{}]", items.len()),
        Expr::Object { fields, .. } => {
            let keys: Vec<&str> = fields.iter().map(|(k, _)| k.text()).collect();
            format!("{{{}}}", keys.join(","))
        }
        Expr::Call {
            callee,
            type_args,
            args,
            ..
        } => {
            let args: Vec<String> = args.iter().map(|a| describe_expr(a)).collect();
            let type_args = if type_args.is_empty() {
                String::new()
            } else {
                format!("<{}>", type_args.len())
            };
            format!("{}{type_args}({})", describe_expr(callee), args.join(", "))
        }
        Expr::Member {
            object, property, ..
        } => format!("{}.{}", describe_expr(object), property.text()),
        Expr::Arrow {
            signature, body, ..
        } => {
            let body = match body {
                ArrowBody::Expr(e) => describe_expr(e),
                ArrowBody::Block(b) => format!("{{{}}}", b.statements.len()),
            };
            format!("arrow/{} => {body}", signature.params.len())
        }
        Expr::Paren { expr, .. } => format!("({})", describe_expr(expr)),
        Expr::Unary { op, expr, .. } => format!("{op:?} {}", describe_expr(expr)),
        Expr::Binary { op, lhs, rhs, .. } => {
            format!("({} {op:?} {})", describe_expr(lhs), describe_expr(rhs))
        }
    }
}

fn describe_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named { name, args, .. } if args.is_empty() => name.text().to_string(),
        TypeExpr::Named { name, args, .. } => {
            let args: Vec<String> = args.iter().map(|a| describe_type(a)).collect();
            format!("{}<{}>", name.text(), args.join(", "))
        }
        TypeExpr::StringLiteral { value, .. } => format!("{value:?}"),
        TypeExpr::NumberLiteral { value, .. } => format!("{value}"),
        TypeExpr::Array { elem, .. } => format!("{}[]", describe_type(elem)),
        TypeExpr::Union { types, .. } => {
            let types: Vec<String> = types.iter().map(|t| describe_type(t)).collect();
            types.join(" | ")
        }
        TypeExpr::Function { signature, .. } => format!(
            "fn/{} => {}",
            signature.params.len(),
            signature
                .return_type
                .as_ref()
                .map_or(String::new(), |t| describe_type(t))
        ),
        TypeExpr::Object { members, .. } => {
            let names: Vec<String> = members
                .iter()
                .map(|m| format!("{}{}", m.name.text(), if m.optional { "?" } else { "" }))
                .collect();
            format!("{{{}}}", names.join(","))
        }
        TypeExpr::Paren { ty, .. } => format!("({})", describe_type(ty)),
    }
}

fn describe(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Import(d) => {
            let names: Vec<&str> = d.specifiers.iter().map(|s| s.local().text()).collect();
            format!("import {{{}}} {}", names.join(","), d.module_name)
        }
        Stmt::Function(f) => {
            let prefix = match (f.modifiers.export, f.modifiers.declare) {
                (true, true) => "export declare ",
                (true, false) => "export ",
                (false, true) => "declare ",
                _ => "",
            };
            let body = match &f.body {
                Some(b) => format!(" {{{}}}", b.statements.len()),
                None => String::new(),
            };
            format!(
                "{prefix}function {}<{}>/{}{body}",
                f.name.text(),
                f.signature.type_params.len(),
                f.signature.params.len()
            )
        }
        Stmt::Var(v) => {
            let kind = match v.kind {
                VarKind::Const => "const",
                VarKind::Let => "let",
                VarKind::Var => "var",
            };
            let ty = v
                .ty
                .as_ref()
                .map_or(String::new(), |t| format!(": {}", describe_type(t)));
            let init = v
                .init
                .as_ref()
                .map_or(String::new(), |e| format!(" = {}", describe_expr(e)));
            format!("{kind} {}{ty}{init}", v.name.text())
        }
        Stmt::TypeAlias(t) => format!("type {} = {}", t.name.text(), describe_type(&t.ty)),
        Stmt::Expr { expr, .. } => describe_expr(expr),
        Stmt::Return { value, .. } => match value {
            Some(v) => format!("return {}", describe_expr(v)),
            None => "return".to_string(),
        },
        Stmt::Empty { .. } => ";".to_string(),
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Case {
    pub note: String,
    pub ts: String,
    pub statements: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {}", file);

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        print!("case {} ", &case.note);
        let source = Source::from_contents("case.ts", case.ts.clone())?;
        let parsed = Parser::new(&source).and_then(|mut parser| parser.parse());

        match (parsed, &case.error) {
            (Ok(file), None) => {
                let actual: Vec<String> = file.statements.iter().map(|s| describe(s)).collect();
                if let Some(expected) = &case.statements {
                    my_assert_eq!(actual, *expected, "case {}", case.note);
                }
            }
            (Ok(file), Some(expected)) => {
                bail!("expected error `{expected}`, parsed {:?}", file.statements)
            }
            (Err(actual), Some(expected)) => {
                let actual = actual.to_string();
                if !actual.contains(expected) {
                    bail!(
                        "Error message\n`{}\n`\ndoes not contain `{}`",
                        actual,
                        expected
                    );
                }
            }
            (Err(actual), None) => return Err(actual),
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

#[test_resources("tests/parser/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn statement_spans() -> Result<()> {
    let source = Source::from_contents(
        "case.ts",
        "function main() {\n  first();\n  second(1, 2)\n}\n".to_string(),
    )?;
    let file = Parser::new(&source)?.parse()?;
    let Stmt::Function(f) = file.statements[0].as_ref() else {
        bail!("expected a function");
    };
    let body = f.body.as_ref().ok_or_else(|| anyhow!("missing body"))?;
    let texts: Vec<&str> = body.statements.iter().map(|s| s.span().text()).collect();
    assert_eq!(texts, vec!["first();", "second(1, 2)"]);
    Ok(())
}
