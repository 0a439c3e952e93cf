// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;

use anyhow::Result;

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    line: u32,
    end: u32,
}

const UNSUPPORTED_STATEMENTS: [&str; 12] = [
    "if", "for", "while", "do", "switch", "try", "throw", "class", "interface", "enum",
    "namespace", "break",
];

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            line: 0,
            end: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.line = self.tok.1.line;
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn peek_token(&self) -> Result<Token> {
        let mut lexer = self.lexer.clone();
        lexer.next_token()
    }

    fn error(&self, code: u32, msg: &str) -> anyhow::Error {
        self.source.error(self.tok.1.line, self.tok.1.col, code, msg)
    }

    fn expect(&mut self, text: &str) -> Result<()> {
        if self.tok.0 == TokenKind::Symbol && self.token_text() == text
            || self.tok.0 == TokenKind::Ident && self.token_text() == text
        {
            self.next_token()
        } else {
            Err(self.error(1005, &format!("'{text}' expected.")))
        }
    }

    fn is_symbol(&self, text: &str) -> bool {
        self.tok.0 == TokenKind::Symbol && self.token_text() == text
    }

    fn is_ident(&self, text: &str) -> bool {
        self.tok.0 == TokenKind::Ident && self.token_text() == text
    }

    fn eat_symbol(&mut self, text: &str) -> Result<bool> {
        if self.is_symbol(text) {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // Span from `start` to the end of the previously consumed token.
    fn span_from(&self, start: &Span) -> Span {
        Span {
            source: self.source.clone(),
            line: start.line,
            col: start.col,
            start: start.start,
            end: core::cmp::max(self.end, start.start),
        }
    }

    fn is_reserved(&self, ident: &str) -> bool {
        matches!(
            ident,
            "const"
                | "else"
                | "export"
                | "false"
                | "function"
                | "import"
                | "let"
                | "new"
                | "null"
                | "return"
                | "true"
                | "var"
                | "void"
        ) || UNSUPPORTED_STATEMENTS.contains(&ident)
    }

    fn parse_ident(&mut self) -> Result<Span> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Ident if self.is_reserved(span.text()) => Err(self.error(
                1359,
                &format!(
                    "Identifier expected. '{}' is a reserved word that cannot be used here.",
                    span.text()
                ),
            )),
            TokenKind::Ident => {
                self.next_token()?;
                Ok(span)
            }
            _ => Err(self.error(1003, "Identifier expected.")),
        }
    }

    // Automatic semicolon insertion: `;` may be omitted before `}`, at EOF or
    // when the next token starts a new line.
    fn parse_semicolon(&mut self) -> Result<()> {
        if self.eat_symbol(";")? {
            return Ok(());
        }
        if self.is_symbol("}") || self.tok.0 == TokenKind::Eof || self.tok.1.line > self.line {
            return Ok(());
        }
        Err(self.error(1005, "';' expected."))
    }

    pub fn parse(&mut self) -> Result<SourceFile> {
        let mut statements = vec![];
        while self.tok.0 != TokenKind::Eof {
            statements.push(self.parse_statement(true)?);
        }
        Ok(SourceFile {
            source: self.source.clone(),
            statements,
        })
    }

    fn parse_statement(&mut self, top_level: bool) -> Result<Ref<Stmt>> {
        let start = self.tok.1.clone();
        if self.tok.0 == TokenKind::Ident {
            let text = self.token_text().to_string();
            match text.as_str() {
                "import" if self.peek_token()?.1.text() != "(" => {
                    if !top_level {
                        return Err(self.error(
                            1232,
                            "An import declaration can only be used at the top level of a module.",
                        ));
                    }
                    return Ok(Ref::new(Stmt::Import(self.parse_import()?)));
                }
                "export" | "declare" | "function" | "const" | "let" | "var" => {
                    return self.parse_declaration(start);
                }
                "type" if self.peek_token()?.0 == TokenKind::Ident => {
                    return self.parse_declaration(start);
                }
                "return" => {
                    if top_level {
                        return Err(self.error(
                            1108,
                            "A 'return' statement can only be used within a function body.",
                        ));
                    }
                    self.next_token()?;
                    let value = if self.is_symbol(";")
                        || self.is_symbol("}")
                        || self.tok.0 == TokenKind::Eof
                        || self.tok.1.line > self.line
                    {
                        None
                    } else {
                        Some(self.parse_expr()?)
                    };
                    self.parse_semicolon()?;
                    return Ok(Ref::new(Stmt::Return {
                        span: self.span_from(&start),
                        value,
                    }));
                }
                kw if UNSUPPORTED_STATEMENTS.contains(&kw) => {
                    return Err(self.error(1128, &format!("'{kw}' statements are not supported.")));
                }
                _ => (),
            }
        }

        if self.eat_symbol(";")? {
            return Ok(Ref::new(Stmt::Empty {
                span: self.span_from(&start),
            }));
        }
        if self.is_symbol("{") || self.is_symbol("}") {
            return Err(self.error(1128, "Declaration or statement expected."));
        }

        let expr = self.parse_expr()?;
        self.parse_semicolon()?;
        Ok(Ref::new(Stmt::Expr {
            span: self.span_from(&start),
            expr,
        }))
    }

    fn parse_declaration(&mut self, start: Span) -> Result<Ref<Stmt>> {
        let mut modifiers = Modifiers::default();
        if self.is_ident("export") {
            modifiers.export = true;
            self.next_token()?;
        }
        if self.is_ident("declare") {
            modifiers.declare = true;
            self.next_token()?;
        }

        let keyword = self.token_text().to_string();
        let stmt = match keyword.as_str() {
            "function" if self.tok.0 == TokenKind::Ident => {
                Stmt::Function(self.parse_function(start, modifiers)?)
            }
            "const" | "let" | "var" if self.tok.0 == TokenKind::Ident => {
                Stmt::Var(self.parse_var(start, modifiers)?)
            }
            "type" if self.tok.0 == TokenKind::Ident => {
                Stmt::TypeAlias(self.parse_type_alias(start, modifiers)?)
            }
            _ => return Err(self.error(1128, "Declaration or statement expected.")),
        };
        Ok(Ref::new(stmt))
    }

    fn parse_import(&mut self) -> Result<ImportDecl> {
        let start = self.tok.1.clone();
        self.expect("import")?;

        let mut specifiers = vec![];
        if self.tok.0 != TokenKind::String {
            self.expect("{")?;
            while !self.is_symbol("}") {
                let name = self.parse_ident()?;
                let alias = if self.is_ident("as") {
                    self.next_token()?;
                    Some(self.parse_ident()?)
                } else {
                    None
                };
                specifiers.push(ImportSpecifier { name, alias });
                if !self.eat_symbol(",")? {
                    break;
                }
            }
            self.expect("}")?;
            self.expect("from")?;
        }

        if self.tok.0 != TokenKind::String {
            return Err(self.error(1141, "String literal expected."));
        }
        let module = self.tok.1.clone();
        let module_name = unescape(module.text());
        self.next_token()?;
        self.parse_semicolon()?;

        Ok(ImportDecl {
            span: self.span_from(&start),
            specifiers,
            module,
            module_name,
        })
    }

    fn parse_function(&mut self, start: Span, modifiers: Modifiers) -> Result<FunctionDecl> {
        self.expect("function")?;
        let name = self.parse_ident()?;
        let signature = self.parse_signature(":")?;

        let body = if self.is_symbol("{") {
            Some(self.parse_block()?)
        } else {
            self.parse_semicolon()?;
            None
        };

        Ok(FunctionDecl {
            span: self.span_from(&start),
            modifiers,
            name,
            signature,
            body,
        })
    }

    fn parse_var(&mut self, start: Span, modifiers: Modifiers) -> Result<VarDecl> {
        let kind = match self.token_text() {
            "const" => VarKind::Const,
            "let" => VarKind::Let,
            _ => VarKind::Var,
        };
        self.next_token()?;
        let name = self.parse_ident()?;

        let ty = if self.eat_symbol(":")? {
            Some(self.parse_type()?)
        } else {
            None
        };

        let init = if self.eat_symbol("=")? {
            Some(self.parse_expr()?)
        } else {
            None
        };

        if kind == VarKind::Const && init.is_none() && !modifiers.declare {
            return Err(name.error(1155, "'const' declarations must be initialized."));
        }
        self.parse_semicolon()?;

        Ok(VarDecl {
            span: self.span_from(&start),
            modifiers,
            kind,
            name,
            ty,
            init,
        })
    }

    fn parse_type_alias(&mut self, start: Span, modifiers: Modifiers) -> Result<TypeAliasDecl> {
        self.expect("type")?;
        let name = self.parse_ident()?;
        let type_params = self.parse_type_params()?;
        self.expect("=")?;
        let ty = self.parse_type()?;
        self.parse_semicolon()?;
        Ok(TypeAliasDecl {
            span: self.span_from(&start),
            modifiers,
            name,
            type_params,
            ty,
        })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.tok.1.clone();
        self.expect("{")?;
        let mut statements = vec![];
        while !self.is_symbol("}") {
            if self.tok.0 == TokenKind::Eof {
                return Err(self.error(1005, "'}' expected."));
            }
            statements.push(self.parse_statement(false)?);
        }
        self.expect("}")?;
        Ok(Block {
            span: self.span_from(&start),
            statements,
        })
    }

    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>> {
        let mut type_params = vec![];
        if !self.eat_symbol("<")? {
            return Ok(type_params);
        }
        loop {
            let name = self.parse_ident()?;
            let constraint = if self.is_ident("extends") {
                self.next_token()?;
                Some(self.parse_type()?)
            } else {
                None
            };
            type_params.push(TypeParam { name, constraint });
            if !self.eat_symbol(",")? || self.is_symbol(">") {
                break;
            }
        }
        self.expect(">")?;
        Ok(type_params)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        self.expect("(")?;
        let mut params = vec![];
        while !self.is_symbol(")") {
            let start = self.tok.1.clone();
            let rest = self.eat_symbol("...")?;
            let name = self.parse_ident()?;
            let optional = self.eat_symbol("?")?;
            let ty = if self.eat_symbol(":")? {
                Some(self.parse_type()?)
            } else {
                None
            };
            let default = if self.eat_symbol("=")? {
                Some(self.parse_assign_expr()?)
            } else {
                None
            };
            params.push(Param {
                span: self.span_from(&start),
                name,
                optional,
                rest,
                ty,
                default,
            });
            if !self.eat_symbol(",")? {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    // `<T>(params) <ret_sep> Type`. The return annotation is optional when
    // `ret_sep` is `:`.
    fn parse_signature(&mut self, ret_sep: &str) -> Result<Signature> {
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let return_type = if ret_sep == "=>" {
            self.expect("=>")?;
            Some(self.parse_type()?)
        } else if self.eat_symbol(ret_sep)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(Signature {
            type_params,
            params,
            return_type,
        })
    }

    pub fn parse_expr(&mut self) -> Result<Ref<Expr>> {
        self.parse_assign_expr()
    }

    fn try_parse_arrow_head(&mut self) -> Result<Option<Signature>> {
        if self.tok.0 == TokenKind::Ident {
            if self.peek_token()?.1.text() != "=>" {
                return Ok(None);
            }
            let start = self.tok.1.clone();
            let name = self.parse_ident()?;
            self.expect("=>")?;
            return Ok(Some(Signature {
                type_params: vec![],
                params: vec![Param {
                    span: start,
                    name,
                    optional: false,
                    rest: false,
                    ty: None,
                    default: None,
                }],
                return_type: None,
            }));
        }

        if !self.is_symbol("(") && !self.is_symbol("<") {
            return Ok(None);
        }
        let saved = self.clone();
        let head = self.parse_signature(":").and_then(|sig| {
            if self.is_symbol("=>") {
                self.next_token()?;
                Ok(Some(sig))
            } else {
                Ok(None)
            }
        });
        match head {
            Ok(Some(sig)) => Ok(Some(sig)),
            _ => {
                *self = saved;
                Ok(None)
            }
        }
    }

    fn parse_assign_expr(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok.1.clone();
        if let Some(signature) = self.try_parse_arrow_head()? {
            let body = if self.is_symbol("{") {
                ArrowBody::Block(self.parse_block()?)
            } else {
                ArrowBody::Expr(self.parse_assign_expr()?)
            };
            return Ok(Ref::new(Expr::Arrow {
                span: self.span_from(&start),
                signature,
                body,
            }));
        }
        self.parse_binary_expr(0)
    }

    fn binary_op(&self) -> Option<(BinOp, u32)> {
        if self.tok.0 != TokenKind::Symbol {
            return None;
        }
        Some(match self.token_text() {
            "||" => (BinOp::Or, 1),
            "&&" => (BinOp::And, 2),
            "==" => (BinOp::Eq, 3),
            "!=" => (BinOp::Ne, 3),
            "===" => (BinOp::StrictEq, 3),
            "!==" => (BinOp::StrictNe, 3),
            "<" => (BinOp::Lt, 4),
            "<=" => (BinOp::Le, 4),
            ">" => (BinOp::Gt, 4),
            ">=" => (BinOp::Ge, 4),
            "+" => (BinOp::Add, 5),
            "-" => (BinOp::Sub, 5),
            "*" => (BinOp::Mul, 6),
            "/" => (BinOp::Div, 6),
            "%" => (BinOp::Mod, 6),
            _ => return None,
        })
    }

    // Precedence climbing over left-associative binary operators.
    fn parse_binary_expr(&mut self, min_prec: u32) -> Result<Ref<Expr>> {
        let start = self.tok.1.clone();
        let mut lhs = self.parse_unary_expr()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec <= min_prec {
                break;
            }
            self.next_token()?;
            let rhs = self.parse_binary_expr(prec)?;
            lhs = Ref::new(Expr::Binary {
                span: self.span_from(&start),
                op,
                lhs,
                rhs,
            });
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok.1.clone();
        let op = if self.is_symbol("!") {
            UnaryOp::Not
        } else if self.is_symbol("-") {
            UnaryOp::Minus
        } else {
            return self.parse_postfix_expr();
        };
        self.next_token()?;
        let expr = self.parse_unary_expr()?;
        Ok(Ref::new(Expr::Unary {
            span: self.span_from(&start),
            op,
            expr,
        }))
    }

    // `<T, U>` immediately followed by `(`. Restores the parser otherwise,
    // leaving `<` to be read as a comparison.
    fn try_parse_call_type_args(&mut self) -> Result<Option<Vec<Ref<TypeExpr>>>> {
        if !self.is_symbol("<") {
            return Ok(None);
        }
        let saved = self.clone();
        let args = (|| -> Result<Option<Vec<Ref<TypeExpr>>>> {
            self.next_token()?;
            let args = self.parse_type_list(">")?;
            self.expect(">")?;
            Ok(if self.is_symbol("(") { Some(args) } else { None })
        })();
        match args {
            Ok(Some(args)) => Ok(Some(args)),
            _ => {
                *self = saved;
                Ok(None)
            }
        }
    }

    fn parse_postfix_expr(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_primary_expr()?;
        loop {
            if self.is_symbol(".") {
                self.next_token()?;
                if self.tok.0 != TokenKind::Ident {
                    return Err(self.error(1003, "Identifier expected."));
                }
                let property = self.tok.1.clone();
                self.next_token()?;
                expr = Ref::new(Expr::Member {
                    span: self.span_from(&start),
                    object: expr,
                    property,
                });
                continue;
            }

            let type_args = match self.try_parse_call_type_args()? {
                Some(args) => args,
                None if self.is_symbol("(") => vec![],
                None => break,
            };

            self.expect("(")?;
            let mut args = vec![];
            while !self.is_symbol(")") {
                args.push(self.parse_assign_expr()?);
                if !self.eat_symbol(",")? {
                    break;
                }
            }
            self.expect(")")?;
            expr = Ref::new(Expr::Call {
                span: self.span_from(&start),
                callee: expr,
                type_args,
                args,
            });
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Ref<Expr>> {
        let span = self.tok.1.clone();
        let expr = match self.tok.0 {
            TokenKind::Number => {
                let value = parse_number(&span)?;
                self.next_token()?;
                Expr::Number { span, value }
            }
            TokenKind::String => {
                let value = unescape(span.text());
                self.next_token()?;
                Expr::String { span, value }
            }
            TokenKind::Ident => match span.text() {
                "true" | "false" => {
                    let value = span.text() == "true";
                    self.next_token()?;
                    Expr::Bool { span, value }
                }
                "null" => {
                    self.next_token()?;
                    Expr::Null { span }
                }
                _ => {
                    let span = self.parse_ident()?;
                    Expr::Ident { span }
                }
            },
            TokenKind::Symbol if self.is_symbol("(") => {
                self.next_token()?;
                let expr = self.parse_expr()?;
                self.expect(")")?;
                Expr::Paren {
                    span: self.span_from(&span),
                    expr,
                }
            }
            TokenKind::Symbol if self.is_symbol("[") => {
                self.next_token()?;
                let mut items = vec![];
                while !self.is_symbol("]") {
                    items.push(self.parse_assign_expr()?);
                    if !self.eat_symbol(",")? {
                        break;
                    }
                }
                self.expect("]")?;
                Expr::Array {
                    span: self.span_from(&span),
                    items,
                }
            }
            TokenKind::Symbol if self.is_symbol("{") => {
                self.next_token()?;
                let mut fields = vec![];
                while !self.is_symbol("}") {
                    let key = match self.tok.0 {
                        TokenKind::Ident | TokenKind::String => {
                            let key = self.tok.1.clone();
                            self.next_token()?;
                            key
                        }
                        _ => return Err(self.error(1136, "Property assignment expected.")),
                    };
                    let value = if self.eat_symbol(":")? {
                        self.parse_assign_expr()?
                    } else {
                        // Shorthand `{ a }`.
                        Ref::new(Expr::Ident { span: key.clone() })
                    };
                    fields.push((key, value));
                    if !self.eat_symbol(",")? {
                        break;
                    }
                }
                self.expect("}")?;
                Expr::Object {
                    span: self.span_from(&span),
                    fields,
                }
            }
            _ => return Err(self.error(1109, "Expression expected.")),
        };
        Ok(Ref::new(expr))
    }

    fn parse_type_list(&mut self, end: &str) -> Result<Vec<Ref<TypeExpr>>> {
        let mut types = vec![];
        while !self.is_symbol(end) {
            types.push(self.parse_type()?);
            if !self.eat_symbol(",")? {
                break;
            }
        }
        Ok(types)
    }

    pub fn parse_type(&mut self) -> Result<Ref<TypeExpr>> {
        let start = self.tok.1.clone();
        self.eat_symbol("|")?;
        let mut types = vec![self.parse_postfix_type()?];
        while self.eat_symbol("|")? {
            types.push(self.parse_postfix_type()?);
        }
        if types.len() == 1 {
            return Ok(types.remove(0));
        }
        Ok(Ref::new(TypeExpr::Union {
            span: self.span_from(&start),
            types,
        }))
    }

    fn parse_postfix_type(&mut self) -> Result<Ref<TypeExpr>> {
        let start = self.tok.1.clone();
        let mut ty = self.parse_primary_type()?;
        while self.is_symbol("[") && self.peek_token()?.1.text() == "]" {
            self.next_token()?;
            self.next_token()?;
            ty = Ref::new(TypeExpr::Array {
                span: self.span_from(&start),
                elem: ty,
            });
        }
        Ok(ty)
    }

    fn try_parse_function_type(&mut self) -> Result<Option<Signature>> {
        let saved = self.clone();
        match self.parse_signature("=>") {
            Ok(sig) => Ok(Some(sig)),
            Err(_) if saved.is_symbol("<") => {
                // A `<` can only start a function type, report its error.
                *self = saved;
                self.parse_signature("=>").map(Some)
            }
            Err(_) => {
                *self = saved;
                Ok(None)
            }
        }
    }

    fn parse_primary_type(&mut self) -> Result<Ref<TypeExpr>> {
        let span = self.tok.1.clone();
        let ty = match self.tok.0 {
            TokenKind::Symbol if self.is_symbol("(") || self.is_symbol("<") => {
                if let Some(signature) = self.try_parse_function_type()? {
                    TypeExpr::Function {
                        span: self.span_from(&span),
                        signature,
                    }
                } else {
                    self.expect("(")?;
                    let ty = self.parse_type()?;
                    self.expect(")")?;
                    TypeExpr::Paren {
                        span: self.span_from(&span),
                        ty,
                    }
                }
            }
            TokenKind::Symbol if self.is_symbol("{") => {
                self.next_token()?;
                let mut members = vec![];
                while !self.is_symbol("}") {
                    let name = match self.tok.0 {
                        TokenKind::Ident | TokenKind::String => {
                            let name = self.tok.1.clone();
                            self.next_token()?;
                            name
                        }
                        _ => return Err(self.error(1131, "Property or signature expected.")),
                    };
                    let optional = self.eat_symbol("?")?;
                    self.expect(":")?;
                    let ty = self.parse_type()?;
                    members.push(PropertySignature { name, optional, ty });
                    let separated = self.eat_symbol(";")? || self.eat_symbol(",")?;
                    if !separated && (self.is_symbol("}") || self.tok.1.line == self.line) {
                        break;
                    }
                }
                self.expect("}")?;
                TypeExpr::Object {
                    span: self.span_from(&span),
                    members,
                }
            }
            TokenKind::Symbol if self.is_symbol("-") => {
                self.next_token()?;
                if self.tok.0 != TokenKind::Number {
                    return Err(self.error(1110, "Type expected."));
                }
                let value = -parse_number(&self.tok.1)?;
                self.next_token()?;
                TypeExpr::NumberLiteral {
                    span: self.span_from(&span),
                    value,
                }
            }
            TokenKind::String => {
                let value = unescape(span.text());
                self.next_token()?;
                TypeExpr::StringLiteral { span, value }
            }
            TokenKind::Number => {
                let value = parse_number(&span)?;
                self.next_token()?;
                TypeExpr::NumberLiteral { span, value }
            }
            // `void` and `null` are reserved as values but valid type names.
            TokenKind::Ident => {
                let name = span.clone();
                self.next_token()?;
                let args = if self.eat_symbol("<")? {
                    let args = self.parse_type_list(">")?;
                    self.expect(">")?;
                    args
                } else {
                    vec![]
                };
                TypeExpr::Named {
                    span: self.span_from(&span),
                    name,
                    args,
                }
            }
            _ => return Err(self.error(1110, "Type expected.")),
        };
        Ok(Ref::new(ty))
    }
}

fn parse_number(span: &Span) -> Result<f64> {
    span.text()
        .replace('_', "")
        .parse::<f64>()
        .map_err(|_| span.error(1125, "Invalid numeric literal."))
}

/// Resolves escape sequences in the body of a string literal.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(c @ ('u' | 'x')) => {
                let len = if c == 'u' { 4 } else { 2 };
                let hex: String = chars.clone().take(len).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == len => {
                        out.push(decoded);
                        for _ in 0..len {
                            chars.next();
                        }
                    }
                    _ => out.push(c),
                }
            }
            Some(c) => out.push(c),
            None => (),
        }
    }
    out
}
