// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostics::Diagnostic;
use std::sync::Arc;

use core::cmp;
use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

struct SourceInternal {
    pub file: PathBuf,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

#[derive(Clone)]
pub struct Source {
    src: Arc<SourceInternal>,
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Arc::as_ptr(&self.src) == Arc::as_ptr(&other.src)
    }
}

impl cmp::Eq for Source {}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents<P: Into<PathBuf>>(file: P, contents: String) -> Result<Source> {
        let file = file.into();
        let max_size = u32::MAX as usize - 2; // Account for rows, cols possibly starting at 1, EOF etc.
        if contents.len() > max_size {
            bail!(
                "{} exceeds maximum allowed source file size {max_size}",
                file.display()
            );
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = contents.len() as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Arc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Source> {
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        };
        Self::from_contents(path.as_ref(), contents)
    }

    pub fn file(&self) -> &Path {
        &self.src.file
    }

    pub fn contents(&self) -> &str {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    /// Byte offset of a 1-based line and column.
    pub fn offset(&self, line: u32, col: u32) -> u32 {
        match self.src.lines.get(line.saturating_sub(1) as usize) {
            Some((start, end)) => cmp::min(start + col.saturating_sub(1), *end),
            None => self.src.contents.len() as u32,
        }
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line == 0 || line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file.display(), line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col.max(1) as usize - 1;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file.display(),
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn span(&self, line: u32, col: u32) -> Span {
        let start = self.offset(line, col);
        Span {
            source: self.clone(),
            line,
            col,
            start,
            end: start,
        }
    }

    /// Syntax error at the given position. Downcasts to [`Diagnostic`].
    pub fn error(&self, line: u32, col: u32, code: u32, msg: &str) -> anyhow::Error {
        anyhow::Error::new(Diagnostic::error(Some(self.span(line, col)), code, msg))
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, code: u32, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, code, msg)
    }

    /// Span covering `self` through `end`.
    pub fn join(&self, end: &Span) -> Span {
        Span {
            source: self.source.clone(),
            line: self.line,
            col: self.col,
            start: self.start,
            end: cmp::max(self.end, end.end),
        }
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.len() > max {
            (&t[0..max], "...")
        } else {
            (t.as_str(), "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

// Longest symbols first.
const SYMBOLS: [&str; 33] = [
    "===", "!==", "...", "==", "!=", "<=", ">=", "=>", "&&", "||", "{", "}", "[", "]", "(", ")",
    ",", ";", ":", "?", ".", "=", "!", "<", ">", "+", "-", "*", "/", "%", "&", "|", "@",
];

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn token(&self, kind: TokenKind, line: u32, col: u32, start: usize, end: usize) -> Token {
        Token(
            kind,
            Span {
                source: self.source.clone(),
                line,
                col,
                start: start as u32,
                end: end as u32,
            },
        )
    }

    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        let col = self.col;
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.col += (end - start) as u32;
        Ok(self.token(TokenKind::Ident, self.line, col, start, end))
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() || self.peek().1 == '_' {
            self.iter.next();
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let (start, _) = self.peek();
        let col = self.col;

        self.read_digits();

        // . must be followed by at least 1 digit.
        if self.peek().1 == '.' && self.peekahead(1).1.is_ascii_digit() {
            self.iter.next();
            self.read_digits();
        }

        let ch = self.peek().1;
        if ch == 'e' || ch == 'E' {
            self.iter.next();
            if matches!(self.peek().1, '+' | '-') {
                self.iter.next();
            }
            if !self.peek().1.is_ascii_digit() {
                let c = self.col + (self.peek().0 - start) as u32;
                return Err(self.source.error(self.line, c, 1124, "Digit expected."));
            }
            self.read_digits();
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        let ch = self.peek().1;
        if ch.is_ascii_alphabetic() || ch == '$' {
            return Err(self.source.error(
                self.line,
                self.col,
                1351,
                "An identifier or keyword cannot immediately follow a numeric literal.",
            ));
        }

        Ok(self.token(TokenKind::Number, self.line, col, start, end))
    }

    // The token's span excludes the quotes.
    fn read_string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        let (_, quote) = self.peek();
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (_, ch) = self.peek();
            match ch {
                '\x00' | '\n' | '\r' => {
                    return Err(self.source.error(
                        line,
                        col,
                        1002,
                        "Unterminated string literal.",
                    ));
                }
                '\\' => {
                    self.iter.next();
                    self.col += 1;
                    let (_, ch) = self.peek();
                    if ch == '\x00' {
                        continue;
                    }
                    self.iter.next();
                    self.col += 1;
                }
                _ if ch == quote => break,
                _ => {
                    self.iter.next();
                    self.col += 1;
                }
            }
        }

        let (end, _) = self.peek();
        self.iter.next();
        self.col += 1;

        Ok(self.token(TokenKind::String, line, col + 1, start, end))
    }

    fn skip_ws(&mut self) -> Result<()> {
        'outer: loop {
            match self.peek().1 {
                ' ' | '\t' | '\u{feff}' => self.col += 1,
                '\r' => (),
                '\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                '/' if self.peekahead(1).1 == '/' => {
                    loop {
                        match self.peek().1 {
                            '\n' | '\x00' => continue 'outer,
                            _ => {
                                self.iter.next();
                                self.col += 1;
                            }
                        };
                    }
                }
                '/' if self.peekahead(1).1 == '*' => {
                    let (line, col) = (self.line, self.col);
                    self.iter.next();
                    self.iter.next();
                    self.col += 2;
                    loop {
                        match self.peek().1 {
                            '*' if self.peekahead(1).1 == '/' => {
                                self.iter.next();
                                self.col += 1;
                                break;
                            }
                            '\x00' => {
                                return Err(self.source.error(line, col, 1010, "'*/' expected."))
                            }
                            '\n' => {
                                self.line += 1;
                                self.col = 1;
                            }
                            _ => self.col += 1,
                        }
                        self.iter.next();
                    }
                    self.col += 1;
                }
                _ => break,
            }
            self.iter.next();
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, chr) = self.peek();
        let col = self.col;

        match chr {
            '\x00' => Ok(self.token(TokenKind::Eof, self.line, col, start, start)),
            '"' | '\'' => self.read_string(),
            '`' => Err(self.source.error(
                self.line,
                col,
                1127,
                "Template literals are not supported.",
            )),
            '.' if self.peekahead(1).1.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' || chr == '$' => self.read_ident(),
            _ => {
                let rest = &self.source.contents()[start..];
                match SYMBOLS.iter().find(|s| rest.starts_with(*s)) {
                    Some(sym) => {
                        for _ in 0..sym.len() {
                            self.iter.next();
                        }
                        self.col += sym.len() as u32;
                        Ok(self.token(TokenKind::Symbol, self.line, col, start, start + sym.len()))
                    }
                    None => Err(self.source.error(self.line, col, 1127, "Invalid character.")),
                }
            }
        }
    }
}
