// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use test_generator::test_resources;
use tsprobe::unstable::*;

fn get_tokens(source: &Source) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut lex = Lexer::new(source);
    loop {
        let tok = lex.next_token()?;
        if tok.0 == TokenKind::Eof {
            break;
        }
        tokens.push(tok);
    }

    Ok(tokens)
}

// The caret printed for a token must sit under the token's text.
fn check_loc(tok: &Token) -> Result<()> {
    let msg = tok.1.message("", "");
    let lines: Vec<&str> = msg.split('\n').collect();
    let source_line = lines[3].split_once("| ").map_or("", |(_, l)| l);
    let caret_line = lines[4].split_once("| ").map_or("", |(_, l)| l);
    let Some(idx) = caret_line.find('^') else {
        bail!("could not find caret for {tok:#?} {msg}");
    };
    let source_str = source_line.get(idx..).unwrap_or("");
    let span_str = tok.1.text().split('\n').next().unwrap_or("");
    assert!(
        source_str.starts_with(span_str),
        "location mismatch for {tok:#?} {msg}\n{span_str}\n{source_str}"
    );
    Ok(())
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Case {
    pub ts: String,
    pub note: String,
    pub tokens: Vec<String>,
    pub kinds: Option<Vec<String>>,
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
        let source = Source::from_contents("case.ts", case.ts.clone())?;
        print!("case {} ", &case.note);

        match get_tokens(&source) {
            Ok(tokens) => {
                if let Some(expected) = &case.error {
                    bail!("expected error `{expected}`, lexed {tokens:?}");
                }
                for (idx, tok) in tokens.iter().enumerate() {
                    if idx >= case.tokens.len() {
                        break;
                    }
                    assert_eq!(
                        tok.1.text(),
                        case.tokens[idx],
                        "{} Expected token `{}` not found",
                        tok.1.message("mismatch-error", &case.tokens[idx]),
                        &case.tokens[idx]
                    );

                    if let Some(k) = &case.kinds {
                        if idx < k.len() {
                            assert_eq!(
                                format!("{:?}", tok.0),
                                k[idx],
                                "{}",
                                tok.1.message("mismatch-error", "token kind mismatch")
                            );
                        }
                    }

                    check_loc(tok)?;
                }
                assert_eq!(
                    tokens.len(),
                    case.tokens.len(),
                    "\n. Token count mismatch.\nLexed tokens:{:?}",
                    tokens
                );
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!(
                            "Error message\n`{}\n`\ndoes not contain `{}`",
                            actual,
                            expected
                        );
                    }
                }
                _ => return Err(actual),
            },
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

#[test_resources("tests/lexer/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn error_positions() -> Result<()> {
    let source = Source::from_contents("case.ts", "let a = 1;\nlet b = 'x\n".to_string())?;
    let err = match get_tokens(&source) {
        Ok(tokens) => bail!("expected an error, got {tokens:?}"),
        Err(err) => err,
    };
    let diagnostic = err.downcast::<Diagnostic>()?;
    assert_eq!(diagnostic.code, 1002);
    let span = diagnostic.span.expect("positioned");
    assert_eq!((span.line, span.col), (2, 9));
    Ok(())
}

#[test]
fn syntax_errors_are_send_and_sync() -> Result<()> {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    let source = Source::from_contents("case.ts", "const s = \"open\n".to_string())?;
    assert_send_sync(&source);
    let err = match get_tokens(&source) {
        Ok(tokens) => bail!("expected an error, got {tokens:?}"),
        Err(err) => err,
    };
    let handle = std::thread::spawn(move || err.downcast::<Diagnostic>().map(|d| d.code).ok());
    assert_eq!(handle.join().expect("thread panicked"), Some(1002));
    Ok(())
}
