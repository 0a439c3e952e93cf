// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Reading of `tsconfig.json`.
//!
//! The file is JSON with comments and trailing commas. Both are blanked out
//! in place before handing the text to `serde_json`, so error positions
//! reported by `serde_json` still point into the original file.

use crate::diagnostics::Diagnostic;
use crate::lexer::{Source, Span};
use crate::program::normalize_path;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionKind {
    Boolean,
    String,
    Number,
    // Array of strings.
    List,
    // Array of anything (`plugins`).
    Array,
    // Object (`paths`).
    Object,
    Target,
}

#[rustfmt::skip]
lazy_static! {
    static ref KNOWN_OPTIONS: BTreeMap<&'static str, OptionKind> = {
	let mut m = BTreeMap::new();
	for name in [
	    "allowArbitraryExtensions", "allowImportingTsExtensions", "allowJs",
	    "allowSyntheticDefaultImports", "allowUmdGlobalAccess", "allowUnreachableCode",
	    "allowUnusedLabels", "alwaysStrict", "assumeChangesOnlyAffectDirectDependencies",
	    "checkJs", "composite", "declaration", "declarationMap", "diagnostics",
	    "disableReferencedProjectLoad", "disableSizeLimit", "disableSolutionSearching",
	    "disableSourceOfProjectReferenceRedirect", "downlevelIteration", "emitBOM",
	    "emitDeclarationOnly", "emitDecoratorMetadata", "erasableSyntaxOnly",
	    "esModuleInterop", "exactOptionalPropertyTypes", "experimentalDecorators",
	    "explainFiles", "extendedDiagnostics", "forceConsistentCasingInFileNames",
	    "importHelpers", "incremental", "inlineSourceMap", "inlineSources",
	    "isolatedDeclarations", "isolatedModules", "keyofStringsOnly", "libReplacement",
	    "listEmittedFiles", "listFiles", "noCheck", "noEmit", "noEmitHelpers",
	    "noEmitOnError", "noErrorTruncation", "noFallthroughCasesInSwitch",
	    "noImplicitAny", "noImplicitOverride", "noImplicitReturns", "noImplicitThis",
	    "noImplicitUseStrict", "noLib", "noPropertyAccessFromIndexSignature",
	    "noResolve", "noStrictGenericChecks", "noUncheckedIndexedAccess",
	    "noUncheckedSideEffectImports", "noUnusedLocals", "noUnusedParameters",
	    "preserveConstEnums", "preserveSymlinks", "preserveValueImports",
	    "preserveWatchOutput", "pretty", "removeComments", "resolveJsonModule",
	    "resolvePackageJsonExports", "resolvePackageJsonImports",
	    "rewriteRelativeImportExtensions", "skipDefaultLibCheck", "skipLibCheck",
	    "sourceMap", "strict", "strictBindCallApply", "strictBuiltinIteratorReturn",
	    "strictFunctionTypes", "strictNullChecks", "strictPropertyInitialization",
	    "stripInternal", "suppressExcessPropertyErrors",
	    "suppressImplicitAnyIndexErrors", "traceResolution", "useDefineForClassFields",
	    "useUnknownInCatchVariables", "verbatimModuleSyntax",
	] {
	    m.insert(name, OptionKind::Boolean);
	}
	for name in [
	    "baseUrl", "charset", "declarationDir", "generateCpuProfile",
	    "ignoreDeprecations", "importsNotUsedAsValues", "jsx", "jsxFactory",
	    "jsxFragmentFactory", "jsxImportSource", "mapRoot", "module",
	    "moduleDetection", "moduleResolution", "newLine", "out", "outDir", "outFile",
	    "reactNamespace", "rootDir", "sourceRoot", "tsBuildInfoFile",
	] {
	    m.insert(name, OptionKind::String);
	}
	for name in ["customConditions", "lib", "moduleSuffixes", "rootDirs", "typeRoots", "types"] {
	    m.insert(name, OptionKind::List);
	}
	m.insert("maxNodeModuleJsSize", OptionKind::Number);
	m.insert("plugins", OptionKind::Array);
	m.insert("paths", OptionKind::Object);
	m.insert("target", OptionKind::Target);
	m
    };
}

const TARGETS: [&str; 14] = [
    "es3", "es5", "es6", "es2015", "es2016", "es2017", "es2018", "es2019", "es2020", "es2021",
    "es2022", "es2023", "es2024", "esnext",
];

/// Compiler options as written in the config file. Only options the engine
/// knows about survive validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerOptions(BTreeMap<String, Value>);

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), value);
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    pub fn strict(&self) -> bool {
        self.flag("strict").unwrap_or(false)
    }

    /// Implied by `strict` unless set explicitly.
    pub fn strict_null_checks(&self) -> bool {
        self.flag("strictNullChecks").unwrap_or_else(|| self.strict())
    }

    /// Implied by `strict` unless set explicitly.
    pub fn no_implicit_any(&self) -> bool {
        self.flag("noImplicitAny").unwrap_or_else(|| self.strict())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    pub file_names: Vec<PathBuf>,
    pub options: CompilerOptions,
    pub errors: Vec<Diagnostic>,
}

pub fn read_config(path: &Path, root: &Path) -> Result<ParsedConfig> {
    let source = Source::from_file(path)?;
    parse_config(&source, root)
}

/// Parses config text and discovers the input files below `root`.
pub fn parse_config(source: &Source, root: &Path) -> Result<ParsedConfig> {
    let text = strip_jsonc(source.contents());
    let mut config = ParsedConfig::default();

    let raw: Value = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(err) => {
            config.errors.push(json_error(source, &err));
            return Ok(config);
        }
    };
    let Value::Object(raw) = raw else {
        config.errors.push(Diagnostic::error(
            Some(source.span(1, 1)),
            5092,
            "The root value of a 'tsconfig.json' file must be an object.",
        ));
        return Ok(config);
    };

    let locate = |key: &str| key_span(source, &text, key);

    match raw.get("compilerOptions") {
        None => (),
        Some(Value::Object(options)) => {
            for (name, value) in options {
                match validate_option(name, value) {
                    Ok(()) => config.options.set(name, value.clone()),
                    Err((code, msg)) => config
                        .errors
                        .push(Diagnostic::error(locate(name), code, &msg)),
                }
            }
        }
        Some(_) => config.errors.push(Diagnostic::error(
            locate("compilerOptions"),
            5024,
            "Compiler option 'compilerOptions' requires a value of type object.",
        )),
    }

    let mut list = |key: &str| -> Option<Vec<String>> {
        let value = raw.get(key)?;
        let items: Option<Vec<String>> = value.as_array().and_then(|items| {
            items
                .iter()
                .map(|i| i.as_str().map(str::to_string))
                .collect()
        });
        if items.is_none() {
            let msg = format!("Compiler option '{key}' requires a value of type Array.");
            config.errors.push(Diagnostic::error(locate(key), 5024, &msg));
        }
        items
    };
    let files = list("files");
    let include = list("include");
    let exclude = list("exclude");

    let mut file_names = vec![];
    for file in files.iter().flatten() {
        let path = normalize_path(&root.join(file));
        if path.is_file() {
            file_names.push(path);
        } else {
            let msg = format!("File '{}' not found.", path.display());
            config
                .errors
                .push(Diagnostic::error(locate(file), 6053, &msg));
        }
    }

    let include = match (include, &files) {
        (Some(include), _) => include,
        (None, Some(_)) => vec![],
        (None, None) => vec!["**/*".to_string()],
    };
    let exclude = exclude.unwrap_or_else(|| vec!["node_modules".to_string()]);
    if !include.is_empty() {
        file_names.extend(discover_files(root, &include, &exclude)?);
    }

    let mut seen = std::collections::BTreeSet::new();
    file_names.retain(|p| seen.insert(p.clone()));

    if file_names.is_empty() && files.as_ref().map_or(true, |f| f.is_empty()) {
        let msg = format!(
            "No inputs were found in config file '{}'. Specified 'include' paths were '{}' and 'exclude' paths were '{}'.",
            source.file().display(),
            serde_json::to_string(&include)?,
            serde_json::to_string(&exclude)?
        );
        config.errors.push(Diagnostic::error(None, 18003, &msg));
    }

    debug!(
        "{}: {} input file(s), {} option(s), {} error(s)",
        source.file().display(),
        file_names.len(),
        config.options.0.len(),
        config.errors.len()
    );
    config.file_names = file_names;
    Ok(config)
}

fn validate_option(name: &str, value: &Value) -> Result<(), (u32, String)> {
    let Some(kind) = KNOWN_OPTIONS.get(name) else {
        return Err((5023, format!("Unknown compiler option '{name}'.")));
    };
    let valid = match kind {
        OptionKind::Boolean => value.is_boolean(),
        OptionKind::String => value.is_string(),
        OptionKind::Number => value.is_number(),
        OptionKind::Array => value.is_array(),
        OptionKind::Object => value.is_object(),
        OptionKind::List => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        OptionKind::Target => {
            let Some(target) = value.as_str() else {
                return Err((5024, format!("Compiler option '{name}' requires a value of type string.")));
            };
            if !TARGETS.contains(&target.to_ascii_lowercase().as_str()) {
                let allowed: Vec<String> = TARGETS.iter().map(|t| format!("'{t}'")).collect();
                return Err((
                    6046,
                    format!("Argument for '--{name}' option must be: {}.", allowed.join(", ")),
                ));
            }
            true
        }
    };
    if valid {
        return Ok(());
    }
    let expected = match kind {
        OptionKind::Boolean => "boolean",
        OptionKind::List => "list",
        OptionKind::Array => "Array",
        OptionKind::Object => "object",
        OptionKind::Number => "number",
        OptionKind::String | OptionKind::Target => "string",
    };
    Err((
        5024,
        format!("Compiler option '{name}' requires a value of type {expected}."),
    ))
}

fn glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
        // A pattern naming a directory also covers everything below it.
        for p in [pattern.to_string(), format!("{pattern}/**/*")] {
            let glob = GlobBuilder::new(&p)
                .literal_separator(true)
                .build()
                .map_err(|e| anyhow!("invalid pattern \"{pattern}\": {e}"))?;
            builder.add(glob);
        }
    }
    Ok(builder.build()?)
}

fn discover_files(root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let include = glob_set(include)?;
    let exclude = glob_set(exclude)?;
    let mut found = vec![];
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !relative.ends_with(".ts") || exclude.is_match(&relative) {
            continue;
        }
        if include.is_match(&relative) {
            found.push(normalize_path(entry.path()));
        }
    }
    Ok(found)
}

fn json_error(source: &Source, err: &serde_json::Error) -> Diagnostic {
    let line = err.line().max(1) as u32;
    let col = err.column().max(1) as u32;
    let span = Some(source.span(line, col));
    if err.is_eof() {
        return Diagnostic::error(span, 1005, "'}' expected.");
    }
    let msg = err.to_string();
    let msg = msg.rsplit_once(" at line ").map_or(msg.as_str(), |(m, _)| m);
    let mut chars = msg.chars();
    let msg = match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => "Unexpected token.".to_string(),
    };
    Diagnostic::error(span, 1012, &msg)
}

// Position of the first occurrence of `"key"` in the config text.
fn key_span(source: &Source, text: &str, key: &str) -> Option<Span> {
    let quoted = serde_json::to_string(key).ok()?;
    let start = text.find(&quoted)?;
    let before = &text[..start];
    let line = before.matches('\n').count() as u32 + 1;
    let col = (start - before.rfind('\n').map_or(0, |i| i + 1)) as u32 + 1;
    Some(Span {
        source: source.clone(),
        line,
        col,
        start: start as u32,
        end: (start + quoted.len()) as u32,
    })
}

/// Blanks out comments and trailing commas, keeping every byte offset (and
/// line break) in place.
pub fn strip_jsonc(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let mut last_comma: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'"', _) => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                last_comma = None;
            }
            (b'/', Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            (b'/', Some(b'*')) => {
                out[i] = b' ';
                out[i + 1] = b' ';
                i += 2;
                while i < bytes.len() {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        out[i] = b' ';
                        out[i + 1] = b' ';
                        i += 2;
                        break;
                    }
                    if bytes[i] != b'\n' && bytes[i] != b'\r' {
                        out[i] = b' ';
                    }
                    i += 1;
                }
            }
            (b',', _) => {
                last_comma = Some(i);
                i += 1;
            }
            (b'}' | b']', _) => {
                if let Some(comma) = last_comma.take() {
                    out[comma] = b' ';
                }
                i += 1;
            }
            (b, _) if b.is_ascii_whitespace() => i += 1,
            _ => {
                last_comma = None;
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
