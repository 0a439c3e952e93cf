// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tsprobe::unstable::*;

fn project(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("projects")
        .join(name)
}

fn relative(config: &ParsedConfig, root: &Path) -> Vec<String> {
    config
        .file_names
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

fn parse(root: &Path, json: &str) -> Result<ParsedConfig> {
    let source = Source::from_contents(root.join("tsconfig.json"), json.to_string())?;
    parse_config(&source, root)
}

#[test]
fn default_discovery() -> Result<()> {
    let root = project("discovery");
    let config = read_config(&root.join("tsconfig.json"), &root)?;
    assert!(config.errors.is_empty(), "{:?}", config.errors);
    assert_eq!(
        relative(&config, &root),
        vec!["main.ts", "src/lib.ts", "src/skip/hidden.ts"]
    );
    assert!(config.options.strict());
    assert!(config.options.no_implicit_any());
    Ok(())
}

#[test]
fn include_and_exclude() -> Result<()> {
    let root = project("discovery");
    let config = parse(&root, r#"{ "include": ["src"], "exclude": ["src/skip"] }"#)?;
    assert!(config.errors.is_empty(), "{:?}", config.errors);
    assert_eq!(relative(&config, &root), vec!["src/lib.ts"]);

    let config = parse(&root, r#"{ "include": ["**/*"], "exclude": [] }"#)?;
    assert!(relative(&config, &root).contains(&"node_modules/dep/index.ts".to_string()));
    Ok(())
}

#[test]
fn files_list() -> Result<()> {
    let root = project("discovery");
    let config = parse(&root, r#"{ "files": ["src/lib.ts"] }"#)?;
    assert!(config.errors.is_empty(), "{:?}", config.errors);
    assert_eq!(relative(&config, &root), vec!["src/lib.ts"]);

    let config = parse(&root, r#"{ "files": ["main.ts", "gone.ts"] }"#)?;
    assert_eq!(relative(&config, &root), vec!["main.ts"]);
    let codes: Vec<u32> = config.errors.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![6053]);
    Ok(())
}

#[test]
fn no_inputs() -> Result<()> {
    let root = project("discovery");
    let config = parse(&root, r#"{ "include": ["nothing"] }"#)?;
    assert!(config.file_names.is_empty());
    let codes: Vec<u32> = config.errors.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![18003]);
    assert!(config.errors[0]
        .message
        .contains("Specified 'include' paths were '[\"nothing\"]'"));
    Ok(())
}

#[test]
fn diagnostics_are_positioned() -> Result<()> {
    let root = project("bad-config");
    let config = read_config(&root.join("tsconfig.json"), &root)?;
    assert_eq!(config.errors.len(), 1);
    assert_eq!(
        config.errors[0].to_compact_string(&root),
        "tsconfig.json(4,5): error TS5023: Unknown compiler option 'bogus'."
    );
    // Valid options are still recorded.
    assert_eq!(config.options.flag("strict"), Some(true));
    Ok(())
}

#[test]
fn explicit_flags_win_over_strict() -> Result<()> {
    let root = project("discovery");
    let config = parse(
        &root,
        r#"{ "compilerOptions": { "strict": true, "noImplicitAny": false } }"#,
    )?;
    assert!(config.options.strict_null_checks());
    assert!(!config.options.no_implicit_any());
    Ok(())
}

#[test]
fn generated_config_is_accepted() -> Result<()> {
    let root = project("discovery");
    let config = parse(
        &root,
        r#"{
  "compilerOptions": {
    /* Language and Environment */
    "target": "es2016",
    "lib": ["es2020", "dom"],
    // "jsx": "preserve",
    "experimentalDecorators": true,
    "emitDecoratorMetadata": true,

    /* Modules */
    "module": "commonjs",
    "moduleResolution": "node10",
    "moduleDetection": "force",
    "baseUrl": "./",
    "paths": { "@/*": ["./*"] },
    "rootDirs": ["src", "generated"],
    "resolveJsonModule": true,

    /* Emit */
    "outDir": "./dist",
    "newLine": "lf",
    "verbatimModuleSyntax": false,
    "plugins": [{ "name": "some-plugin" }],

    /* Type Checking */
    "strict": true,
    "exactOptionalPropertyTypes": true,
    "noFallthroughCasesInSwitch": true,
    "noUncheckedIndexedAccess": true,
    "noImplicitOverride": true,
    "maxNodeModuleJsSize": 0,

    "esModuleInterop": true,
    "forceConsistentCasingInFileNames": true,
    "skipLibCheck": true,
  }
}"#,
    )?;
    assert!(config.errors.is_empty(), "{:?}", config.errors);
    assert!(config.options.strict());
    assert!(config.options.get("paths").is_some_and(|p| p.is_object()));
    Ok(())
}

#[test]
fn option_values_are_type_checked() -> Result<()> {
    let root = project("discovery");
    let config = parse(
        &root,
        r#"{ "compilerOptions": { "paths": ["./*"], "maxNodeModuleJsSize": "big" } }"#,
    )?;
    let messages: Vec<&str> = config.errors.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Compiler option 'maxNodeModuleJsSize' requires a value of type number.",
            "Compiler option 'paths' requires a value of type object.",
        ]
    );
    Ok(())
}
