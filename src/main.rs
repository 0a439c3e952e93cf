// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tsprobe::unstable::{format_diagnostics, format_diagnostics_with_context, Lexer, Source, TokenKind};
use tsprobe::{BuiltinEngine, Project, QueryError};

fn default_project() -> PathBuf {
    // The demo program lives in a sibling folder of the build output.
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_default();
    exe_dir.join("..").join("..").join("input")
}

fn project(cli: &Cli) -> Project {
    let root = cli.project.clone().unwrap_or_else(default_project);
    Project::new(root).with_target_file(&cli.file)
}

fn failure(err: &QueryError, project: &Project, pretty: bool) -> ExitCode {
    println!("{}", err.render(&project.root, pretty));
    ExitCode::FAILURE
}

fn ts_query(cli: &Cli) -> ExitCode {
    let project = project(cli);
    match tsprobe::run(&BuiltinEngine::new(), &project) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => failure(&err, &project, cli.pretty),
    }
}

fn ts_diagnose(cli: &Cli) -> ExitCode {
    let project = project(cli);
    match tsprobe::diagnose(&BuiltinEngine::new(), &project) {
        Ok(diagnostics) if diagnostics.is_empty() => ExitCode::SUCCESS,
        Ok(diagnostics) => {
            if cli.pretty {
                print!("{}", format_diagnostics_with_context(&diagnostics));
            } else {
                print!("{}", format_diagnostics(&diagnostics, &project.root));
            }
            ExitCode::FAILURE
        }
        Err(err) => failure(&err, &project, cli.pretty),
    }
}

fn ts_lex(file: String, verbose: bool) -> Result<()> {
    let source = Source::from_file(&file).with_context(|| format!("Failed to read {file}"))?;

    // Read tokens until EOF.
    let mut lexer = Lexer::new(&source);
    loop {
        let token = lexer.next_token()?;
        if token.0 == TokenKind::Eof {
            break;
        }

        if verbose {
            println!("{}", token.1.message("", ""));
        }
        println!("{token:?}");
    }
    Ok(())
}

fn ts_parse(file: String) -> Result<()> {
    let source = Source::from_file(&file).with_context(|| format!("Failed to read {file}"))?;
    let mut parser = tsprobe::unstable::Parser::new(&source)?;
    let ast = parser.parse()?;
    println!("{ast:#?}");
    Ok(())
}

#[derive(Subcommand)]
enum ProbeCommand {
    /// Print the types of the two call targets (default).
    Query,

    /// Print pre-emit diagnostics for every input file.
    Diagnose,

    /// Tokenize a TypeScript file.
    Lex {
        /// TypeScript file.
        file: String,

        /// Verbose output.
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse a TypeScript file.
    Parse {
        /// TypeScript file.
        file: String,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory containing tsconfig.json.
    #[arg(long, short, value_name = "dir")]
    project: Option<PathBuf>,

    /// File holding the queried declaration, relative to the project.
    #[arg(long, short, default_value = "main.ts")]
    file: String,

    /// Show diagnostics with source context.
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Option<ProbeCommand>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    // Parse and dispatch command.
    let cli = Cli::parse();
    let result = match &cli.command {
        None | Some(ProbeCommand::Query) => return ts_query(&cli),
        Some(ProbeCommand::Diagnose) => return ts_diagnose(&cli),
        Some(ProbeCommand::Lex { file, verbose }) => ts_lex(file.clone(), *verbose),
        Some(ProbeCommand::Parse { file }) => ts_parse(file.clone()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("Error - {err}");
            ExitCode::FAILURE
        }
    }
}
