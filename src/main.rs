//! Command-line interface for the qbc compiler.

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use qbc::lexer::{lex, TokenKind};
use qbc::runtime::{Executor, StdHost};
use qbc::{compile, CompileOptions};

/// qbc - a QBasic compiler
#[derive(Parser, Debug)]
#[command(name = "qbc")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input BASIC source file (.bas)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the compiled module here (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write a source map next to the output (<output>.map)
    #[arg(long)]
    map: bool,

    /// Compile and run in-process instead of emitting the module
    #[arg(long)]
    run: bool,

    /// Only run the lexer and print tokens (for debugging)
    #[arg(long)]
    tokens: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error reading '{}': {}", args.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if args.verbose {
        eprintln!("compiling: {} ({} bytes)", args.input.display(), source.len());
    }

    if args.tokens {
        return print_tokens(&source);
    }

    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input.bas".into());

    if args.run {
        let program = match qbc::compile_to_program(&source, &file_name) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        let mut host = StdHost;
        if let Err(e) = Executor::new(&program).run(&mut host) {
            eprintln!("RuntimeError: {} at {}", e.message, e.loc);
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let out = match compile(
        &source,
        CompileOptions {
            source_file_name: Some(file_name),
        },
    ) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &out.code) {
                eprintln!("error writing '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            if args.map {
                let map_path = path.with_extension("json.map");
                if let Err(e) = fs::write(&map_path, &out.map) {
                    eprintln!("error writing '{}': {}", map_path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            println!("{}", out.code);
            if args.map {
                eprintln!("{}", out.map);
            }
        }
    }

    ExitCode::SUCCESS
}

fn print_tokens(source: &str) -> ExitCode {
    match lex(source) {
        Ok(tokens) => {
            for token in tokens {
                if token.kind == TokenKind::Newline {
                    continue;
                }
                println!(
                    "{:>4}:{:<4} {:16} {:?}",
                    token.loc.line,
                    token.loc.col,
                    format!("{:?}", token.kind),
                    token.text
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("LexError: {} at {}", e.message, e.loc);
            ExitCode::FAILURE
        }
    }
}
