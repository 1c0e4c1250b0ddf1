use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diagrammar::{
    parser, DiagrammarError, Interpreter, InterpreterConfig, Repl,
};

#[derive(Parser)]
#[command(author, version, about = "Diagrammar language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file and print its result
    Run {
        script: PathBuf,
        #[arg(long)]
        max_steps: Option<u64>,
    },
    /// Evaluate a snippet and print its result
    Eval {
        source: String,
        #[arg(long)]
        max_steps: Option<u64>,
    },
    /// List completion candidates at a byte offset of a script
    Complete { script: PathBuf, offset: usize },
    /// Parse a script and print the normalized program
    Parse { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("diagrammar=warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<(), DiagrammarError> {
    init_tracing();
    let args = Args::parse();
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { script, max_steps } => {
            let source = fs::read_to_string(&script)?;
            evaluate(&source, max_steps)
        }
        Command::Eval { source, max_steps } => evaluate(&source, max_steps),
        Command::Complete { script, offset } => {
            let source = fs::read_to_string(&script)?;
            let interpreter = Interpreter::new()?;
            match interpreter.autocomplete(&source, offset) {
                Some(items) => {
                    for item in items {
                        match item.documentation {
                            Some(docs) => println!("{}\t{}", item.label, docs),
                            None => println!("{}", item.label),
                        }
                    }
                }
                None => eprintln!("no completions at offset {offset}"),
            }
            Ok(())
        }
        Command::Parse { script } => {
            let source = fs::read_to_string(&script)?;
            let parsed = parser::parse(&source);
            match parsed.ast {
                Some(ast) => {
                    for expr in ast {
                        println!("{expr}");
                    }
                    Ok(())
                }
                None => Err(DiagrammarError::Diagnostics(parsed.errors().cloned().collect())),
            }
        }
        Command::Repl => Repl::new(Interpreter::new()?).run(),
    }
}

fn evaluate(source: &str, max_steps: Option<u64>) -> Result<(), DiagrammarError> {
    let mut config = InterpreterConfig::default();
    if let Some(max_steps) = max_steps {
        config = config.with_max_steps(max_steps);
    }
    let interpreter = Interpreter::new()?.with_config(config);
    let evaluation = interpreter.eval_source(source)?;
    println!("{}", evaluation.display());
    Ok(())
}
