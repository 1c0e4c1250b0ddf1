use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{DiagrammarError, Result},
    runtime::Interpreter,
};

/// Interactive session. Every run starts from a fresh context, so accepted
/// lines are kept and replayed in front of each new line.
pub struct Repl {
    interpreter: Interpreter,
    accepted: Vec<String>,
}

impl Repl {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            accepted: Vec::new(),
        }
    }

    fn program_with(&self, line: &str) -> String {
        let mut program = self.accepted.join("\n");
        if !program.is_empty() {
            program.push('\n');
        }
        program.push_str(line);
        program
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(std::io::Error::other)?;
        loop {
            match editor.readline(">> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    match trimmed {
                        ":quit" | ":exit" => break,
                        ":reset" => {
                            self.accepted.clear();
                            continue;
                        }
                        "" => continue,
                        _ => {}
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.interpreter.eval_source(&self.program_with(trimmed)) {
                        Ok(evaluation) => {
                            println!("{}", evaluation.display());
                            self.accepted.push(trimmed.to_string());
                        }
                        Err(err @ DiagrammarError::Diagnostics(_)) => {
                            for diagnostic in err.diagnostics() {
                                eprintln!("{:?}: {}", diagnostic.kind, diagnostic.message);
                            }
                        }
                        Err(other) => eprintln!("error: {other}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(DiagrammarError::from(std::io::Error::other(err))),
            }
        }
        Ok(())
    }
}
