use std::cell::RefCell;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

use minilisp::{Environment, Keyword, Sexpr, TokenKind, evaluate, parse, tokenize};

struct SymbolCompleter {
    env: Rc<RefCell<Environment>>,
}

impl SymbolCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        SymbolCompleter { env }
    }
}

impl rustyline::completion::Completer for SymbolCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // complete the symbol under the cursor against bound names and
        // reserved words
        let candidates = match tokenize(&line[..pos]) {
            Ok(tokens) => match tokens.last().map(|t| t.kind.clone()) {
                Some(TokenKind::Symbol(prefix)) => {
                    let mut names = self.env.borrow().identifiers();
                    names.extend(Keyword::ALL.iter().map(|k| k.as_str().to_string()));
                    let mut completions: Vec<String> = names
                        .into_iter()
                        .filter(|name| name.starts_with(&prefix))
                        .map(|name| name[prefix.len()..].to_string())
                        .collect();
                    completions.sort();
                    completions
                }
                _ => vec![],
            },
            Err(_) => vec![],
        };
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct ReplHelper {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Completer)]
    completer: SymbolCompleter,
}

struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth: i32 = 0;
        for (i, c) in ctx.input().chars().enumerate() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched ')' at position {}",
                            i
                        ))));
                    }
                }
                _ => {}
            }
        }
        if depth > 0 {
            // unclosed list, keep reading
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

fn main() -> rustyline::Result<()> {
    println!("minilisp REPL v0.1.0");
    println!("Type 'exit' or press Ctrl-D to quit.");

    let env = Rc::new(RefCell::new(Environment::new()));
    let helper = ReplHelper {
        validator: ParenValidator,
        completer: SymbolCompleter::new(env.clone()),
    };
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history("minilisp_history.txt").is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("minilisp> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match parse(input) {
                    Ok(node) => {
                        let mut env = env.borrow_mut();
                        match evaluate(&node, &mut env) {
                            // a define yields the Nil marker, not a value
                            Ok(result) if result.kind == Sexpr::Nil => println!("=> nil"),
                            Ok(result) => println!("=> {}", result),
                            Err(e) => e.report(input),
                        }
                    }
                    Err(e) => e.report(input),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history("minilisp_history.txt")
}
