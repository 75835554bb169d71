use crate::config::Config;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use std::io::{self, BufRead, Write};

static PROMPT: &str = ">> ";

/// Reads lines from stdin until end of input, evaluating each against one
/// root environment.
pub fn start(config: &Config) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let env = Environment::new();
    let mut evaluator = Evaluator::new(config.max_depth);

    run(stdin.lock(), &mut stdout.lock(), &mut evaluator, &env)
}

fn run<R: BufRead, W: Write>(
    mut input: R,
    out: &mut W,
    evaluator: &mut Evaluator,
    env: &Environment,
) -> io::Result<()> {
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }

        run_source(&line, evaluator, env, out)?;
    }
}

/// Parses and evaluates `source`, writing diagnostics, the result, or the
/// runtime error to `out`. Returns whether the source ran without error.
pub fn run_source<W: Write>(
    source: &str,
    evaluator: &mut Evaluator,
    env: &Environment,
    out: &mut W,
) -> io::Result<bool> {
    match Parser::new(Lexer::new(source.to_owned())).parse_program() {
        Err(errors) => {
            for err in errors.iter() {
                writeln!(out, "\t{}", err)?;
            }
            Ok(false)
        }
        Ok(program) => match evaluator.eval_program(&program, env) {
            Ok(val) => {
                writeln!(out, "{}", val)?;
                Ok(true)
            }
            Err(err) => {
                writeln!(out, "ERROR: {}", err)?;
                Ok(false)
            }
        },
    }
}
