pub mod ast;
mod builtins;
pub mod config;
mod environment;
pub mod evaluator;
mod lexer;
mod object;
mod parser;
pub mod repl;
mod stack;
mod token;

pub use config::{Config, ConfigError};
pub use environment::{Environment, Output};
pub use evaluator::Evaluator;
pub use lexer::Lexer;
pub use object::{EvalError, Object};
pub use parser::Parser;

/// Parses `source` into a program and the diagnostics collected on the way.
/// The program holds every statement that parsed, even when there are
/// diagnostics.
pub fn parse(source: &str) -> (ast::Program, Vec<String>) {
    Parser::new(Lexer::new(source.to_owned())).parse()
}

/// A fresh global scope that prints to stdout.
pub fn new_root_environment() -> Environment {
    Environment::new()
}

pub fn evaluate(program: &ast::Program, env: &Environment) -> Result<Object, EvalError> {
    evaluator::eval(program, env)
}
