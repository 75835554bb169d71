use banana_script::{repl, Config, Environment, Evaluator};
use std::env;
use std::fs;
use std::io;
use std::process;

fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(2);
        }
    };
    init_tracing(&config);

    let result = match env::args().nth(1) {
        Some(path) => run_file(&path, &config),
        None => {
            println!("Hello! This is the banana-script programming language!");
            println!("Feel free to type in commands");
            repl::start(&config).map(|_| true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    // The filter was already validated by `Config::from_env`.
    if let Ok(filter) = config.env_filter() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn run_file(path: &str, config: &Config) -> io::Result<bool> {
    let source = fs::read_to_string(path)?;
    tracing::debug!(path, bytes = source.len(), "running file");

    let env = Environment::new();
    let mut evaluator = Evaluator::new(config.max_depth);
    let stdout = io::stdout();

    repl::run_source(&source, &mut evaluator, &env, &mut stdout.lock())
}
