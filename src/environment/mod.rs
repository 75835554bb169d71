use crate::object::{EvalError, Object, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::io::{self, Write};
use std::rc::Rc;

mod collect;

pub use collect::collect_garbage;

/// Where `print` sends its lines.
#[derive(Debug, Clone)]
pub enum Output {
    Stdout,
    Buffer(Rc<RefCell<String>>),
}

impl Default for Output {
    fn default() -> Self {
        Self::Stdout
    }
}

impl Output {
    pub fn capture() -> Self {
        Self::Buffer(Default::default())
    }

    pub fn emit(&self, line: &str) {
        match self {
            Self::Stdout => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                if let Err(err) = writeln!(handle, "{}", line) {
                    tracing::warn!(%err, "failed to write program output");
                }
            }
            Self::Buffer(buffer) => {
                let mut buffer = buffer.borrow_mut();
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
    }

    /// Everything emitted so far; always empty for stdout.
    pub fn contents(&self) -> String {
        match self {
            Self::Stdout => String::new(),
            Self::Buffer(buffer) => buffer.borrow().clone(),
        }
    }
}

/// One level of the lexical chain: the bindings made in a program, a call or
/// a block-free function body, plus a link to the enclosing scope.
pub struct Scope {
    store: RefCell<HashMap<String, Object>>,
    outer: Option<Rc<Scope>>,
    output: Output,
}

impl Scope {
    fn enclosed_by(outer: &Rc<Scope>) -> Self {
        Self {
            store: Default::default(),
            outer: Some(Rc::clone(outer)),
            output: outer.output.clone(),
        }
    }

    fn get(&self, name: &str) -> Option<Object> {
        let mut scope = self;
        loop {
            if let Some(value) = scope.store.borrow().get(name) {
                return Some(value.clone());
            }
            scope = scope.outer.as_deref()?;
        }
    }
}

// Bindings routinely contain closures over this very scope, so only the names
// are shown.
impl Debug for Scope {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let store = self.store.borrow();
        let mut names: Vec<&String> = store.keys().collect();
        names.sort();
        f.debug_struct("Scope")
            .field("names", &names)
            .field("outer", &self.outer)
            .finish()
    }
}

/// A handle held by running code on one scope. Closures capture the bare
/// `Rc<Scope>` instead; dropping a handle is what prompts a check for scopes
/// kept alive only by closures stored in themselves.
#[derive(Clone)]
pub struct Environment(Rc<Scope>);

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::with_output(Output::default())
    }

    pub fn with_output(output: Output) -> Self {
        Self(Rc::new(Scope {
            store: Default::default(),
            outer: None,
            output,
        }))
    }

    pub fn new_enclosed(outer: &Environment) -> Self {
        Self::enclosed_by(&outer.0)
    }

    pub(crate) fn enclosed_by(outer: &Rc<Scope>) -> Self {
        Self(Rc::new(Scope::enclosed_by(outer)))
    }

    /// The shared scope, as captured by a function literal.
    pub(crate) fn scope(&self) -> Rc<Scope> {
        Rc::clone(&self.0)
    }

    pub fn output(&self) -> &Output {
        &self.0.output
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        self.0.get(name)
    }

    pub fn define(&self, name: &str, val: Object) {
        // The old value is dropped after the store is released.
        let _previous = self.0.store.borrow_mut().insert(name.to_owned(), val);
    }

    /// Rebinds `name` in the innermost scope that already has it.
    pub fn assign(&self, name: &str, val: Object) -> Result<()> {
        let mut scope: &Scope = &self.0;
        loop {
            let mut store = scope.store.borrow_mut();
            if let Some(slot) = store.get_mut(name) {
                let previous = std::mem::replace(slot, val);
                drop(store);
                drop(previous);
                return Ok(());
            }
            drop(store);
            scope = match scope.outer.as_deref() {
                Some(outer) => outer,
                None => {
                    return Err(EvalError::IdentifierNotFound {
                        id: name.to_owned(),
                    })
                }
            };
        }
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if Rc::strong_count(&self.0) > 1 {
            collect::collect_on_release(&self.0);
        }
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("Environment").field(&self.0).finish()
    }
}
