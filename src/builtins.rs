use crate::environment::Output;
use crate::object::*;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// How many arguments a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Variadic,
}

pub type NativeFn = fn(&Output, Vec<Object>) -> Result<Object>;

pub struct BuiltinFunction {
    pub name: &'static str,
    pub arity: Arity,
    func: NativeFn,
}

impl BuiltinFunction {
    pub fn call(&self, output: &Output, args: Vec<Object>) -> Result<Object> {
        if let Arity::Exactly(want) = self.arity {
            if args.len() != want {
                return Err(EvalError::IncorrectArity {
                    got: args.len(),
                    want,
                });
            }
        }
        tracing::trace!(builtin = self.name, args = args.len(), "calling builtin");
        (self.func)(output, args)
    }
}

impl Debug for BuiltinFunction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "BuiltinFunction({})", self.name)
    }
}

impl PartialEq for BuiltinFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

// Arity has already been checked by `BuiltinFunction::call`.
fn single(args: Vec<Object>) -> Object {
    args.into_iter().next().unwrap_or_default()
}

fn len(_: &Output, args: Vec<Object>) -> Result<Object> {
    match single(args) {
        Object::String(s) => Ok(Object::Integer(s.chars().count() as i64)),
        Object::Array(a) => Ok(Object::Integer(a.len() as i64)),
        obj => Err(EvalError::UnsupportedArgType {
            fn_name: "len",
            type_name: obj.type_name(),
        }),
    }
}

fn array_arg(fn_name: &'static str, obj: Object) -> Result<Rc<Vec<Object>>> {
    match obj {
        Object::Array(a) => Ok(a),
        obj => Err(EvalError::UnsupportedArgType {
            fn_name,
            type_name: obj.type_name(),
        }),
    }
}

fn first(_: &Output, args: Vec<Object>) -> Result<Object> {
    let array = array_arg("first", single(args))?;
    Ok(array.first().cloned().unwrap_or_default())
}

fn last(_: &Output, args: Vec<Object>) -> Result<Object> {
    let array = array_arg("last", single(args))?;
    Ok(array.last().cloned().unwrap_or_default())
}

fn rest(_: &Output, args: Vec<Object>) -> Result<Object> {
    let array = array_arg("rest", single(args))?;
    if array.is_empty() {
        return Ok(Object::Null);
    }
    Ok(array[1..].to_vec().into())
}

fn push(_: &Output, args: Vec<Object>) -> Result<Object> {
    let mut args = args.into_iter();
    let array = array_arg("push", args.next().unwrap_or_default())?;
    let value = args.next().unwrap_or_default();

    let mut elements = Vec::with_capacity(array.len() + 1);
    elements.extend(array.iter().cloned());
    elements.push(value);
    Ok(elements.into())
}

fn print(output: &Output, args: Vec<Object>) -> Result<Object> {
    let rendered: Vec<String> = args.iter().map(Object::to_string).collect();
    output.emit(&rendered.join(" "));
    Ok(Object::Null)
}

lazy_static! {
    pub static ref BUILTINS: HashMap<&'static str, BuiltinFunction> = vec![
        ("len", Arity::Exactly(1), len as NativeFn),
        ("first", Arity::Exactly(1), first as NativeFn),
        ("last", Arity::Exactly(1), last as NativeFn),
        ("rest", Arity::Exactly(1), rest as NativeFn),
        ("push", Arity::Exactly(2), push as NativeFn),
        ("print", Arity::Variadic, print as NativeFn),
    ]
    .into_iter()
    .map(|(name, arity, func)| (name, BuiltinFunction { name, arity, func }))
    .collect();
}

pub fn lookup(name: &str) -> Option<Object> {
    BUILTINS.get(name).map(Object::Builtin)
}
