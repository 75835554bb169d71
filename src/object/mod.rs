use crate::ast;
use crate::builtins::BuiltinFunction;
use crate::environment::Scope;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

mod eval_error;
pub use eval_error::EvalError;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Function(Rc<FunctionObject>),
    Builtin(&'static BuiltinFunction),
    Integer(i64),
    Boolean(bool),
    String(String),
    Array(Rc<Vec<Object>>),
    Null,
}

impl Display for Object {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Function(func) => write!(f, "{}", func),
            Self::Builtin(_) => write!(f, "builtin function"),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::String(s) => write!(f, "{}", s),
            Self::Array(a) => {
                let element_names: Vec<String> = a.iter().map(Object::to_string).collect();

                write!(f, "[{}]", element_names.join(", "))
            }
            Self::Null => write!(f, "null"),
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::Null
    }
}

impl From<i64> for Object {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        s.to_owned().into()
    }
}

impl From<Vec<Object>> for Object {
    fn from(a: Vec<Object>) -> Self {
        Self::Array(Rc::new(a))
    }
}

impl From<FunctionObject> for Object {
    fn from(f: FunctionObject) -> Self {
        Self::Function(Rc::new(f))
    }
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Function(_) => "FUNCTION",
            Self::Builtin(_) => "BUILTIN",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "INTEGER",
            Self::String(_) => "STRING",
            Self::Array(_) => "ARRAY",
            Self::Null => "NULL",
        }
    }

    pub fn truth_value(&self) -> bool {
        !matches!(self, Self::Boolean(false) | Self::Null)
    }
}

/// A user-defined function together with the scope it was created in.
pub struct FunctionObject {
    pub parameters: Vec<ast::Identifier>,
    pub body: Rc<ast::BlockStatement>,
    pub env: Rc<Scope>,
}

impl Display for FunctionObject {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let identifier_names: Vec<String> = self
            .parameters
            .iter()
            .map(ast::Identifier::to_string)
            .collect();

        write!(f, "fn({}) {}", identifier_names.join(", "), self.body)
    }
}

// The captured environment usually holds this function, so neither trait
// may look inside it.
impl Debug for FunctionObject {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("FunctionObject")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish()
    }
}

impl PartialEq for FunctionObject {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}
