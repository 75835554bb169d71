
use crate::ast::{self, Expression, Operator, Statement};
use crate::builtins;
use crate::environment::{self, Environment};
use crate::object::{EvalError, FunctionObject, Object, Result};
use crate::stack::ensure_sufficient_stack;
use std::convert::TryFrom;
use std::rc::Rc;

/// Default bound on nested user-function calls.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Evaluates `program` in `env` with the default call-depth limit.
pub fn eval(program: &ast::Program, env: &Environment) -> Result<Object> {
    Evaluator::default().eval_program(program, env)
}

// Anything that stops a subtree before it produces a value. Carrying `return`
// on the error side lets `?` forward it through every composite expression.
enum Unwind {
    Return(Object),
    Error(EvalError),
}

impl From<EvalError> for Unwind {
    fn from(err: EvalError) -> Self {
        Self::Error(err)
    }
}

type Flow = std::result::Result<Object, Unwind>;

/// Tree-walking evaluator. The only state it carries is the current depth of
/// user-function calls, which is checked against `max_depth` on every call.
#[derive(Debug, Clone)]
pub struct Evaluator {
    max_depth: usize,
    depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Evaluator {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            depth: 0,
        }
    }

    pub fn eval_program(&mut self, program: &ast::Program, env: &Environment) -> Result<Object> {
        tracing::debug!(
            statements = program.statements.len(),
            max_depth = self.max_depth,
            "evaluating program"
        );
        self.depth = 0;

        let mut result = Ok(Object::Null);
        for stmt in program.statements.iter() {
            match self.eval_statement(stmt, env) {
                Ok(value) => result = Ok(value),
                Err(Unwind::Return(value)) => {
                    result = Ok(value);
                    break;
                }
                Err(Unwind::Error(err)) => {
                    result = Err(err);
                    break;
                }
            }
        }

        environment::collect_garbage();
        result
    }

    fn eval_block(&mut self, block: &ast::BlockStatement, env: &Environment) -> Flow {
        let mut result = Object::Null;
        for stmt in block.statements.iter() {
            result = self.eval_statement(stmt, env)?;
        }
        Ok(result)
    }

    fn eval_statement(&mut self, stmt: &Statement, env: &Environment) -> Flow {
        ensure_sufficient_stack(|| match stmt {
            Statement::Let(stmt) => {
                let value = self.eval_expression(&stmt.value, env)?;
                env.define(&stmt.name.value, value);
                Ok(Object::Null)
            }
            Statement::Return(stmt) => {
                let value = match &stmt.return_value {
                    Some(expr) => self.eval_expression(expr, env)?,
                    None => Object::Null,
                };
                Err(Unwind::Return(value))
            }
            Statement::Expr(stmt) => self.eval_expression(&stmt.expression, env),
            Statement::Block(block) => self.eval_block(block, env),
        })
    }

    fn eval_expression(&mut self, expr: &Expression, env: &Environment) -> Flow {
        ensure_sufficient_stack(|| match expr {
            Expression::Identifier(id) => Ok(eval_identifier(id, env)?),
            Expression::IntegerLiteral(n) => Ok(Object::Integer(*n)),
            Expression::String(s) => Ok(Object::String(s.value.clone())),
            Expression::Boolean(b) => Ok(Object::Boolean(b.0)),
            Expression::Prefix(prefix) => {
                let right = self.eval_expression(&prefix.right, env)?;
                Ok(eval_prefix_expression(prefix.operator, right)?)
            }
            Expression::Infix(infix) => {
                let left = self.eval_expression(&infix.left, env)?;
                let right = self.eval_expression(&infix.right, env)?;
                Ok(eval_infix_expression(infix.operator, left, right)?)
            }
            Expression::If(if_expr) => {
                let condition = self.eval_expression(&if_expr.condition, env)?;
                if condition.truth_value() {
                    self.eval_block(&if_expr.consequence, env)
                } else if let Some(alternative) = &if_expr.alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(Object::Null)
                }
            }
            Expression::Function(func) => Ok(FunctionObject {
                parameters: func.parameters.clone(),
                body: Rc::clone(&func.body),
                env: env.scope(),
            }
            .into()),
            Expression::Call(call) => {
                let function = self.eval_expression(&call.function, env)?;
                if !matches!(function, Object::Function(_) | Object::Builtin(_)) {
                    return Err(EvalError::NotAFunction {
                        type_name: function.type_name(),
                    }
                    .into());
                }
                let args = self.eval_expressions(&call.arguments, env)?;
                Ok(self.apply_function(function, args, env)?)
            }
            Expression::Array(array) => Ok(self.eval_expressions(&array.elements, env)?.into()),
            Expression::Index(index_expr) => {
                let left = self.eval_expression(&index_expr.left, env)?;
                let index = self.eval_expression(&index_expr.index, env)?;
                Ok(eval_index_expression(left, index)?)
            }
            Expression::Assign(assign) => {
                let value = self.eval_expression(&assign.value, env)?;
                env.assign(&assign.name.value, value.clone())?;
                Ok(value)
            }
        })
    }

    fn eval_expressions(
        &mut self,
        exprs: &[Expression],
        env: &Environment,
    ) -> std::result::Result<Vec<Object>, Unwind> {
        exprs
            .iter()
            .map(|expr| self.eval_expression(expr, env))
            .collect()
    }

    fn apply_function(&mut self, function: Object, args: Vec<Object>, env: &Environment) -> Result<Object> {
        match function {
            Object::Function(func) => {
                if args.len() != func.parameters.len() {
                    return Err(EvalError::IncorrectArity {
                        got: args.len(),
                        want: func.parameters.len(),
                    });
                }
                if self.depth >= self.max_depth {
                    tracing::warn!(limit = self.max_depth, "call depth limit reached");
                    return Err(EvalError::CallDepthExceeded {
                        limit: self.max_depth,
                    });
                }

                let call_env = Environment::enclosed_by(&func.env);
                for (param, arg) in func.parameters.iter().zip(args) {
                    call_env.define(&param.value, arg);
                }

                tracing::trace!(
                    depth = self.depth,
                    params = func.parameters.len(),
                    "calling function"
                );
                self.depth += 1;
                let result = self.eval_block(&func.body, &call_env);
                self.depth -= 1;

                match result {
                    Ok(value) | Err(Unwind::Return(value)) => Ok(value),
                    Err(Unwind::Error(err)) => Err(err),
                }
            }
            Object::Builtin(builtin) => builtin.call(env.output(), args),
            obj => Err(EvalError::NotAFunction {
                type_name: obj.type_name(),
            }),
        }
    }
}

fn eval_identifier(id: &ast::Identifier, env: &Environment) -> Result<Object> {
    env.get(&id.value)
        .or_else(|| builtins::lookup(&id.value))
        .ok_or_else(|| EvalError::IdentifierNotFound {
            id: id.value.clone(),
        })
}

fn eval_prefix_expression(operator: Operator, right: Object) -> Result<Object> {
    match (operator, right) {
        (Operator::Bang, right) => Ok(Object::Boolean(!right.truth_value())),
        (Operator::Minus, Object::Integer(n)) => {
            n.checked_neg()
                .map(Object::Integer)
                .ok_or(EvalError::IntegerOverflow {
                    left: 0,
                    operator,
                    right: n,
                })
        }
        (operator, right) => Err(EvalError::UnknownPrefixOperator {
            operator,
            operand: right.type_name(),
        }),
    }
}

fn eval_infix_expression(operator: Operator, left: Object, right: Object) -> Result<Object> {
    match (&left, &right) {
        (Object::Integer(x), Object::Integer(y)) => eval_integer_infix_expression(operator, *x, *y),
        (Object::String(x), Object::String(y)) => eval_string_infix_expression(operator, x, y),
        _ => match operator {
            Operator::Eq | Operator::NotEq if left.type_name() == right.type_name() => {
                let same = identical(&left, &right);
                Ok(Object::Boolean(if operator == Operator::Eq {
                    same
                } else {
                    !same
                }))
            }
            _ => Err(EvalError::binary_op_error(
                left.type_name(),
                operator,
                right.type_name(),
            )),
        },
    }
}

// Equality for operands of the same type other than integers and strings.
// Arrays and functions compare by identity.
fn identical(left: &Object, right: &Object) -> bool {
    match (left, right) {
        (Object::Boolean(x), Object::Boolean(y)) => x == y,
        (Object::Null, Object::Null) => true,
        (Object::Array(x), Object::Array(y)) => Rc::ptr_eq(x, y),
        (Object::Function(x), Object::Function(y)) => Rc::ptr_eq(x, y),
        (Object::Builtin(x), Object::Builtin(y)) => x.name == y.name,
        _ => false,
    }
}

fn eval_integer_infix_expression(operator: Operator, left: i64, right: i64) -> Result<Object> {
    let value = match operator {
        Operator::Plus => left.checked_add(right),
        Operator::Minus => left.checked_sub(right),
        Operator::Asterisk => left.checked_mul(right),
        Operator::Slash => {
            if right == 0 {
                return Err(EvalError::DivisionByZero { left });
            }
            left.checked_div(right)
        }
        Operator::Caret => {
            if right < 0 {
                return Err(EvalError::NegativeExponent { exponent: right });
            }
            u32::try_from(right)
                .ok()
                .and_then(|exponent| left.checked_pow(exponent))
        }
        Operator::LT => return Ok(Object::Boolean(left < right)),
        Operator::GT => return Ok(Object::Boolean(left > right)),
        Operator::Eq => return Ok(Object::Boolean(left == right)),
        Operator::NotEq => return Ok(Object::Boolean(left != right)),
        Operator::Bang => {
            return Err(EvalError::binary_op_error("INTEGER", operator, "INTEGER"))
        }
    };

    value.map(Object::Integer).ok_or(EvalError::IntegerOverflow {
        left,
        operator,
        right,
    })
}

fn eval_string_infix_expression(operator: Operator, left: &str, right: &str) -> Result<Object> {
    match operator {
        Operator::Plus => Ok(Object::String(format!("{}{}", left, right))),
        Operator::Eq => Ok(Object::Boolean(left == right)),
        Operator::NotEq => Ok(Object::Boolean(left != right)),
        _ => Err(EvalError::binary_op_error("STRING", operator, "STRING")),
    }
}

// Out-of-range indexes, negative ones included, read as null.
fn eval_index_expression(left: Object, index: Object) -> Result<Object> {
    match (&left, &index) {
        (Object::Array(elements), Object::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or_default()),
        _ => Err(EvalError::NotIndexable {
            collection: left.type_name(),
            index: index.type_name(),
        }),
    }
}
