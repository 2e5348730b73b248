/// Tree-walking interpreter for verified Axiom programs.
///
/// Evaluation is strict left-to-right with two exceptions: `&&`/`||`
/// short-circuit their right operand, and `if` runs only the chosen branch.
/// The environment is a scope stack seeded from the context; each
/// execution gets a fresh one, so a compiled program can be shared across
/// any number of runs.
use std::collections::HashMap;

use crate::ast::{BinOp, Expr, Literal, Stmt, UnaryOp};
use crate::error::RuntimeError;
use crate::value::{parse_timestamp, Env, Value};

pub struct Interpreter {
    env: Env,
    /// Value of the most recently executed expression statement — the
    /// rule's implicit return.
    last: Value,
}

impl Interpreter {
    pub fn new(globals: HashMap<String, Value>) -> Self {
        Interpreter {
            env: vec![globals],
            last: Value::Null,
        }
    }

    /// Execute a program and return its implicit-return value, or `Null`
    /// when no expression statement ran.
    pub fn run(&mut self, program: &[Stmt]) -> Result<Value, RuntimeError> {
        for stmt in program {
            self.exec_stmt(stmt)?;
        }
        Ok(std::mem::replace(&mut self.last, Value::Null))
    }

    // -------------------------------------------------------------------------
    // Environment management
    // -------------------------------------------------------------------------

    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        for scope in self.env.iter().rev() {
            if let Some(v) = scope.get(name) {
                return Ok(v.clone());
            }
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    pub fn define(&mut self, name: &str, val: Value) {
        if let Some(scope) = self.env.last_mut() {
            scope.insert(name.to_string(), val);
        }
    }

    fn undefine(&mut self, name: &str) {
        if let Some(scope) = self.env.last_mut() {
            scope.remove(name);
        }
    }

    /// Walk the scope stack from innermost outward and update the first
    /// binding found.
    fn assign(&mut self, name: &str, val: Value) -> Result<(), RuntimeError> {
        for scope in self.env.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), val);
                return Ok(());
            }
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let val = self.eval_expr(init)?;
                self.define(name, val);
                Ok(())
            }
            Stmt::Assign { name, value } => {
                let val = self.eval_expr(value)?;
                self.assign(name, val)
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => match self.eval_expr(cond)? {
                Value::Bool(true) => self.exec_stmt(then),
                Value::Bool(false) => match otherwise {
                    Some(else_branch) => self.exec_stmt(else_branch),
                    None => Ok(()),
                },
                other => Err(RuntimeError::Error(format!(
                    "If condition must be bool, got {}",
                    other.type_name()
                ))),
            },
            Stmt::Block(stmts) => {
                self.env.push(HashMap::new());
                let result = stmts.iter().try_for_each(|s| self.exec_stmt(s));
                self.env.pop();
                result
            }
            Stmt::Expr(expr) => {
                self.last = self.eval_expr(expr)?;
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Int(n) => Value::Int(*n),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
            }),

            Expr::Variable(name) => self.lookup(name),

            Expr::Unary(op, operand) => {
                let val = self.eval_expr(operand)?;
                match (*op, val) {
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
                    (UnaryOp::Not, other) => Err(RuntimeError::Error(format!(
                        "Operator '!' requires bool, got {}",
                        other.type_name()
                    ))),
                    (UnaryOp::Neg, other) => Err(RuntimeError::Error(format!(
                        "Operator '-' requires int, got {}",
                        other.type_name()
                    ))),
                }
            }

            Expr::Binary(op, left, right) => match op {
                BinOp::And => match self.eval_expr(left)? {
                    Value::Bool(false) => Ok(Value::Bool(false)),
                    Value::Bool(true) => self.expect_bool(right, "&&"),
                    other => Err(bool_operand_error("&&", &other)),
                },
                BinOp::Or => match self.eval_expr(left)? {
                    Value::Bool(true) => Ok(Value::Bool(true)),
                    Value::Bool(false) => self.expect_bool(right, "||"),
                    other => Err(bool_operand_error("||", &other)),
                },
                _ => {
                    let l = self.eval_expr(left)?;
                    let r = self.eval_expr(right)?;
                    eval_binop(*op, l, r)
                }
            },

            Expr::Member(obj, prop) => {
                let val = self.eval_expr(obj)?;
                match &val {
                    Value::Object(_) => val
                        .property(prop)
                        .cloned()
                        .ok_or_else(|| RuntimeError::MissingProperty(prop.clone())),
                    other => Err(RuntimeError::Error(format!(
                        "Cannot access property '{}' on {}",
                        prop,
                        other.type_name()
                    ))),
                }
            }

            Expr::List(elements) => elements
                .iter()
                .map(|e| self.eval_expr(e))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),

            Expr::Object(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for (key, value) in fields {
                    out.push((key.clone(), self.eval_expr(value)?));
                }
                Ok(Value::Object(out))
            }

            Expr::Call { callee, args } => self.eval_call(callee, args),

            Expr::Lambda { .. } => Err(RuntimeError::Error(
                "Lambda expressions are only valid as macro arguments".to_string(),
            )),
        }
    }

    fn expect_bool(&mut self, expr: &Expr, op: &str) -> Result<Value, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Bool(b) => Ok(Value::Bool(b)),
            other => Err(bool_operand_error(op, &other)),
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, RuntimeError> {
        if let Expr::Variable(name) = callee {
            if name == "has" {
                return self.eval_has(args);
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval_expr(arg)?);
            }
            return call_builtin(name, &values);
        }
        if let Expr::Member(obj, macro_name) = callee {
            if macro_name == "exists" || macro_name == "all" {
                return self.eval_macro(obj, macro_name, args);
            }
            return Err(RuntimeError::Error(format!(
                "Unknown macro '{}'",
                macro_name
            )));
        }
        Err(RuntimeError::Error(
            "Only named functions can be called".to_string(),
        ))
    }

    /// `has(..)` converts exactly the two presence errors to `false`;
    /// everything else propagates.
    fn eval_has(&mut self, args: &[Expr]) -> Result<Value, RuntimeError> {
        let [arg] = args else {
            return Err(RuntimeError::Error(format!(
                "has() takes 1 argument, got {}",
                args.len()
            )));
        };
        match self.eval_expr(arg) {
            Ok(_) => Ok(Value::Bool(true)),
            Err(RuntimeError::UndefinedVariable(_)) | Err(RuntimeError::MissingProperty(_)) => {
                Ok(Value::Bool(false))
            }
            Err(other) => Err(other),
        }
    }

    fn eval_macro(
        &mut self,
        obj: &Expr,
        macro_name: &str,
        args: &[Expr],
    ) -> Result<Value, RuntimeError> {
        let list = self.eval_expr(obj)?;
        let Value::List(items) = list else {
            return Err(RuntimeError::Error(format!(
                "Macro '{}' requires a list, got {}",
                macro_name,
                list.type_name()
            )));
        };
        let [Expr::Lambda { param, body }] = args else {
            return Err(RuntimeError::Error(format!(
                "Macro '{}' expects a single lambda argument",
                macro_name
            )));
        };

        // The parameter binding lives only for the iteration: any prior
        // binding of the same name is saved up front and restored on every
        // exit path, including errors.
        let saved = self
            .env
            .last_mut()
            .and_then(|scope| scope.remove(param.as_str()));

        let mut result = Ok(Value::Bool(macro_name == "all"));
        for item in items {
            self.define(param, item);
            match self.eval_expr(body) {
                Ok(Value::Bool(true)) if macro_name == "exists" => {
                    result = Ok(Value::Bool(true));
                    break;
                }
                Ok(Value::Bool(false)) if macro_name == "all" => {
                    result = Ok(Value::Bool(false));
                    break;
                }
                Ok(Value::Bool(_)) => {}
                Ok(other) => {
                    result = Err(RuntimeError::Error(format!(
                        "Macro '{}' body must produce a bool, got {}",
                        macro_name,
                        other.type_name()
                    )));
                    break;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.undefine(param);
        if let Some(old) = saved {
            self.define(param, old);
        }
        result
    }
}

fn bool_operand_error(op: &str, val: &Value) -> RuntimeError {
    RuntimeError::Error(format!(
        "Operator '{}' requires bool operands, got {}",
        op,
        val.type_name()
    ))
}

fn eval_binop(op: BinOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (op, left, right) {
        // Int arithmetic is two's-complement and wraps on overflow.
        (BinOp::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinOp::Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(b))),
        (BinOp::Mul, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(b))),
        (BinOp::Div, Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (BinOp::Div, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(b))),

        // Deep structural equality on the value union.
        (BinOp::Eq, a, b) => Ok(Value::Bool(a == b)),
        (BinOp::Neq, a, b) => Ok(Value::Bool(a != b)),

        (BinOp::Gt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
        (BinOp::Gte, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
        (BinOp::Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        (BinOp::Lte, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a <= b)),
        (BinOp::Gt, Value::Date(a), Value::Date(b)) => Ok(Value::Bool(a > b)),
        (BinOp::Gte, Value::Date(a), Value::Date(b)) => Ok(Value::Bool(a >= b)),
        (BinOp::Lt, Value::Date(a), Value::Date(b)) => Ok(Value::Bool(a < b)),
        (BinOp::Lte, Value::Date(a), Value::Date(b)) => Ok(Value::Bool(a <= b)),

        (BinOp::In, item, Value::List(items)) => Ok(Value::Bool(items.contains(&item))),
        (BinOp::In, _, other) => Err(RuntimeError::Error(format!(
            "Operator 'in' requires a list on the right side, got {}",
            other.type_name()
        ))),

        (op, left, right) => Err(RuntimeError::Error(format!(
            "Operator '{}' cannot be applied to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    match name {
        "startsWith" => {
            let (s, t) = two_string_args(name, args)?;
            Ok(Value::Bool(s.starts_with(t)))
        }
        "endsWith" => {
            let (s, t) = two_string_args(name, args)?;
            Ok(Value::Bool(s.ends_with(t)))
        }
        "contains" => {
            let (s, t) = two_string_args(name, args)?;
            Ok(Value::Bool(s.contains(t)))
        }
        "length" => match args {
            [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
            [other] => Err(RuntimeError::Error(format!(
                "length() requires a string, got {}",
                other.type_name()
            ))),
            _ => Err(RuntimeError::Error(format!(
                "length() takes 1 argument, got {}",
                args.len()
            ))),
        },
        "timestamp" => match args {
            [Value::Str(s)] => parse_timestamp(s).map(Value::Date),
            [other] => Err(RuntimeError::Error(format!(
                "timestamp() requires a string, got {}",
                other.type_name()
            ))),
            _ => Err(RuntimeError::Error(format!(
                "timestamp() takes 1 argument, got {}",
                args.len()
            ))),
        },
        other => Err(RuntimeError::Error(format!(
            "Call to unknown function '{}'",
            other
        ))),
    }
}

fn two_string_args<'a>(name: &str, args: &'a [Value]) -> Result<(&'a str, &'a str), RuntimeError> {
    match args {
        [Value::Str(a), Value::Str(b)] => Ok((a, b)),
        [a, b] => Err(RuntimeError::Error(format!(
            "{}() requires string arguments, got {} and {}",
            name,
            a.type_name(),
            b.type_name()
        ))),
        _ => Err(RuntimeError::Error(format!(
            "{}() takes 2 arguments, got {}",
            name,
            args.len()
        ))),
    }
}
