/// Axiom static type checker.
///
/// A single left-to-right pass over the statement list: expressions are
/// inferred bottom-up, statements are checked top-down. The environment is
/// seeded from the contract's inputs and maintained as a scope stack —
/// blocks push a frame on entry and pop it on exit, so block-local
/// declarations do not leak into the surrounding code.
///
/// The first error aborts the check; errors are fatal for the whole rule.
use std::collections::HashMap;

use crate::ast::{BinOp, Expr, Literal, Stmt, UnaryOp};
use crate::contract::Contract;
use crate::error::TypeError;
use crate::types::Type;

/// Check a program against a contract. Returns the inferred type of the
/// final expression statement (the rule's result), or `Type::Unknown` when
/// the program does not end in one and the contract declares no output.
pub fn check_program(program: &[Stmt], contract: &Contract) -> Result<Type, TypeError> {
    let mut checker = TypeChecker::new(contract);
    checker.check(program, contract.outputs.as_ref())
}

fn builtin_sig(name: &str) -> Option<(Vec<Type>, Type)> {
    match name {
        "startsWith" => Some((vec![Type::String, Type::String], Type::Bool)),
        "endsWith" => Some((vec![Type::String, Type::String], Type::Bool)),
        "contains" => Some((vec![Type::String, Type::String], Type::Bool)),
        "length" => Some((vec![Type::String], Type::Int)),
        "timestamp" => Some((vec![Type::String], Type::Date)),
        _ => None,
    }
}

/// Walk a member chain down to the variable at its base.
fn member_root(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Variable(name) => Some(name),
        Expr::Member(obj, _) => member_root(obj),
        _ => None,
    }
}

struct TypeChecker {
    /// Innermost scope last; frame 0 holds the contract inputs.
    scopes: Vec<HashMap<String, Type>>,
}

impl TypeChecker {
    fn new(contract: &Contract) -> Self {
        let mut globals = HashMap::new();
        for (name, ty) in &contract.inputs {
            globals.insert(name.clone(), ty.clone());
        }
        TypeChecker {
            scopes: vec![globals],
        }
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn declare(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn undeclare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.remove(name);
        }
    }

    fn check(&mut self, program: &[Stmt], expected: Option<&Type>) -> Result<Type, TypeError> {
        let mut last = None;
        for stmt in program {
            last = self.check_stmt(stmt)?;
        }

        match (expected, last) {
            (Some(_), None) => Err(TypeError::new("script does not end with an expression")),
            (Some(want), Some(got)) => {
                validate_output(&got, want)?;
                Ok(got)
            }
            (None, got) => Ok(got.unwrap_or(Type::Unknown)),
        }
    }

    /// Returns `Some(type)` only for expression statements; the caller
    /// tracks the last one for output validation.
    fn check_stmt(&mut self, stmt: &Stmt) -> Result<Option<Type>, TypeError> {
        match stmt {
            Stmt::VarDecl {
                name,
                annotation,
                init,
            } => {
                let init_ty = self.infer(init)?;
                if !init_ty.matches(annotation) {
                    return Err(TypeError::new(format!(
                        "Type mismatch in declaration of '{}': expected {}, got {}",
                        name,
                        annotation.display(),
                        init_ty.display()
                    )));
                }
                if self.is_bound(name) {
                    return Err(TypeError::new(format!(
                        "Variable '{}' is already declared",
                        name
                    )));
                }
                self.declare(name, annotation.clone());
                Ok(None)
            }

            Stmt::Assign { name, value } => {
                let value_ty = self.infer(value)?;
                let target = self.lookup(name).cloned().ok_or_else(|| {
                    TypeError::new(format!("Assignment to undeclared variable '{}'", name))
                })?;
                if !value_ty.matches(&target) {
                    return Err(TypeError::new(format!(
                        "Type mismatch in assignment to '{}': expected {}, got {}",
                        name,
                        target.display(),
                        value_ty.display()
                    )));
                }
                Ok(None)
            }

            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond_ty = self.infer(cond)?;
                if !cond_ty.matches(&Type::Bool) {
                    return Err(TypeError::new(format!(
                        "If condition must be bool, got {}",
                        cond_ty.display()
                    )));
                }
                self.check_stmt(then)?;
                if let Some(else_branch) = otherwise {
                    self.check_stmt(else_branch)?;
                }
                Ok(None)
            }

            Stmt::Block(stmts) => {
                self.scopes.push(HashMap::new());
                let result = stmts.iter().try_for_each(|s| self.check_stmt(s).map(|_| ()));
                self.scopes.pop();
                result?;
                Ok(None)
            }

            Stmt::Expr(expr) => Ok(Some(self.infer(expr)?)),
        }
    }

    // -------------------------------------------------------------------------
    // Expression inference
    // -------------------------------------------------------------------------

    fn infer(&mut self, expr: &Expr) -> Result<Type, TypeError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Int(_) => Type::Int,
                Literal::Str(_) => Type::String,
                Literal::Bool(_) => Type::Bool,
            }),

            Expr::Variable(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| TypeError::new(format!("Undefined variable '{}'", name))),

            Expr::Unary(op, operand) => {
                let ty = self.infer(operand)?;
                match op {
                    UnaryOp::Not => {
                        if ty.matches(&Type::Bool) {
                            Ok(Type::Bool)
                        } else {
                            Err(TypeError::new(format!(
                                "Operator '!' requires bool, got {}",
                                ty.display()
                            )))
                        }
                    }
                    UnaryOp::Neg => {
                        if ty.matches(&Type::Int) {
                            Ok(Type::Int)
                        } else {
                            Err(TypeError::new(format!(
                                "Operator '-' requires int, got {}",
                                ty.display()
                            )))
                        }
                    }
                }
            }

            Expr::Binary(op, left, right) => {
                let lt = self.infer(left)?;
                let rt = self.infer(right)?;
                self.binop_type(*op, &lt, &rt)
            }

            Expr::Member(obj, prop) => {
                let obj_ty = self.infer(obj)?;
                match &obj_ty {
                    Type::Object(_) => obj_ty.property(prop).cloned().ok_or_else(|| {
                        TypeError::new(format!(
                            "Property '{}' does not exist on {}",
                            prop,
                            obj_ty.display()
                        ))
                    }),
                    other => Err(TypeError::new(format!(
                        "Cannot access property '{}' on {}",
                        prop,
                        other.display()
                    ))),
                }
            }

            Expr::List(elements) => {
                let Some(first) = elements.first() else {
                    return Ok(Type::List(Box::new(Type::Unknown)));
                };
                let elem_ty = self.infer(first)?;
                for element in &elements[1..] {
                    let ty = self.infer(element)?;
                    if !ty.matches(&elem_ty) {
                        return Err(TypeError::new(format!(
                            "List elements must be homogeneous: found {} and {}",
                            elem_ty.display(),
                            ty.display()
                        )));
                    }
                }
                Ok(Type::List(Box::new(elem_ty)))
            }

            Expr::Object(fields) => {
                let mut props: Vec<(String, Type)> = Vec::with_capacity(fields.len());
                for (key, value) in fields {
                    if props.iter().any(|(k, _)| k == key) {
                        return Err(TypeError::new(format!(
                            "Duplicate property '{}' in object literal",
                            key
                        )));
                    }
                    let ty = self.infer(value)?;
                    props.push((key.clone(), ty));
                }
                Ok(Type::Object(props))
            }

            Expr::Call { callee, args } => self.infer_call(callee, args),

            Expr::Lambda { .. } => Err(TypeError::new(
                "Lambda expressions are only valid as macro arguments",
            )),
        }
    }

    fn infer_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Type, TypeError> {
        if let Expr::Variable(name) = callee {
            if name == "has" {
                return self.infer_has(args);
            }
            if let Some((params, ret)) = builtin_sig(name) {
                return self.infer_builtin(name, &params, ret, args);
            }
            return Err(TypeError::new(format!(
                "Call to unknown function '{}'",
                name
            )));
        }
        if let Expr::Member(obj, macro_name) = callee {
            if macro_name == "exists" || macro_name == "all" {
                return self.infer_macro(obj, macro_name, args);
            }
            return Err(TypeError::new(format!(
                "Unknown macro '{}' (expected 'exists' or 'all')",
                macro_name
            )));
        }
        Err(TypeError::new("Only named functions can be called"))
    }

    /// `has(user.address.city)` — a dynamic presence test. Only the variable
    /// at the root of the chain is resolved statically; intermediate
    /// properties are checked at runtime.
    fn infer_has(&mut self, args: &[Expr]) -> Result<Type, TypeError> {
        if args.len() != 1 {
            return Err(TypeError::new(format!(
                "has() takes 1 argument, got {}",
                args.len()
            )));
        }
        if !matches!(args[0], Expr::Member(_, _)) {
            return Err(TypeError::new(
                "has() requires a property access argument, e.g. has(user.name)",
            ));
        }
        let root = member_root(&args[0]).ok_or_else(|| {
            TypeError::new("has() requires a property access rooted at a variable")
        })?;
        if !self.is_bound(root) {
            return Err(TypeError::new(format!("Undefined variable '{}'", root)));
        }
        Ok(Type::Bool)
    }

    fn infer_builtin(
        &mut self,
        name: &str,
        params: &[Type],
        ret: Type,
        args: &[Expr],
    ) -> Result<Type, TypeError> {
        if args.len() != params.len() {
            return Err(TypeError::new(format!(
                "{}() takes {} argument(s), got {}",
                name,
                params.len(),
                args.len()
            )));
        }
        for (i, (arg, param)) in args.iter().zip(params).enumerate() {
            let ty = self.infer(arg)?;
            if !ty.matches(param) {
                return Err(TypeError::new(format!(
                    "Argument {} of {}(): expected {}, got {}",
                    i + 1,
                    name,
                    param.display(),
                    ty.display()
                )));
            }
        }
        Ok(ret)
    }

    fn infer_macro(
        &mut self,
        obj: &Expr,
        macro_name: &str,
        args: &[Expr],
    ) -> Result<Type, TypeError> {
        let obj_ty = self.infer(obj)?;
        let elem_ty = match obj_ty {
            Type::List(elem) => *elem,
            Type::Unknown => Type::Unknown,
            other => {
                return Err(TypeError::new(format!(
                    "Macro '{}' requires a list, got {}",
                    macro_name,
                    other.display()
                )))
            }
        };

        let [Expr::Lambda { param, body }] = args else {
            return Err(TypeError::new(format!(
                "Macro '{}' expects a single lambda argument",
                macro_name
            )));
        };
        if self.is_bound(param) {
            return Err(TypeError::new(format!(
                "Macro parameter '{}' shadows an existing variable",
                param
            )));
        }

        self.declare(param, elem_ty);
        let body_ty = self.infer(body);
        self.undeclare(param);
        let body_ty = body_ty?;

        if !body_ty.matches(&Type::Bool) {
            return Err(TypeError::new(format!(
                "Macro '{}' body must be bool, got {}",
                macro_name,
                body_ty.display()
            )));
        }
        Ok(Type::Bool)
    }

    // -------------------------------------------------------------------------
    // Binary operator rules
    // -------------------------------------------------------------------------

    fn binop_type(&mut self, op: BinOp, lt: &Type, rt: &Type) -> Result<Type, TypeError> {
        match op {
            BinOp::Add => {
                if lt.matches(&Type::Int) && rt.matches(&Type::Int) {
                    Ok(Type::Int)
                } else if lt.matches(&Type::String) && rt.matches(&Type::String) {
                    Ok(Type::String)
                } else {
                    Err(TypeError::new(format!(
                        "Operator '+' requires two ints or two strings, got {} and {}",
                        lt.display(),
                        rt.display()
                    )))
                }
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div => {
                if lt.matches(&Type::Int) && rt.matches(&Type::Int) {
                    Ok(Type::Int)
                } else {
                    Err(TypeError::new(format!(
                        "Operator '{}' requires int operands, got {} and {}",
                        op.symbol(),
                        lt.display(),
                        rt.display()
                    )))
                }
            }
            BinOp::Eq | BinOp::Neq => {
                if lt.matches(rt) {
                    Ok(Type::Bool)
                } else {
                    Err(TypeError::new(format!(
                        "Operator '{}' requires operands of the same type, got {} and {}",
                        op.symbol(),
                        lt.display(),
                        rt.display()
                    )))
                }
            }
            BinOp::Gt | BinOp::Gte | BinOp::Lt | BinOp::Lte => {
                let ints = lt.matches(&Type::Int) && rt.matches(&Type::Int);
                let dates = lt.matches(&Type::Date) && rt.matches(&Type::Date);
                if ints || dates {
                    Ok(Type::Bool)
                } else {
                    Err(TypeError::new(format!(
                        "Operator '{}' requires int or date operands, got {} and {}",
                        op.symbol(),
                        lt.display(),
                        rt.display()
                    )))
                }
            }
            BinOp::And | BinOp::Or => {
                if lt.matches(&Type::Bool) && rt.matches(&Type::Bool) {
                    Ok(Type::Bool)
                } else {
                    Err(TypeError::new(format!(
                        "Operator '{}' requires bool operands, got {} and {}",
                        op.symbol(),
                        lt.display(),
                        rt.display()
                    )))
                }
            }
            BinOp::In => match rt {
                Type::List(elem) => {
                    if lt.matches(elem) {
                        Ok(Type::Bool)
                    } else {
                        Err(TypeError::new(format!(
                            "Operator 'in': left side is {} but list elements are {}",
                            lt.display(),
                            elem.display()
                        )))
                    }
                }
                Type::Unknown => Ok(Type::Bool),
                other => Err(TypeError::new(format!(
                    "Operator 'in' requires a list on the right side, got {}",
                    other.display()
                ))),
            },
        }
    }
}

/// Contract output validation. Object targets are validated
/// property-by-property so the first mismatching key can be named; a
/// target object with no declared properties accepts any object.
fn validate_output(actual: &Type, expected: &Type) -> Result<(), TypeError> {
    if let (Type::Object(actual_props), Type::Object(expected_props)) = (actual, expected) {
        for (key, want) in expected_props {
            let Some(got) = actual_props.iter().find(|(k, _)| k == key).map(|(_, t)| t) else {
                return Err(TypeError::new(format!(
                    "Return type mismatch: missing property '{}'",
                    key
                )));
            };
            if !got.matches(want) {
                return Err(TypeError::new(format!(
                    "Return type mismatch for property '{}': expected {}, got {}",
                    key,
                    want.display(),
                    got.display()
                )));
            }
        }
        return Ok(());
    }

    if actual.matches(expected) {
        Ok(())
    } else {
        Err(TypeError::new(format!(
            "Return type mismatch: expected {}, got {}",
            expected.display(),
            actual.display()
        )))
    }
}
