/// The public pipeline: `compile` → `check` → `execute`, plus the `eval`
/// convenience that chains all three.
///
/// `compile` and `check` run once per rule; the AST and the contract are
/// immutable afterwards and may be shared freely. Every `execute` builds
/// its own private environment from the context, so executions are
/// independent and deterministic.
use serde_json::Value as Json;

use crate::ast::Stmt;
use crate::contract::{self, Contract};
use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::typechecker;
use crate::types::Type;
use crate::value::Value;

/// Lex and parse a rule source.
pub fn compile(source: &str) -> Result<Vec<Stmt>, Error> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse()?)
}

/// Type-check a compiled rule against a contract; returns the inferred
/// result type.
pub fn check(program: &[Stmt], contract: &Contract) -> Result<Type, Error> {
    Ok(typechecker::check_program(program, contract)?)
}

/// Run a compiled rule with context data.
pub fn execute(program: &[Stmt], contract: &Contract, context: &Json) -> Result<Value, Error> {
    let globals = contract::context_env(contract, context)?;
    let mut interp = Interpreter::new(globals);
    Ok(interp.run(program)?)
}

/// Compile, check and execute in one call.
pub fn eval(source: &str, contract: &Contract, context: &Json) -> Result<Value, Error> {
    let program = compile(source)?;
    check(&program, contract)?;
    execute(&program, contract, context)
}
