/// Spec tests for the Axiom tree-walking interpreter.
///
/// Programs are compiled and run directly, bypassing the type checker, so
/// these tests focus solely on runtime semantics — including behaviors the
/// checker would normally rule out.
use std::collections::HashMap;

use axiom::ast::Stmt;
use axiom::error::RuntimeError;
use axiom::interpreter::Interpreter;
use axiom::lexer::Lexer;
use axiom::parser::Parser;
use axiom::value::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compile(src: &str) -> Vec<Stmt> {
    let mut lexer = Lexer::new(src);
    let tokens = lexer.tokenize().expect("lex failed");
    let mut parser = Parser::new(tokens);
    parser.parse().expect("parse failed")
}

fn run_with(src: &str, globals: HashMap<String, Value>) -> Result<Value, RuntimeError> {
    let mut interp = Interpreter::new(globals);
    interp.run(&compile(src))
}

fn run(src: &str) -> Value {
    run_with(src, HashMap::new()).expect("eval failed")
}

fn run_err(src: &str) -> RuntimeError {
    run_with(src, HashMap::new()).expect_err("expected a runtime error")
}

fn globals(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn obj(fields: Vec<(&str, Value)>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Integer arithmetic
// ---------------------------------------------------------------------------

#[test]
fn int_add() {
    assert_eq!(run("2 + 3"), Value::Int(5));
}

#[test]
fn int_precedence() {
    assert_eq!(run("1 + 2 * 3"), Value::Int(7));
}

#[test]
fn int_division_truncates() {
    assert_eq!(run("7 / 2"), Value::Int(3));
    assert_eq!(run("0 - 7 / 2"), Value::Int(-3));
}

#[test]
fn int_overflow_wraps() {
    assert_eq!(
        run("9223372036854775807 + 1"),
        Value::Int(i64::MIN)
    );
}

#[test]
fn unary_negation() {
    assert_eq!(run("-5 + 2"), Value::Int(-3));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    assert_eq!(run_err("1 / 0"), RuntimeError::DivisionByZero);
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

#[test]
fn string_concat() {
    assert_eq!(
        run("\"Wonder\" + \"land\""),
        Value::Str("Wonderland".to_string())
    );
}

#[test]
fn string_builtins() {
    assert_eq!(run("startsWith(\"abc\", \"ab\")"), Value::Bool(true));
    assert_eq!(run("endsWith(\"abc\", \"bc\")"), Value::Bool(true));
    assert_eq!(run("contains(\"abc\", \"z\")"), Value::Bool(false));
}

#[test]
fn length_counts_characters() {
    assert_eq!(run("length(\"abc\")"), Value::Int(3));
    assert_eq!(run("length(\"héllo\")"), Value::Int(5));
}

// ---------------------------------------------------------------------------
// Equality and comparisons
// ---------------------------------------------------------------------------

#[test]
fn equality_is_deep() {
    assert_eq!(run("[1, 2] == [1, 2]"), Value::Bool(true));
    assert_eq!(run("[1, 2] == [2, 1]"), Value::Bool(false));
    assert_eq!(run("({a: 1}) == ({a: 1})"), Value::Bool(true));
}

#[test]
fn inequality() {
    assert_eq!(run("1 != 2"), Value::Bool(true));
}

#[test]
fn ordered_comparisons() {
    assert_eq!(run("1 < 2"), Value::Bool(true));
    assert_eq!(run("3 <= 3"), Value::Bool(true));
    assert_eq!(run("5 > 7"), Value::Bool(false));
}

// ---------------------------------------------------------------------------
// Short-circuit evaluation
// ---------------------------------------------------------------------------

#[test]
fn and_short_circuits() {
    // The right operand would divide by zero; it must not be evaluated.
    assert_eq!(run("false && (1 / 0 == 1)"), Value::Bool(false));
}

#[test]
fn or_short_circuits() {
    assert_eq!(run("true || (1 / 0 == 1)"), Value::Bool(true));
}

#[test]
fn and_evaluates_right_when_left_is_true() {
    assert_eq!(run_err("true && (1 / 0 == 1)"), RuntimeError::DivisionByZero);
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[test]
fn in_membership() {
    assert_eq!(
        run("\"admin\" in [\"user\", \"admin\", \"guest\"]"),
        Value::Bool(true)
    );
    assert_eq!(run("4 in [1, 2, 3]"), Value::Bool(false));
}

#[test]
fn in_uses_structural_equality() {
    assert_eq!(run("[1, 2] in [[0], [1, 2]]"), Value::Bool(true));
}

// ---------------------------------------------------------------------------
// Statements and implicit return
// ---------------------------------------------------------------------------

#[test]
fn discount_rule_with_vip_flag() {
    let src = "let d: int = 0; if (is_vip) { d = 50; } base_price - d";
    let ctx = globals(vec![("is_vip", Value::Bool(true)), ("base_price", Value::Int(100))]);
    assert_eq!(run_with(src, ctx).unwrap(), Value::Int(50));

    let ctx = globals(vec![("is_vip", Value::Bool(false)), ("base_price", Value::Int(100))]);
    assert_eq!(run_with(src, ctx).unwrap(), Value::Int(100));
}

#[test]
fn program_without_final_expression_returns_null() {
    assert_eq!(run("let x: int = 1;"), Value::Null);
}

#[test]
fn expression_statement_inside_if_becomes_last_value() {
    assert_eq!(run("if (true) { 42; }"), Value::Int(42));
    assert_eq!(run("if (false) { 42; }"), Value::Null);
}

#[test]
fn else_branch_runs_when_condition_is_false() {
    assert_eq!(run("if (false) { 1; } else { 2; }"), Value::Int(2));
}

#[test]
fn block_scopes_declarations() {
    let err = run_err("{ let tmp: int = 1; } tmp");
    assert_eq!(err, RuntimeError::UndefinedVariable("tmp".to_string()));
}

#[test]
fn assignment_inside_block_updates_outer_binding() {
    assert_eq!(run("let x: int = 1; { x = 9; } x"), Value::Int(9));
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    assert_eq!(
        run_err("missing + 1"),
        RuntimeError::UndefinedVariable("missing".to_string())
    );
}

// ---------------------------------------------------------------------------
// Objects and member access
// ---------------------------------------------------------------------------

#[test]
fn member_access_on_context_object() {
    let ctx = globals(vec![(
        "user",
        obj(vec![("name", Value::Str("Alice".to_string()))]),
    )]);
    assert_eq!(
        run_with("user.name", ctx).unwrap(),
        Value::Str("Alice".to_string())
    );
}

#[test]
fn nested_member_chain() {
    let ctx = globals(vec![(
        "user",
        obj(vec![
            ("name", Value::Str("Alice".to_string())),
            ("address", obj(vec![("city", Value::Str("Wonderland".to_string()))])),
            (
                "company",
                obj(vec![(
                    "address",
                    obj(vec![("zip", Value::Str("88081".to_string()))]),
                )]),
            ),
        ]),
    )]);
    assert_eq!(
        run_with("user.address.city + \"-\" + user.company.address.zip", ctx).unwrap(),
        Value::Str("Wonderland-88081".to_string())
    );
}

#[test]
fn missing_property_is_a_runtime_error() {
    let ctx = globals(vec![("user", obj(vec![]))]);
    assert_eq!(
        run_with("user.name", ctx).unwrap_err(),
        RuntimeError::MissingProperty("name".to_string())
    );
}

#[test]
fn member_access_on_non_object_is_a_runtime_error() {
    let ctx = globals(vec![("user", Value::Int(1))]);
    assert!(matches!(
        run_with("user.name", ctx).unwrap_err(),
        RuntimeError::Error(_)
    ));
}

#[test]
fn object_literal_preserves_source_order() {
    assert_eq!(
        run("({b: 1, a: 2})"),
        obj(vec![("b", Value::Int(1)), ("a", Value::Int(2))])
    );
}

#[test]
fn list_elements_evaluate_left_to_right() {
    assert_eq!(
        run("[1 + 1, 2 * 2]"),
        Value::List(vec![Value::Int(2), Value::Int(4)])
    );
}

// ---------------------------------------------------------------------------
// has(..)
// ---------------------------------------------------------------------------

#[test]
fn has_true_when_property_present() {
    let ctx = globals(vec![(
        "user",
        obj(vec![("name", Value::Str("Alice".to_string()))]),
    )]);
    assert_eq!(run_with("has(user.name)", ctx).unwrap(), Value::Bool(true));
}

#[test]
fn has_false_when_property_missing() {
    let ctx = globals(vec![("user", obj(vec![]))]);
    assert_eq!(run_with("has(user.name)", ctx).unwrap(), Value::Bool(false));
}

#[test]
fn has_false_when_root_is_unbound() {
    assert_eq!(run("has(user.name)"), Value::Bool(false));
}

#[test]
fn has_false_for_missing_intermediate_property() {
    let ctx = globals(vec![(
        "user",
        obj(vec![("name", Value::Str("Alice".to_string()))]),
    )]);
    assert_eq!(
        run_with("has(user.company.zip)", ctx).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn has_propagates_non_presence_errors() {
    // The chain fails with a type mismatch, not a missing property.
    let ctx = globals(vec![("user", Value::Int(1))]);
    assert!(matches!(
        run_with("has(user.name)", ctx).unwrap_err(),
        RuntimeError::Error(_)
    ));
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

#[test]
fn exists_and_all() {
    assert_eq!(
        run("[1, 2, 3].all(n, n > 0) && [1, 2, 3].exists(n, n > 2)"),
        Value::Bool(true)
    );
}

#[test]
fn exists_false_when_no_match() {
    assert_eq!(run("[1, 2].exists(n, n > 5)"), Value::Bool(false));
}

#[test]
fn all_false_on_first_counterexample() {
    assert_eq!(run("[1, 0, 2].all(n, n > 0)"), Value::Bool(false));
}

#[test]
fn macros_on_empty_list() {
    assert_eq!(run("[].exists(n, true)"), Value::Bool(false));
    assert_eq!(run("[].all(n, false)"), Value::Bool(true));
}

#[test]
fn exists_short_circuits_on_first_match() {
    // The second element would divide by zero; exists stops before it.
    assert_eq!(run("[1, 0].exists(n, 1 / n == 1)"), Value::Bool(true));
}

#[test]
fn all_short_circuits_on_first_counterexample() {
    assert_eq!(run("[0, 5].all(n, n > 3)"), Value::Bool(false));
}

#[test]
fn macro_body_errors_propagate() {
    assert_eq!(
        run_err("[0, 1].exists(n, 1 / n == 1)"),
        RuntimeError::DivisionByZero
    );
}

#[test]
fn macro_param_is_unbound_after_iteration() {
    assert_eq!(
        run_err("let ok: bool = [1].exists(n, n > 0); n"),
        RuntimeError::UndefinedVariable("n".to_string())
    );
}

#[test]
fn macro_param_restores_prior_binding() {
    let ctx = globals(vec![("n", Value::Int(99))]);
    assert_eq!(
        run_with("let ok: bool = [1, 2].exists(n, n > 1); n", ctx).unwrap(),
        Value::Int(99)
    );
}

#[test]
fn macro_on_non_list_is_a_runtime_error() {
    let ctx = globals(vec![("xs", Value::Int(3))]);
    assert!(matches!(
        run_with("xs.exists(n, true)", ctx).unwrap_err(),
        RuntimeError::Error(_)
    ));
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

#[test]
fn timestamp_orders_instants() {
    assert_eq!(
        run("timestamp(\"2024-01-01\") < timestamp(\"2024-06-01\")"),
        Value::Bool(true)
    );
}

#[test]
fn timestamp_accepts_rfc3339_instants() {
    assert_eq!(
        run("timestamp(\"2024-01-01T00:00:00Z\") == timestamp(\"2024-01-01\")"),
        Value::Bool(true)
    );
}

#[test]
fn timestamp_compares_across_timezones() {
    // 12:00+02:00 is the same instant as 10:00Z.
    assert_eq!(
        run("timestamp(\"2024-01-01T12:00:00+02:00\") == timestamp(\"2024-01-01T10:00:00Z\")"),
        Value::Bool(true)
    );
}

#[test]
fn invalid_timestamp_is_a_runtime_error() {
    assert!(matches!(
        run_err("timestamp(\"not-a-date\")"),
        RuntimeError::Error(_)
    ));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn execution_is_deterministic() {
    let src = "let d: int = 10; [1, 2, 3].exists(n, n * d > 25)";
    assert_eq!(run(src), run(src));
}

#[test]
fn program_can_be_rerun_on_fresh_environments() {
    let program = compile("base + 1");
    let mut first = Interpreter::new(globals(vec![("base", Value::Int(1))]));
    let mut second = Interpreter::new(globals(vec![("base", Value::Int(10))]));
    assert_eq!(first.run(&program).unwrap(), Value::Int(2));
    assert_eq!(second.run(&program).unwrap(), Value::Int(11));
    // The AST is untouched by execution; running in the other order gives
    // the same results.
    let mut again = Interpreter::new(globals(vec![("base", Value::Int(1))]));
    assert_eq!(again.run(&program).unwrap(), Value::Int(2));
}
