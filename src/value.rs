/// Core Axiom runtime value type and associated utilities.
///
/// Lives in its own module so the interpreter and the contract layer can
/// both import it without circular dependencies.
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::RuntimeError;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<Value>),
    /// Property order equals source/context order.
    Object(Vec<(String, Value)>),
    /// Produced only when a rule does not end in an expression statement.
    Null,
}

/// Scope stack: innermost scope last.
pub type Env = Vec<HashMap<String, Value>>;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Null => "null",
        }
    }

    /// The static type this value would infer to. Used by tests to assert
    /// checker/interpreter agreement; element types of empty lists come
    /// back as `Unknown`, exactly like the corresponding literal.
    pub fn dynamic_type(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Str(_) => Type::String,
            Value::Bool(_) => Type::Bool,
            Value::Date(_) => Type::Date,
            Value::List(items) => {
                let elem = items.first().map(Value::dynamic_type).unwrap_or(Type::Unknown);
                Type::List(Box::new(elem))
            }
            Value::Object(fields) => Type::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.dynamic_type()))
                    .collect(),
            ),
            Value::Null => Type::Unknown,
        }
    }

    /// Look up a property on an object value.
    pub fn property(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Parse an ISO-8601 instant. Accepts full RFC 3339 timestamps and bare
/// `YYYY-MM-DD` dates (interpreted as midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RuntimeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }
    Err(RuntimeError::Error(format!(
        "Invalid ISO-8601 timestamp: '{}'",
        s
    )))
}

/// Human-readable representation of a value, used by the CLI.
pub fn axiom_repr(val: &Value) -> String {
    match val {
        Value::Int(i) => i.to_string(),
        Value::Str(s) => s.clone(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Date(dt) => dt.to_rfc3339(),
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(axiom_repr_inner).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(fields) => {
            let parts: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, axiom_repr_inner(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Null => "null".to_string(),
    }
}

// For values inside lists and objects — strings and dates get quoted
fn axiom_repr_inner(val: &Value) -> String {
    match val {
        Value::Str(s) => format!("\"{}\"", s),
        Value::Date(dt) => format!("\"{}\"", dt.to_rfc3339()),
        other => axiom_repr(other),
    }
}
