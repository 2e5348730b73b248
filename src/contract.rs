/// The contract model and the JSON boundary.
///
/// A contract is the typed interface a rule is checked against: input
/// names/types and an optional output type. This module parses the
/// JSON `TypeSpec` forms, converts context JSON into runtime values
/// (type-directed, so strings declared `date` become instants), and
/// serializes result values back to JSON.
use std::collections::HashMap;

use serde_json::{Map, Value as Json};

use crate::error::RuntimeError;
use crate::types::Type;
use crate::value::{parse_timestamp, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub name: String,
    /// Ordered; defines the initial typed environment.
    pub inputs: Vec<(String, Type)>,
    /// Constrains the type of the rule's final expression, if present.
    pub outputs: Option<Type>,
}

impl Contract {
    pub fn new(name: impl Into<String>, inputs: Vec<(String, Type)>, outputs: Option<Type>) -> Self {
        Contract {
            name: name.into(),
            inputs,
            outputs,
        }
    }

    /// A contract with no inputs and no output constraint.
    pub fn empty() -> Self {
        Contract::new("", Vec::new(), None)
    }

    /// Parse a resolved contract document:
    /// `{ "name": .., "inputs": { ident: TypeSpec, .. }, "outputs": TypeSpec | null }`.
    pub fn from_json(doc: &Json) -> Result<Contract, String> {
        let obj = expect_object(doc, "contract")?;
        let name = parse_string(get_required(obj, "name", "contract")?, "contract.name")?;

        let inputs_doc = expect_object(get_required(obj, "inputs", "contract")?, "contract.inputs")?;
        let mut inputs = Vec::with_capacity(inputs_doc.len());
        for (key, spec) in inputs_doc {
            let ty = parse_type_spec(spec, &format!("contract.inputs.{}", key))?;
            inputs.push((key.clone(), ty));
        }

        let outputs = match obj.get("outputs") {
            None | Some(Json::Null) => None,
            Some(spec) => Some(parse_type_spec(spec, "contract.outputs")?),
        };

        Ok(Contract {
            name: name.to_string(),
            inputs,
            outputs,
        })
    }
}

fn expect_object<'a>(value: &'a Json, path: &str) -> Result<&'a Map<String, Json>, String> {
    match value {
        Json::Object(obj) => Ok(obj),
        _ => Err(format!("{} must be an object", path)),
    }
}

fn get_required<'a>(obj: &'a Map<String, Json>, key: &str, path: &str) -> Result<&'a Json, String> {
    obj.get(key)
        .ok_or_else(|| format!("{}: missing required field '{}'", path, key))
}

fn parse_string<'a>(value: &'a Json, path: &str) -> Result<&'a str, String> {
    value.as_str().ok_or_else(|| format!("{} must be a string", path))
}

/// `TypeSpec` forms: `"int" | "string" | "bool" | "date"`, `"<prim>[]"`,
/// `[TypeSpec]`, `{ key: TypeSpec, .. }`.
pub fn parse_type_spec(spec: &Json, path: &str) -> Result<Type, String> {
    match spec {
        Json::String(s) => parse_type_name(s, path),
        Json::Array(items) => match items.as_slice() {
            [inner] => Ok(Type::List(Box::new(parse_type_spec(inner, path)?))),
            _ => Err(format!(
                "{}: a list shape must contain exactly one element type",
                path
            )),
        },
        Json::Object(props) => {
            let mut out = Vec::with_capacity(props.len());
            for (key, inner) in props {
                out.push((
                    key.clone(),
                    parse_type_spec(inner, &format!("{}.{}", path, key))?,
                ));
            }
            Ok(Type::Object(out))
        }
        _ => Err(format!("{}: invalid type spec", path)),
    }
}

fn parse_type_name(s: &str, path: &str) -> Result<Type, String> {
    if let Some(base) = s.strip_suffix("[]") {
        return Ok(Type::List(Box::new(parse_type_name(base, path)?)));
    }
    match s {
        "int" => Ok(Type::Int),
        "string" => Ok(Type::String),
        "bool" => Ok(Type::Bool),
        "date" => Ok(Type::Date),
        other => Err(format!("{}: unknown type '{}'", path, other)),
    }
}

/// Build the initial interpreter environment from a context document.
///
/// Declared inputs missing from the context are left unbound rather than
/// rejected: referencing one is then the undefined-variable runtime error,
/// which `has(..)` converts to `false`. Context keys not declared by the
/// contract are ignored.
pub fn context_env(
    contract: &Contract,
    context: &Json,
) -> Result<HashMap<String, Value>, RuntimeError> {
    let Json::Object(obj) = context else {
        return Err(RuntimeError::Error(
            "Context must be a JSON object".to_string(),
        ));
    };
    let mut env = HashMap::new();
    for (name, ty) in &contract.inputs {
        if let Some(raw) = obj.get(name) {
            env.insert(name.clone(), json_to_value(raw, Some(ty), name)?);
        }
    }
    Ok(env)
}

/// JSON → value, directed by the declared type where one is known.
/// Properties and elements beyond the declared shape convert untyped.
pub fn json_to_value(
    raw: &Json,
    declared: Option<&Type>,
    path: &str,
) -> Result<Value, RuntimeError> {
    match raw {
        Json::Null => Err(RuntimeError::Error(format!(
            "{}: null is not a value",
            path
        ))),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => number_to_int(n, path).map(Value::Int),
        Json::String(s) => {
            if matches!(declared, Some(Type::Date)) {
                parse_timestamp(s).map(Value::Date)
            } else {
                Ok(Value::Str(s.clone()))
            }
        }
        Json::Array(items) => {
            let elem_ty = match declared {
                Some(Type::List(elem)) => Some(elem.as_ref()),
                _ => None,
            };
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(json_to_value(item, elem_ty, &format!("{}[{}]", path, i))?);
            }
            Ok(Value::List(out))
        }
        Json::Object(map) => {
            let mut out = Vec::with_capacity(map.len());
            for (key, item) in map {
                let field_ty = declared.and_then(|t| t.property(key));
                out.push((
                    key.clone(),
                    json_to_value(item, field_ty, &format!("{}.{}", path, key))?,
                ));
            }
            Ok(Value::Object(out))
        }
    }
}

/// JSON number → i64, truncating: a number written as `100.0` is still the
/// integer 100. Only a value with an actual fractional part (or a
/// non-finite one) is rejected — the type system has no floats.
fn number_to_int(n: &serde_json::Number, path: &str) -> Result<i64, RuntimeError> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    if let Some(f) = n.as_f64() {
        if f.is_finite() && f.fract() == 0.0 {
            return Ok(f as i64);
        }
    }
    Err(RuntimeError::Error(format!(
        "{}: expected an integer, got {}",
        path, n
    )))
}

/// Serialize a result value back to JSON — the reverse of `json_to_value`.
/// Dates come back as RFC 3339 strings.
pub fn value_to_json(val: &Value) -> Json {
    match val {
        Value::Int(i) => Json::from(*i),
        Value::Str(s) => Json::String(s.clone()),
        Value::Bool(b) => Json::Bool(*b),
        Value::Date(dt) => Json::String(dt.to_rfc3339()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Object(fields) => {
            let mut map = Map::new();
            for (k, v) in fields {
                map.insert(k.clone(), value_to_json(v));
            }
            Json::Object(map)
        }
        Value::Null => Json::Null,
    }
}
