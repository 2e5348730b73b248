/// Axiom static type representation.
///
/// Provides the structural matching relation used by the type checker
/// (`Unknown` acts as a wildcard, so empty list literals unify with any
/// list type) and the surface-syntax display used in diagnostics.

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    String,
    Bool,
    Date,
    /// Element type of an empty list literal; matches any type.
    Unknown,
    List(Box<Type>),
    /// Property order is declaration order.
    Object(Vec<(String, Type)>),
}

impl Type {
    /// `a.matches(b)` — structural equality with `Unknown` as a wildcard.
    ///
    /// Object types match by key lookup: same number of properties, each
    /// property present on both sides with matching types. A zero-property
    /// object matches any object; this is what lets the empty object
    /// literal `{}` (and the permissive "any object" contract output)
    /// unify the way `Unknown` does for lists.
    pub fn matches(&self, other: &Type) -> bool {
        if matches!(self, Type::Unknown) || matches!(other, Type::Unknown) {
            return true;
        }
        match (self, other) {
            (Type::Int, Type::Int) => true,
            (Type::String, Type::String) => true,
            (Type::Bool, Type::Bool) => true,
            (Type::Date, Type::Date) => true,
            (Type::List(a), Type::List(b)) => a.matches(b),
            (Type::Object(a), Type::Object(b)) => {
                if a.is_empty() || b.is_empty() {
                    return true;
                }
                a.len() == b.len()
                    && a.iter().all(|(key, ty)| {
                        b.iter().any(|(k, t)| k == key && ty.matches(t))
                    })
            }
            _ => false,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Type::Int => "int".to_string(),
            Type::String => "string".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Date => "date".to_string(),
            Type::Unknown => "unknown".to_string(),
            Type::List(inner) => format!("{}[]", inner.display()),
            Type::Object(props) => {
                let parts: Vec<String> = props
                    .iter()
                    .map(|(k, t)| format!("{}: {}", k, t.display()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }

    /// Look up a property type on an object type.
    pub fn property(&self, key: &str) -> Option<&Type> {
        match self {
            Type::Object(props) => props.iter().find(|(k, _)| k == key).map(|(_, t)| t),
            _ => None,
        }
    }
}
