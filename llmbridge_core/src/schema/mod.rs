//! Static input descriptors and the schema extractor.
//!
//! Every input structure describes itself through [`InputSchema::fields`], a
//! table built once per type (the derive macro caches it in a
//! `once_cell::sync::Lazy`). Field types describe themselves through
//! [`SchemaType`]. Nothing here inspects values at runtime: the extractor only
//! walks these tables and renders them as JSON Schema.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value, json};

use crate::error::SchemaError;
use crate::models::{ExposedMethod, FunctionDecl, Service};

/// Maximum nesting depth of object/array schemas.
pub const MAX_DEPTH: usize = 16;

/// Returns the field table of an input structure.
pub type FieldsFn = fn() -> &'static [FieldSpec];

/// Semantic type of a single field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Closed set of string choices.
    Enum(&'static [&'static str]),
    Array(Box<FieldKind>),
    /// Nested input structure.
    Object(FieldsFn),
    /// A type with no JSON Schema mapping. Rejected by the extractor.
    Unsupported(&'static str),
}

// Objects are equal when they share the same field table.
impl PartialEq for FieldKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String, Self::String)
            | (Self::Integer, Self::Integer)
            | (Self::Number, Self::Number)
            | (Self::Boolean, Self::Boolean) => true,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => std::ptr::eq(a(), b()),
            (Self::Unsupported(a), Self::Unsupported(b)) => a == b,
            _ => false,
        }
    }
}

impl FieldKind {
    /// JSON Schema `type` keyword for this kind, if it has one.
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            Self::String | Self::Enum(_) => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Array(_) => Some("array"),
            Self::Object(_) => Some("object"),
            Self::Unsupported(_) => None,
        }
    }
}

/// Declaration of one field of an input structure.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Wire name (after serde renaming).
    pub name: &'static str,
    /// Doc comment of the field; may be empty.
    pub description: &'static str,
    pub kind: FieldKind,
    /// `true` iff the field has no default value.
    pub required: bool,
    /// Value used when the field is absent. `Some(Value::Null)` for plain
    /// `Option` fields; `None` on an optional field leaves the default to
    /// deserialization.
    pub default: Option<Value>,
    /// Alternative keys accepted for this field (`#[serde(alias = "..")]`).
    pub aliases: &'static [&'static str],
}

impl FieldSpec {
    pub fn required(name: &'static str, description: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            description,
            kind,
            required: true,
            default: None,
            aliases: &[],
        }
    }

    pub fn optional(
        name: &'static str,
        description: &'static str,
        kind: FieldKind,
        default: Value,
    ) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            default: Some(default),
            aliases: &[],
        }
    }

    pub fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

/// A type that can appear as a field of an input structure.
pub trait SchemaType {
    fn kind() -> FieldKind;

    /// Whether the type itself makes the field optional (`Option<T>`).
    fn is_optional() -> bool {
        false
    }
}

/// A structured input accepted by an exposed method.
///
/// Usually derived with `#[derive(InputSchema)]`.
pub trait InputSchema: SchemaType {
    fn fields() -> &'static [FieldSpec];
}

macro_rules! prim {
    ($ty:ty, $kind:ident) => {
        impl SchemaType for $ty {
            fn kind() -> FieldKind {
                FieldKind::$kind
            }
        }
    };
}

prim!(bool, Boolean);
prim!(i8, Integer);
prim!(i16, Integer);
prim!(i32, Integer);
prim!(i64, Integer);
prim!(i128, Integer);
prim!(isize, Integer);
prim!(u8, Integer);
prim!(u16, Integer);
prim!(u32, Integer);
prim!(u64, Integer);
prim!(u128, Integer);
prim!(usize, Integer);
prim!(f32, Number);
prim!(f64, Number);
prim!(char, String);
prim!(String, String);

impl<T: SchemaType> SchemaType for Option<T> {
    fn kind() -> FieldKind {
        T::kind()
    }

    fn is_optional() -> bool {
        true
    }
}

impl<T: SchemaType> SchemaType for Box<T> {
    fn kind() -> FieldKind {
        T::kind()
    }

    fn is_optional() -> bool {
        T::is_optional()
    }
}

impl<T: SchemaType> SchemaType for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::Array(Box::new(T::kind()))
    }
}

impl SchemaType for Value {
    fn kind() -> FieldKind {
        FieldKind::Unsupported("serde_json::Value")
    }
}

impl<K, V> SchemaType for HashMap<K, V> {
    fn kind() -> FieldKind {
        FieldKind::Unsupported(std::any::type_name::<Self>())
    }
}

impl<K, V> SchemaType for BTreeMap<K, V> {
    fn kind() -> FieldKind {
        FieldKind::Unsupported(std::any::type_name::<Self>())
    }
}

/// Builds the function descriptors of every method `service` exposes.
///
/// Pure: the service is only asked for its name and method table.
pub fn extract<S: Service>(service: &S) -> Result<Vec<FunctionDecl>, SchemaError> {
    tracing::debug!(service = service.name(), "extracting function schemas");
    S::methods()
        .iter()
        .map(|method| describe(method.name(), method))
        .collect()
}

/// Builds the descriptor of one method, published under `name`.
pub(crate) fn describe<S>(name: &str, method: &ExposedMethod<S>) -> Result<FunctionDecl, SchemaError> {
    if !is_valid_name(name) {
        return Err(SchemaError::InvalidName {
            function: name.to_string(),
        });
    }

    let description = method.description().trim();
    if description.is_empty() {
        return Err(SchemaError::MissingDescription {
            function: name.to_string(),
        });
    }

    let parameters = match method.input() {
        Some(fields) => object_schema(name, "", fields(), 0)?,
        None => empty_parameters(),
    };

    Ok(FunctionDecl::new(name, description, parameters))
}

/// Parameters of a function that takes no input.
pub fn empty_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// `^[A-Za-z0-9_-]{1,64}$`
pub fn is_valid_name(name: &str) -> bool {
    (1..=64).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn object_schema(
    function: &str,
    prefix: &str,
    fields: &[FieldSpec],
    depth: usize,
) -> Result<Value, SchemaError> {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        let path = join_path(prefix, field.name);
        let mut property = kind_schema(function, &path, &field.kind, depth)?;

        if let Value::Object(obj) = &mut property {
            let description = if field.description.trim().is_empty() {
                format!("Parameter: {}", field.name)
            } else {
                field.description.trim().to_string()
            };
            obj.insert("description".into(), Value::String(description));

            if let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) {
                obj.insert("default".into(), default.clone());
            }
        }

        if field.required {
            required.push(Value::String(field.name.to_string()));
        }
        properties.insert(field.name.to_string(), property);
    }

    Ok(json!({
        "type": "object",
        "properties": properties,
        "required": required
    }))
}

fn kind_schema(
    function: &str,
    path: &str,
    kind: &FieldKind,
    depth: usize,
) -> Result<Value, SchemaError> {
    if depth >= MAX_DEPTH {
        return Err(SchemaError::RecursionLimit {
            function: function.to_string(),
            field: path.to_string(),
            limit: MAX_DEPTH,
        });
    }

    match kind {
        FieldKind::Enum(choices) => Ok(json!({ "type": "string", "enum": choices })),
        FieldKind::Array(items) => {
            let items = kind_schema(function, path, items, depth + 1)?;
            Ok(json!({ "type": "array", "items": items }))
        }
        FieldKind::Object(fields) => object_schema(function, path, fields(), depth + 1),
        FieldKind::Unsupported(type_name) => Err(SchemaError::UnsupportedType {
            function: function.to_string(),
            field: path.to_string(),
            type_name,
        }),
        scalar => Ok(json!({ "type": scalar.json_type() })),
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
