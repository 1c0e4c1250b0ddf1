use std::{fmt, rc::Rc};

use crate::{ast::{format_number, ExprRef}, object::ObjectId};

/// A runtime value.
///
/// Numbers, strings and booleans are "simple" objects: they carry no fields of
/// their own and delegate field access to the matching proto on the heap.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    Object(ObjectId),
}

impl Value {
    pub fn string(value: impl AsRef<str>) -> Self {
        Value::String(Rc::from(value.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Object(_) => "object",
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::Object(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(value) => write!(f, "{}", format_number(*value)),
            Value::String(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Object(_) => write!(f, "[object]"),
        }
    }
}

/// A value together with the expression that produced it, if known.
#[derive(Debug, Clone, Default)]
pub struct LabeledValue {
    pub value: Value,
    pub source: Option<ExprRef>,
}

impl LabeledValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            source: None,
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn with_source(value: impl Into<Value>, source: Option<ExprRef>) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    /// Keeps an existing source, otherwise records `origin`.
    pub fn or_source(mut self, origin: Option<&ExprRef>) -> Self {
        if self.source.is_none() {
            self.source = origin.cloned();
        }
        self
    }
}

impl From<Value> for LabeledValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
