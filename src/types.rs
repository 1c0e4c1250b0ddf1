//! Structural type descriptors used to validate function arguments.

use std::{fmt, rc::Rc};

use crate::{
    ast::FieldKey,
    error::RuntimeErrorKind,
    object::{Heap, ObjectKind},
    value::Value,
};

pub type TypeRef = Rc<dyn Type>;

/// Failed match: the descriptor that rejected the value and the field path leading to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMismatch {
    pub expected: String,
    pub path: Vec<String>,
}

impl TypeMismatch {
    fn new(expected: String) -> Self {
        Self {
            expected,
            path: Vec::new(),
        }
    }

    fn prefixed(mut self, segment: impl fmt::Display) -> Self {
        self.path.insert(0, segment.to_string());
        self
    }

    /// Converts into a runtime error, rooting the path at `root`.
    pub fn into_error(self, root: &FieldKey) -> RuntimeErrorKind {
        let mut path = root.to_string();
        for segment in &self.path {
            path.push('.');
            path.push_str(segment);
        }
        RuntimeErrorKind::TypeMismatch {
            path,
            expected: self.expected,
        }
    }
}

pub type MatchResult = Result<(), TypeMismatch>;

pub trait Type: fmt::Debug {
    fn name(&self) -> String;

    fn matches(&self, value: &Value, heap: &Heap) -> MatchResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Any,
    Null,
    Number,
    String,
    Boolean,
    Function,
    Object,
}

#[derive(Debug)]
pub struct PrimitiveType(pub Primitive);

impl Type for PrimitiveType {
    fn name(&self) -> String {
        match self.0 {
            Primitive::Any => "any",
            Primitive::Null => "null",
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Function => "function",
            Primitive::Object => "object",
        }
        .to_string()
    }

    fn matches(&self, value: &Value, heap: &Heap) -> MatchResult {
        let ok = match self.0 {
            Primitive::Any => true,
            Primitive::Null => value.is_null(),
            Primitive::Number => matches!(value, Value::Number(_)),
            Primitive::String => matches!(value, Value::String(_)),
            Primitive::Boolean => matches!(value, Value::Boolean(_)),
            Primitive::Function => heap.is_callable(value),
            Primitive::Object => matches!(value, Value::Object(_)),
        };
        if ok {
            Ok(())
        } else {
            Err(TypeMismatch::new(self.name()))
        }
    }
}

#[derive(Debug)]
pub struct OrType(pub Vec<TypeRef>);

impl Type for OrType {
    fn name(&self) -> String {
        self.0
            .iter()
            .map(|ty| ty.name())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn matches(&self, value: &Value, heap: &Heap) -> MatchResult {
        if self.0.iter().any(|ty| ty.matches(value, heap).is_ok()) {
            Ok(())
        } else {
            Err(TypeMismatch::new(self.name()))
        }
    }
}

/// Object with the listed fields, looked up along the proto chain.
#[derive(Debug)]
pub struct ObjectOfType(pub Vec<(FieldKey, TypeRef)>);

impl Type for ObjectOfType {
    fn name(&self) -> String {
        let fields = self
            .0
            .iter()
            .map(|(key, ty)| format!("{key}: {}", ty.name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{ {fields} }}")
    }

    fn matches(&self, value: &Value, heap: &Heap) -> MatchResult {
        let Value::Object(id) = value else {
            return Err(TypeMismatch::new(self.name()));
        };
        for (key, ty) in &self.0 {
            let field = heap.get_field(*id, key);
            ty.matches(&field.value, heap)
                .map_err(|mismatch| mismatch.prefixed(key))?;
        }
        Ok(())
    }
}

/// Object exposing a numeric `length` and that many indexed elements.
#[derive(Debug)]
pub struct ListOfType(pub TypeRef);

impl Type for ListOfType {
    fn name(&self) -> String {
        format!("list<{}>", self.0.name())
    }

    fn matches(&self, value: &Value, heap: &Heap) -> MatchResult {
        let Value::Object(id) = value else {
            return Err(TypeMismatch::new(self.name()));
        };
        if matches!(heap.get(*id).kind, ObjectKind::Function { .. } | ObjectKind::Native { .. }) {
            return Err(TypeMismatch::new(self.name()));
        }
        let length = match heap.get_field(*id, &FieldKey::name("length")).value {
            Value::Number(length) if length >= 0.0 && length.fract() == 0.0 => length as usize,
            _ => return Err(TypeMismatch::new(self.name()).prefixed("length")),
        };
        // Unstored indices all read as null, so the first gap stands in for the rest.
        let mut indices: Vec<usize> = heap
            .visible_keys(value)
            .into_iter()
            .filter_map(|key| match key {
                FieldKey::Index(index) if index < length => Some(index),
                _ => None,
            })
            .collect();
        indices.sort_unstable();
        let first_gap = indices
            .iter()
            .enumerate()
            .find(|(position, index)| position != *index)
            .map_or(indices.len(), |(position, _)| position);
        if first_gap < length {
            indices.insert(first_gap, first_gap);
        }
        for index in indices {
            let element = heap.get_field(*id, &FieldKey::Index(index));
            self.0
                .matches(&element.value, heap)
                .map_err(|mismatch| mismatch.prefixed(index))?;
        }
        Ok(())
    }
}

pub fn any() -> TypeRef {
    Rc::new(PrimitiveType(Primitive::Any))
}

pub fn null() -> TypeRef {
    Rc::new(PrimitiveType(Primitive::Null))
}

pub fn number() -> TypeRef {
    Rc::new(PrimitiveType(Primitive::Number))
}

pub fn string() -> TypeRef {
    Rc::new(PrimitiveType(Primitive::String))
}

pub fn boolean() -> TypeRef {
    Rc::new(PrimitiveType(Primitive::Boolean))
}

pub fn function() -> TypeRef {
    Rc::new(PrimitiveType(Primitive::Function))
}

pub fn object() -> TypeRef {
    Rc::new(PrimitiveType(Primitive::Object))
}

pub fn or(alternatives: Vec<TypeRef>) -> TypeRef {
    Rc::new(OrType(alternatives))
}

pub fn optional(ty: TypeRef) -> TypeRef {
    or(vec![ty, null()])
}

pub fn object_of(fields: Vec<(FieldKey, TypeRef)>) -> TypeRef {
    Rc::new(ObjectOfType(fields))
}

pub fn list_of(element: TypeRef) -> TypeRef {
    Rc::new(ListOfType(element))
}
