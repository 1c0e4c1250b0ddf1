//! Arena-backed object graph.
//!
//! Objects live in a single [`Heap`] and refer to each other by [`ObjectId`],
//! so proto chains and scopes may form arbitrary graphs without reference
//! cycles. Scopes are ordinary objects whose proto is the enclosing scope.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::FieldKey,
    error::RuntimeErrorKind,
    executable::{ExecFunction, ExecNativeFunction},
    value::{LabeledValue, Value},
};

/// Reserved key holding the proto link.
pub const PROTO: &str = "proto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Plain,
    /// Language function closing over the scope it was created in.
    Function {
        function: Rc<ExecFunction>,
        scope: ObjectId,
    },
    Native {
        function: Rc<ExecNativeFunction>,
        scope: ObjectId,
    },
}

#[derive(Debug, Clone)]
pub struct HeapObject {
    pub kind: ObjectKind,
    pub fields: IndexMap<FieldKey, LabeledValue>,
    pub proto: Option<ObjectId>,
}

impl HeapObject {
    fn new(kind: ObjectKind, proto: Option<ObjectId>) -> Self {
        Self {
            kind,
            fields: IndexMap::new(),
            proto,
        }
    }

    pub fn is_callable(&self) -> bool {
        !matches!(self.kind, ObjectKind::Plain)
    }
}

/// Builtin protos every heap starts with.
#[derive(Debug, Clone, Copy)]
pub struct Protos {
    pub object: ObjectId,
    pub function: ObjectId,
    pub number: ObjectId,
    pub string: ObjectId,
    pub boolean: ObjectId,
}

type FieldResult<T> = Result<T, RuntimeErrorKind>;

#[derive(Debug)]
pub struct Heap {
    objects: Vec<HeapObject>,
    protos: Protos,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        let object = ObjectId(0);
        let mut objects = vec![HeapObject::new(ObjectKind::Plain, None)];
        for _ in 0..4 {
            objects.push(HeapObject::new(ObjectKind::Plain, Some(object)));
        }
        Self {
            objects,
            protos: Protos {
                object,
                function: ObjectId(1),
                number: ObjectId(2),
                string: ObjectId(3),
                boolean: ObjectId(4),
            },
        }
    }

    pub fn protos(&self) -> Protos {
        self.protos
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn alloc(&mut self, proto: Option<ObjectId>) -> ObjectId {
        self.alloc_kind(ObjectKind::Plain, proto)
    }

    /// Allocates a plain object inheriting from `objectProto`.
    pub fn alloc_object(&mut self) -> ObjectId {
        self.alloc(Some(self.protos.object))
    }

    pub fn alloc_function(&mut self, function: Rc<ExecFunction>, scope: ObjectId) -> ObjectId {
        let proto = Some(self.protos.function);
        self.alloc_kind(ObjectKind::Function { function, scope }, proto)
    }

    pub fn alloc_native(&mut self, function: Rc<ExecNativeFunction>, scope: ObjectId) -> ObjectId {
        let proto = Some(self.protos.function);
        self.alloc_kind(ObjectKind::Native { function, scope }, proto)
    }

    fn alloc_kind(&mut self, kind: ObjectKind, proto: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(HeapObject::new(kind, proto));
        id
    }

    pub fn get(&self, id: ObjectId) -> &HeapObject {
        &self.objects[id.0]
    }

    fn get_mut(&mut self, id: ObjectId) -> &mut HeapObject {
        &mut self.objects[id.0]
    }

    pub fn proto_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(id).proto
    }

    /// Proto that field access on `value` starts from, `None` for null.
    pub fn proto_of_value(&self, value: &Value) -> Option<ObjectId> {
        match value {
            Value::Null => None,
            Value::Number(_) => Some(self.protos.number),
            Value::String(_) => Some(self.protos.string),
            Value::Boolean(_) => Some(self.protos.boolean),
            Value::Object(id) => self.proto_of(*id),
        }
    }

    pub fn is_callable(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|id| self.get(id).is_callable())
    }

    /// Own field of `id` without consulting the proto chain.
    pub fn get_local_field(&self, id: ObjectId, key: &FieldKey) -> LabeledValue {
        if key.is(PROTO) {
            return self.proto_value(id);
        }
        self.get(id).fields.get(key).cloned().unwrap_or_default()
    }

    /// Field lookup along the proto chain.
    pub fn get_field(&self, id: ObjectId, key: &FieldKey) -> LabeledValue {
        if key.is(PROTO) {
            return self.proto_value(id);
        }
        let mut current = Some(id);
        while let Some(object_id) = current {
            let object = self.get(object_id);
            if let Some(value) = object.fields.get(key) {
                return value.clone();
            }
            current = object.proto;
        }
        LabeledValue::null()
    }

    fn proto_value(&self, id: ObjectId) -> LabeledValue {
        match self.proto_of(id) {
            Some(proto) => LabeledValue::new(proto),
            None => LabeledValue::null(),
        }
    }

    /// Overwrites `key` at the chain level that already holds it, otherwise defines it on `id`.
    pub fn set_field(&mut self, id: ObjectId, key: FieldKey, value: LabeledValue) -> FieldResult<()> {
        if key.is(PROTO) {
            return self.set_proto(id, &value.value);
        }
        let owner = self.find_owner(id, &key).unwrap_or(id);
        self.write_own(owner, key, value);
        Ok(())
    }

    /// Defines or overwrites `key` directly on `id`.
    pub fn set_local_field(&mut self, id: ObjectId, key: FieldKey, value: LabeledValue) -> FieldResult<()> {
        if key.is(PROTO) {
            return self.set_proto(id, &value.value);
        }
        self.write_own(id, key, value);
        Ok(())
    }

    /// Binds an ordinary name on `id`; reserved bindings such as `this` and `args` go through here.
    pub fn define(&mut self, id: ObjectId, name: &str, value: LabeledValue) {
        debug_assert_ne!(name, PROTO);
        self.write_own(id, FieldKey::name(name), value);
    }

    fn find_owner(&self, id: ObjectId, key: &FieldKey) -> Option<ObjectId> {
        let mut current = Some(id);
        while let Some(object_id) = current {
            let object = self.get(object_id);
            if object.fields.contains_key(key) {
                return Some(object_id);
            }
            current = object.proto;
        }
        None
    }

    fn write_own(&mut self, id: ObjectId, key: FieldKey, value: LabeledValue) {
        let fields = &mut self.get_mut(id).fields;
        if value.value.is_null() {
            fields.shift_remove(&key);
        } else {
            fields.insert(key, value);
        }
    }

    /// Replaces the proto of `id`, restoring the previous link if the new one closes a loop.
    pub fn set_proto(&mut self, id: ObjectId, value: &Value) -> FieldResult<()> {
        let proto = match value {
            Value::Null => None,
            Value::Object(proto) => Some(*proto),
            _ => return Err(RuntimeErrorKind::InvalidProto),
        };
        let previous = std::mem::replace(&mut self.get_mut(id).proto, proto);
        if self.has_proto_loop(id) {
            self.get_mut(id).proto = previous;
            return Err(RuntimeErrorKind::ProtoLoop);
        }
        Ok(())
    }

    fn has_proto_loop(&self, id: ObjectId) -> bool {
        let mut current = self.proto_of(id);
        let mut steps = 0usize;
        while let Some(object_id) = current {
            if object_id == id || steps > self.objects.len() {
                return true;
            }
            steps += 1;
            current = self.proto_of(object_id);
        }
        false
    }

    /// Field read on any value; simple values read through their proto.
    pub fn get_value_field(&self, value: &Value, key: &FieldKey) -> FieldResult<LabeledValue> {
        match value {
            Value::Null => Err(RuntimeErrorKind::NullAccess),
            Value::Object(id) => Ok(self.get_field(*id, key)),
            simple => {
                let proto = self.simple_proto(simple)?;
                if key.is(PROTO) {
                    Ok(LabeledValue::new(proto))
                } else {
                    Ok(self.get_field(proto, key))
                }
            }
        }
    }

    pub fn get_value_local_field(&self, value: &Value, key: &FieldKey) -> FieldResult<LabeledValue> {
        match value {
            Value::Null => Err(RuntimeErrorKind::NullAccess),
            Value::Object(id) => Ok(self.get_local_field(*id, key)),
            simple => {
                let proto = self.simple_proto(simple)?;
                if key.is(PROTO) {
                    Ok(LabeledValue::new(proto))
                } else {
                    Ok(self.get_local_field(proto, key))
                }
            }
        }
    }

    /// Field write on any value. `local` selects [`Heap::set_local_field`] semantics.
    pub fn set_value_field(
        &mut self,
        target: &Value,
        key: FieldKey,
        value: LabeledValue,
        local: bool,
    ) -> FieldResult<()> {
        let id = match target {
            Value::Null => return Err(RuntimeErrorKind::NullAccess),
            Value::Object(id) => *id,
            simple => {
                if key.is(PROTO) {
                    return Err(RuntimeErrorKind::SimpleProto);
                }
                self.simple_proto(simple)?
            }
        };
        if local {
            self.set_local_field(id, key, value)
        } else {
            self.set_field(id, key, value)
        }
    }

    fn simple_proto(&self, value: &Value) -> FieldResult<ObjectId> {
        self.proto_of_value(value).ok_or(RuntimeErrorKind::NullAccess)
    }

    /// Own fields of `id` in insertion order.
    pub fn own_entries(&self, id: ObjectId) -> Vec<(FieldKey, LabeledValue)> {
        self.get(id)
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Every key visible on `value`, nearest level first, without duplicates.
    pub fn visible_keys(&self, value: &Value) -> Vec<FieldKey> {
        let mut keys: Vec<FieldKey> = Vec::new();
        let mut current = match value {
            Value::Object(id) => Some(*id),
            other => self.proto_of_value(other),
        };
        let mut steps = 0usize;
        while let Some(id) = current {
            for key in self.get(id).fields.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
            steps += 1;
            if steps > self.objects.len() {
                break;
            }
            current = self.proto_of(id);
        }
        keys
    }

    /// Text used when a value is printed or concatenated.
    pub fn display(&self, value: &Value) -> String {
        match value {
            Value::Object(id) if self.get(*id).is_callable() => "[function]".to_string(),
            other => other.to_string(),
        }
    }
}

