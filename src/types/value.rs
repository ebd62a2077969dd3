use std::ptr::NonNull;

use crate::ffi::foreign::downcast;
use crate::runtime::Runtime;
use crate::types::enums::SlotType;

/// A script value boxed out of a slot, typically the result of
/// [`Method::call`](crate::core::method::Method::call).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    /// Copied out of the slot into a Rust `String`. The copy is allocated by
    /// the global allocator, not by the reallocator given to
    /// [`Config::with_reallocate`](crate::types::callbacks::Config::with_reallocate).
    String(String),
    /// Storage of a foreign object. The value does not keep the object
    /// alive; it is only valid while the script still references it.
    Foreign(NonNull<u8>),
}

impl Value {
    pub const NULL: Value = Value::Null;

    /// Boxes the value in `slot`. Lists, maps and other script objects have
    /// no native counterpart and become [`Value::Null`].
    pub fn from_slot<R: Runtime>(vm: &mut R, slot: usize) -> Self {
        match vm.slot_type(slot) {
            SlotType::Bool => Value::Bool(vm.get_slot_bool(slot)),
            SlotType::Num => Value::Number(vm.get_slot_double(slot)),
            SlotType::String => Value::String(vm.get_slot_string(slot).into_owned()),
            SlotType::Foreign => Value::Foreign(vm.get_slot_foreign(slot)),
            SlotType::List | SlotType::Map | SlotType::Null | SlotType::Unknown => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|n| n as f32)
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_f64().map(|n| n as i32)
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_f64().map(|n| n as u32)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Type-checked pointer to the native object behind a foreign value.
    ///
    /// # Safety
    ///
    /// The foreign object must not have been reclaimed by the runtime since
    /// this value was boxed. Aborts if the object is not a `T`.
    pub unsafe fn as_foreign<T: 'static>(&self) -> Option<NonNull<T>> {
        match self {
            Value::Foreign(data) => Some(unsafe { downcast::<T>(*data) }),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
