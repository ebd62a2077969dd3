//! Marker traits and handle types shared by the conversion layer.

use std::fmt;

use crate::runtime::Runtime;

/// A native type that scripts see as a foreign class.
///
/// Implementing it routes by-value and pointer conversions of the type
/// through the foreign object model. The type must also be bound with
/// `bind_class` before any value of it crosses into a slot.
///
/// Every foreign object read back from a slot is assumed to have been
/// created by this crate. Foreign classes built into the runtime itself,
/// such as `Random` from Wren's optional random module, carry no type
/// header; the bundled build disables that module.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// struct Point { x: f64, y: f64 }
/// impl ForeignClass for Point {}
/// ```
pub trait ForeignClass: 'static {}

/// A persistent runtime handle held by native code.
///
/// Passes through slot conversions unchanged. Handles read from a slot are
/// owned by the caller and must be released with
/// [`Handle::release`], or handed to a [`Method`](crate::core::method::Method)
/// which releases them on drop.
pub struct Handle<R: Runtime> {
    raw: R::Handle,
}

impl<R: Runtime> Handle<R> {
    pub fn from_raw(raw: R::Handle) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> R::Handle {
        self.raw
    }

    pub fn release(self, vm: &mut R) {
        vm.release_handle(self.raw);
    }
}

impl<R: Runtime> Clone for Handle<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Runtime> Copy for Handle<R> {}

impl<R: Runtime> PartialEq for Handle<R> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<R: Runtime> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.raw).finish()
    }
}
