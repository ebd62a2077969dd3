//! Conversion traits between Rust values and VM slots.
//!
//! - [`FromSlot`]: read a Rust value out of a slot
//! - [`IntoSlot`]: write a Rust value into a slot
//! - [`FieldSlot`]: how a generated getter exposes a field
//!
//! ## Supported Types
//!
//! - Numbers: `i8`..`i64`, `isize`, `u8`..`u64`, `usize`, `f32`, `f64`.
//!   Wren has a single `double` number type, so every numeric value is
//!   widened to `f64` on the way in and converted with `as` on the way out.
//!   Integers beyond 2^53 lose precision and out-of-range reads saturate.
//! - `bool`, `String`, `&str`, `CString`, `&CStr`
//! - [`Handle`]: passed through unchanged
//! - [`ForeignClass`] types: by value (a copy owned by the script object),
//!   or as `NonNull<T>` / `*mut T` / `*const T` (borrowed, never dropped by
//!   the script)
//! - `()`: writing it leaves the slot untouched
//!
//! ## Example
//!
//! ```ignore
//! 42u32.into_slot(vm, 1);
//! let back = u32::from_slot(vm, 1);
//! ```

use std::ffi::{CStr, CString};
use std::ptr::NonNull;

use crate::ffi::foreign::{get_slot_foreign, set_slot_foreign_ptr, set_slot_foreign_value};
use crate::ffi::traits::{ForeignClass, Handle};
use crate::runtime::Runtime;

/// Extract a value from a slot.
pub trait FromSlot<R: Runtime>: Sized {
    fn from_slot(vm: &mut R, slot: usize) -> Self;
}

/// Store a value into a slot.
pub trait IntoSlot<R: Runtime> {
    fn into_slot(self, vm: &mut R, slot: usize);
}

/// Exposes a field of a foreign object through a getter.
///
/// Plain values are copied into the slot. Fields of a [`ForeignClass`] type
/// are exposed as a borrowed pointer into the owning object, so script code
/// sees the live field rather than a snapshot.
pub trait FieldSlot<R: Runtime> {
    fn field_into_slot(field: &mut Self, vm: &mut R, slot: usize);
}

// ============================================================================
// Numbers
// ============================================================================

macro_rules! impl_numeric_slot {
    ($($ty:ty),*) => {
        $(
            impl<R: Runtime> FromSlot<R> for $ty {
                #[inline]
                fn from_slot(vm: &mut R, slot: usize) -> Self {
                    vm.get_slot_double(slot) as $ty
                }
            }

            impl<R: Runtime> IntoSlot<R> for $ty {
                #[inline]
                fn into_slot(self, vm: &mut R, slot: usize) {
                    vm.set_slot_double(slot, self as f64);
                }
            }

            impl<R: Runtime> FieldSlot<R> for $ty {
                #[inline]
                fn field_into_slot(field: &mut Self, vm: &mut R, slot: usize) {
                    (*field).into_slot(vm, slot);
                }
            }
        )*
    };
}

impl_numeric_slot!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// ============================================================================
// Booleans, unit and strings
// ============================================================================

impl<R: Runtime> FromSlot<R> for bool {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        vm.get_slot_bool(slot)
    }
}

impl<R: Runtime> IntoSlot<R> for bool {
    fn into_slot(self, vm: &mut R, slot: usize) {
        vm.set_slot_bool(slot, self);
    }
}

impl<R: Runtime> FieldSlot<R> for bool {
    fn field_into_slot(field: &mut Self, vm: &mut R, slot: usize) {
        vm.set_slot_bool(slot, *field);
    }
}

impl<R: Runtime> IntoSlot<R> for () {
    #[inline]
    fn into_slot(self, _vm: &mut R, _slot: usize) {}
}

impl<R: Runtime> FromSlot<R> for String {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        vm.get_slot_string(slot).into_owned()
    }
}

impl<R: Runtime> IntoSlot<R> for String {
    fn into_slot(self, vm: &mut R, slot: usize) {
        vm.set_slot_string(slot, &self);
    }
}

impl<R: Runtime> IntoSlot<R> for &String {
    fn into_slot(self, vm: &mut R, slot: usize) {
        vm.set_slot_string(slot, self);
    }
}

impl<R: Runtime> IntoSlot<R> for &str {
    fn into_slot(self, vm: &mut R, slot: usize) {
        vm.set_slot_string(slot, self);
    }
}

impl<R: Runtime> FieldSlot<R> for String {
    fn field_into_slot(field: &mut Self, vm: &mut R, slot: usize) {
        vm.set_slot_string(slot, field);
    }
}

/// C strings end at the first NUL, as they do for `wrenGetSlotString`.
impl<R: Runtime> FromSlot<R> for CString {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        let text = vm.get_slot_string(slot);
        let head = text.split('\0').next().unwrap_or_default();
        CString::new(head).unwrap_or_default()
    }
}

impl<R: Runtime> IntoSlot<R> for CString {
    fn into_slot(self, vm: &mut R, slot: usize) {
        self.as_c_str().into_slot(vm, slot);
    }
}

impl<R: Runtime> IntoSlot<R> for &CStr {
    fn into_slot(self, vm: &mut R, slot: usize) {
        vm.set_slot_string(slot, &self.to_string_lossy());
    }
}

// ============================================================================
// Handles
// ============================================================================

impl<R: Runtime> FromSlot<R> for Handle<R> {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        Handle::from_raw(vm.get_slot_handle(slot))
    }
}

impl<R: Runtime> IntoSlot<R> for Handle<R> {
    fn into_slot(self, vm: &mut R, slot: usize) {
        vm.set_slot_handle(slot, self.raw());
    }
}

// ============================================================================
// Foreign classes
// ============================================================================

impl<R: Runtime, T: ForeignClass + Clone> FromSlot<R> for T {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        let ptr = get_slot_foreign::<R, T>(vm, slot);
        unsafe { ptr.as_ref() }.clone()
    }
}

impl<R: Runtime, T: ForeignClass> IntoSlot<R> for T {
    fn into_slot(self, vm: &mut R, slot: usize) {
        set_slot_foreign_value(vm, slot, self);
    }
}

impl<R: Runtime, T: ForeignClass> FieldSlot<R> for T {
    fn field_into_slot(field: &mut Self, vm: &mut R, slot: usize) {
        set_slot_foreign_ptr(vm, slot, NonNull::from(field));
    }
}

impl<R: Runtime, T: ForeignClass> FromSlot<R> for NonNull<T> {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        get_slot_foreign::<R, T>(vm, slot)
    }
}

impl<R: Runtime, T: ForeignClass> IntoSlot<R> for NonNull<T> {
    fn into_slot(self, vm: &mut R, slot: usize) {
        set_slot_foreign_ptr(vm, slot, self);
    }
}

impl<R: Runtime, T: ForeignClass> FromSlot<R> for *mut T {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        get_slot_foreign::<R, T>(vm, slot).as_ptr()
    }
}

/// A null pointer becomes script `null`.
impl<R: Runtime, T: ForeignClass> IntoSlot<R> for *mut T {
    fn into_slot(self, vm: &mut R, slot: usize) {
        match NonNull::new(self) {
            Some(ptr) => set_slot_foreign_ptr(vm, slot, ptr),
            None => vm.set_slot_null(slot),
        }
    }
}

impl<R: Runtime, T: ForeignClass> FromSlot<R> for *const T {
    fn from_slot(vm: &mut R, slot: usize) -> Self {
        get_slot_foreign::<R, T>(vm, slot).as_ptr().cast_const()
    }
}

impl<R: Runtime, T: ForeignClass> IntoSlot<R> for *const T {
    fn into_slot(self, vm: &mut R, slot: usize) {
        self.cast_mut().into_slot(vm, slot);
    }
}
