//! Native objects living inside script-managed storage.
//!
//! A foreign object is a [`ForeignCell`]: a [`TypeId`] header followed by a
//! [`Foreign`] that either owns the native value or borrows one owned by
//! the host. The runtime only sees opaque bytes; it calls the class's
//! finalizer ([`finalize`]) when it reclaims them, which drops an owned
//! value exactly once and leaves a borrowed one alone.
//!
//! ```text
//! script storage ──► ┌──────────┬────────────────────────────┐
//!                    │ TypeId   │ Owned(T) | Borrowed(*T)    │
//!                    └──────────┴────────────────────────────┘
//! ```
//!
//! Every read checks the header against the id of the requested type.

use std::alloc::Layout;
use std::any::type_name;
use std::ffi::c_void;
use std::ptr::{self, NonNull};

use crate::core::error::{contract_violation, ContractError};
use crate::ffi::type_id::{TypeId, TypeNameBinding, TypeRegistry};
use crate::runtime::Runtime;
use crate::types::enums::SlotType;

/// Capability shared by both storage variants.
pub trait ForeignObject {
    fn type_id(&self) -> TypeId;

    /// Address of the native object, whichever variant holds it.
    fn object_ptr(&self) -> NonNull<()>;
}

/// Ownership of the native object inside a cell.
pub enum Foreign<T> {
    /// Constructed in place; dropped when the runtime finalizes the cell.
    Owned(T),
    /// Owned by the host; the cell never drops the pointee.
    Borrowed(NonNull<T>),
}

#[repr(C)]
pub struct ForeignCell<T> {
    type_id: TypeId,
    object: Foreign<T>,
}

impl<T: 'static> ForeignCell<T> {
    pub fn owned(type_id: TypeId, value: T) -> Self {
        Self {
            type_id,
            object: Foreign::Owned(value),
        }
    }

    pub fn borrowed(type_id: TypeId, ptr: NonNull<T>) -> Self {
        Self {
            type_id,
            object: Foreign::Borrowed(ptr),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.object, Foreign::Owned(_))
    }

    pub fn object(&self) -> &Foreign<T> {
        &self.object
    }

    pub const fn layout() -> Layout {
        Layout::new::<Self>()
    }
}

impl<T: 'static> ForeignObject for ForeignCell<T> {
    fn type_id(&self) -> TypeId {
        self.type_id
    }

    fn object_ptr(&self) -> NonNull<()> {
        match &self.object {
            Foreign::Owned(value) => NonNull::from(value).cast(),
            Foreign::Borrowed(ptr) => ptr.cast(),
        }
    }
}

/// Reads the type id at the start of foreign storage.
///
/// # Safety
///
/// `data` must point to an initialized [`ForeignCell`] of any type.
pub unsafe fn header_type_id(data: NonNull<u8>) -> TypeId {
    unsafe { data.cast::<TypeId>().read() }
}

/// Returns the native object inside foreign storage, aborting if the cell
/// holds a type other than `T`.
///
/// # Safety
///
/// `data` must point to an initialized [`ForeignCell`] that is still alive.
pub unsafe fn downcast<T: 'static>(data: NonNull<u8>) -> NonNull<T> {
    unsafe { try_downcast::<T>(data) }.unwrap_or_else(|err| contract_violation(err))
}

/// Returns the native object inside foreign storage after checking its type.
///
/// # Safety
///
/// `data` must point to an initialized [`ForeignCell`] that is still alive.
pub unsafe fn try_downcast<T: 'static>(data: NonNull<u8>) -> Result<NonNull<T>, ContractError> {
    let actual = unsafe { header_type_id(data) };
    let (expected, actual_name) = {
        let registry = TypeRegistry::global();
        (registry.find::<T>(), registry.rust_name(actual))
    };
    if expected != Some(actual) {
        return Err(ContractError::TypeMismatch {
            expected: type_name::<T>(),
            found: format!("{} ({actual})", actual_name.unwrap_or("<unknown>")),
        });
    }

    let cell = data.cast::<ForeignCell<T>>().as_ptr();
    Ok(match unsafe { &mut (*cell).object } {
        Foreign::Owned(value) => NonNull::from(value),
        Foreign::Borrowed(ptr) => *ptr,
    })
}

/// Type-checked pointer to the foreign object in `slot`, aborting if the
/// slot does not hold a foreign object of type `T`.
pub fn get_slot_foreign<R: Runtime, T: 'static>(vm: &mut R, slot: usize) -> NonNull<T> {
    try_get_slot_foreign::<R, T>(vm, slot).unwrap_or_else(|err| contract_violation(err))
}

pub fn try_get_slot_foreign<R: Runtime, T: 'static>(
    vm: &mut R,
    slot: usize,
) -> Result<NonNull<T>, ContractError> {
    let kind = vm.slot_type(slot);
    if kind != SlotType::Foreign {
        return Err(ContractError::NotForeign {
            slot,
            found: kind,
            expected: type_name::<T>(),
        });
    }
    let data = vm.get_slot_foreign(slot);
    unsafe { try_downcast::<T>(data) }
}

/// Stores a new instance of `T`'s script class in `slot`, owning `value`.
pub fn set_slot_foreign_value<R: Runtime, T: 'static>(vm: &mut R, slot: usize, value: T) {
    let (type_id, names) = bound_class::<T>();
    let data = new_foreign_in_slot::<R, T>(vm, slot, &names);
    unsafe { data.write(ForeignCell::owned(type_id, value)) };
}

/// Stores a new instance of `T`'s script class in `slot`, borrowing `ptr`.
///
/// The host keeps ownership; the pointee must outlive every script use of
/// the instance.
pub fn set_slot_foreign_ptr<R: Runtime, T: 'static>(vm: &mut R, slot: usize, ptr: NonNull<T>) {
    let (type_id, names) = bound_class::<T>();
    let data = new_foreign_in_slot::<R, T>(vm, slot, &names);
    unsafe { data.write(ForeignCell::borrowed(type_id, ptr)) };
}

/// Constructs the instance for a class allocator: the class is already in
/// slot 0 and the new object replaces it.
pub(crate) fn emplace_in_receiver<R: Runtime, T: 'static>(vm: &mut R, value: T) {
    let (type_id, _) = bound_class::<T>();
    let data = vm
        .set_slot_new_foreign(0, 0, ForeignCell::<T>::layout())
        .cast::<ForeignCell<T>>();
    unsafe { data.write(ForeignCell::owned(type_id, value)) };
}

/// Finalizer registered for every foreign class bound to `T`.
///
/// # Safety
///
/// `data` must be the storage of a [`ForeignCell<T>`] that is not used again.
pub unsafe extern "C" fn finalize<T: 'static>(data: *mut c_void) {
    if let Some(cell) = NonNull::new(data.cast::<ForeignCell<T>>()) {
        unsafe { ptr::drop_in_place(cell.as_ptr()) };
    }
}

fn bound_class<T: 'static>() -> (TypeId, TypeNameBinding) {
    let bound = {
        let registry = TypeRegistry::global();
        (registry.find::<T>(), registry.try_name_of::<T>().cloned())
    };
    match bound {
        (Some(id), Some(names)) => (id, names),
        _ => contract_violation(ContractError::Unbound {
            rust: type_name::<T>(),
        }),
    }
}

fn new_foreign_in_slot<R: Runtime, T: 'static>(
    vm: &mut R,
    slot: usize,
    names: &TypeNameBinding,
) -> NonNull<ForeignCell<T>> {
    vm.ensure_slots(slot + 1);
    vm.get_variable(&names.module, &names.class, slot);
    vm.set_slot_new_foreign(slot, slot, ForeignCell::<T>::layout())
        .cast()
}
