//! The fixed slot-level API a script runtime exposes to native code.
//!
//! [`Runtime`] is implemented by the view type a backend hands to foreign
//! methods. Every adapter receives `*mut R` and reborrows it for the
//! duration of the call, so implementors are only ever used through
//! `&mut self` obtained from that pointer.

use std::alloc::Layout;
use std::borrow::Cow;
use std::fmt;
use std::ptr::NonNull;

use crate::core::state::HostState;
use crate::types::enums::{InterpretResult, SlotType};

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "wren")]
pub mod wren;

pub trait Runtime: Sized + 'static {
    /// Persistent reference to a script value or a compiled call signature.
    type Handle: Copy + PartialEq + fmt::Debug;

    /// Creates a runtime whose callbacks resolve through `host`.
    ///
    /// `host` outlives the runtime: it is freed only after
    /// [`destroy`](Runtime::destroy) returns.
    fn create(host: NonNull<HostState<Self>>) -> Option<NonNull<Self>>;

    /// Frees the runtime, finalizing every foreign object it still holds.
    ///
    /// # Safety
    ///
    /// `vm` must come from [`create`](Runtime::create) and must not be used
    /// afterwards.
    unsafe fn destroy(vm: NonNull<Self>);

    // ========== SLOTS ==========

    /// Grows the slot array to at least `count` slots.
    fn ensure_slots(&mut self, count: usize);

    fn slot_count(&mut self) -> usize;

    fn slot_type(&mut self, slot: usize) -> SlotType;

    fn get_slot_bool(&mut self, slot: usize) -> bool;

    fn set_slot_bool(&mut self, slot: usize, value: bool);

    fn get_slot_double(&mut self, slot: usize) -> f64;

    fn set_slot_double(&mut self, slot: usize, value: f64);

    fn get_slot_string(&mut self, slot: usize) -> Cow<'_, str>;

    fn set_slot_string(&mut self, slot: usize, value: &str);

    fn set_slot_null(&mut self, slot: usize);

    /// Creates a persistent handle to the value in `slot`.
    ///
    /// The handle must be given back through
    /// [`release_handle`](Runtime::release_handle).
    fn get_slot_handle(&mut self, slot: usize) -> Self::Handle;

    fn set_slot_handle(&mut self, slot: usize, handle: Self::Handle);

    /// Raw bytes of the foreign object in `slot`.
    fn get_slot_foreign(&mut self, slot: usize) -> NonNull<u8>;

    /// Allocates script-managed storage for a new instance of the foreign
    /// class held in `class_slot` and stores the instance in `slot`.
    ///
    /// The returned storage is uninitialized.
    fn set_slot_new_foreign(&mut self, slot: usize, class_slot: usize, layout: Layout)
    -> NonNull<u8>;

    // ========== VARIABLES AND HANDLES ==========

    /// Loads a top-level variable of `module` into `slot`.
    fn get_variable(&mut self, module: &str, name: &str, slot: usize);

    fn has_variable(&mut self, module: &str, name: &str) -> bool;

    /// Compiles a call signature such as `add(_,_)`.
    fn make_call_handle(&mut self, signature: &str) -> Self::Handle;

    /// Invokes `method` on the receiver in slot 0 with arguments in the
    /// following slots. On success the result is in slot 0.
    fn call(&mut self, method: Self::Handle) -> InterpretResult;

    fn release_handle(&mut self, handle: Self::Handle);

    // ========== EXECUTION ==========

    fn interpret(&mut self, module: &str, source: &str) -> InterpretResult;

    fn collect_garbage(&mut self);
}
