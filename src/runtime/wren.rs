//! [`Runtime`] over the Wren C API.
//!
//! The `WrenVM*` handed to foreign methods is used directly as the runtime
//! view, so a [`ForeignMethodFn<WrenVM>`](crate::ffi::native_fn::ForeignMethodFn)
//! is exactly a `WrenForeignMethodFn`. Runtime callbacks find the
//! [`HostState`] through the VM's user data.
//!
//! C enums are unsigned on some targets and signed on others, so their raw
//! values are widened with `as i32` before conversion.

use std::alloc::Layout;
use std::borrow::Cow;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};
use std::slice;

use wrenbind_sys as sys;
pub use wrenbind_sys::{WrenHandle, WrenVM};

use crate::core::error::contract_violation;
use crate::core::state::HostState;
use crate::runtime::Runtime;
use crate::types::enums::{ErrorType, InterpretResult, SlotType};

/// Foreign object storage is aligned like a pointer.
const MAX_FOREIGN_ALIGN: usize = mem::align_of::<usize>();

impl Runtime for WrenVM {
    type Handle = NonNull<WrenHandle>;

    fn create(host: NonNull<HostState<Self>>) -> Option<NonNull<Self>> {
        let state = unsafe { host.as_ref() };
        let mut config = MaybeUninit::<sys::WrenConfiguration>::uninit();
        let mut config = unsafe {
            sys::wrenInitConfiguration(config.as_mut_ptr());
            config.assume_init()
        };

        if state.reallocate().is_some() {
            config.reallocateFn = Some(reallocate);
        }
        config.loadModuleFn = Some(load_module);
        config.bindForeignMethodFn = Some(bind_foreign_method);
        config.bindForeignClassFn = Some(bind_foreign_class);
        config.writeFn = Some(write);
        config.errorFn = Some(report_error);
        config.initialHeapSize = state.config().initial_heap_size;
        config.minHeapSize = state.config().min_heap_size;
        config.heapGrowthPercent = state.config().heap_growth_percent;
        config.userData = host.as_ptr().cast();

        let vm = NonNull::new(unsafe { sys::wrenNewVM(&mut config) });
        if vm.is_none() {
            log::error!("wrenNewVM returned null");
        }
        vm
    }

    unsafe fn destroy(vm: NonNull<Self>) {
        unsafe { sys::wrenFreeVM(vm.as_ptr()) };
    }

    fn ensure_slots(&mut self, count: usize) {
        unsafe { sys::wrenEnsureSlots(self, slot_index(count)) };
    }

    fn slot_count(&mut self) -> usize {
        unsafe { sys::wrenGetSlotCount(self) as usize }
    }

    fn slot_type(&mut self, slot: usize) -> SlotType {
        SlotType::from(unsafe { sys::wrenGetSlotType(self, slot_index(slot)) } as i32)
    }

    fn get_slot_bool(&mut self, slot: usize) -> bool {
        unsafe { sys::wrenGetSlotBool(self, slot_index(slot)) }
    }

    fn set_slot_bool(&mut self, slot: usize, value: bool) {
        unsafe { sys::wrenSetSlotBool(self, slot_index(slot), value) };
    }

    fn get_slot_double(&mut self, slot: usize) -> f64 {
        unsafe { sys::wrenGetSlotDouble(self, slot_index(slot)) }
    }

    fn set_slot_double(&mut self, slot: usize, value: f64) {
        unsafe { sys::wrenSetSlotDouble(self, slot_index(slot), value) };
    }

    fn get_slot_string(&mut self, slot: usize) -> Cow<'_, str> {
        let mut length: c_int = 0;
        let bytes = unsafe { sys::wrenGetSlotBytes(self, slot_index(slot), &mut length) };
        if bytes.is_null() {
            return Cow::Borrowed("");
        }
        let bytes = unsafe { slice::from_raw_parts(bytes.cast::<u8>(), length as usize) };
        String::from_utf8_lossy(bytes)
    }

    fn set_slot_string(&mut self, slot: usize, value: &str) {
        unsafe {
            sys::wrenSetSlotBytes(self, slot_index(slot), value.as_ptr().cast(), value.len())
        };
    }

    fn set_slot_null(&mut self, slot: usize) {
        unsafe { sys::wrenSetSlotNull(self, slot_index(slot)) };
    }

    fn get_slot_handle(&mut self, slot: usize) -> NonNull<WrenHandle> {
        let handle = unsafe { sys::wrenGetSlotHandle(self, slot_index(slot)) };
        NonNull::new(handle).unwrap_or_else(|| contract_violation("wrenGetSlotHandle returned null"))
    }

    fn set_slot_handle(&mut self, slot: usize, handle: NonNull<WrenHandle>) {
        unsafe { sys::wrenSetSlotHandle(self, slot_index(slot), handle.as_ptr()) };
    }

    fn get_slot_foreign(&mut self, slot: usize) -> NonNull<u8> {
        let data = unsafe { sys::wrenGetSlotForeign(self, slot_index(slot)) };
        NonNull::new(data.cast())
            .unwrap_or_else(|| contract_violation(format_args!("slot {slot} has no foreign data")))
    }

    fn set_slot_new_foreign(
        &mut self,
        slot: usize,
        class_slot: usize,
        layout: Layout,
    ) -> NonNull<u8> {
        if layout.align() > MAX_FOREIGN_ALIGN {
            contract_violation(format_args!(
                "foreign objects are aligned to {MAX_FOREIGN_ALIGN} bytes, {} requested",
                layout.align()
            ));
        }
        let data = unsafe {
            sys::wrenSetSlotNewForeign(self, slot_index(slot), slot_index(class_slot), layout.size())
        };
        NonNull::new(data.cast()).unwrap_or_else(|| {
            contract_violation("wrenSetSlotNewForeign returned null")
        })
    }

    fn get_variable(&mut self, module: &str, name: &str, slot: usize) {
        if !self.has_variable(module, name) {
            contract_violation(format_args!("module '{module}' has no variable '{name}'"));
        }
        let module = c_string(module);
        let name = c_string(name);
        unsafe { sys::wrenGetVariable(self, module.as_ptr(), name.as_ptr(), slot_index(slot)) };
    }

    fn has_variable(&mut self, module: &str, name: &str) -> bool {
        let module = c_string(module);
        let name = c_string(name);
        unsafe {
            sys::wrenHasModule(self, module.as_ptr())
                && sys::wrenHasVariable(self, module.as_ptr(), name.as_ptr())
        }
    }

    fn make_call_handle(&mut self, signature: &str) -> NonNull<WrenHandle> {
        let signature = c_string(signature);
        let handle = unsafe { sys::wrenMakeCallHandle(self, signature.as_ptr()) };
        NonNull::new(handle).unwrap_or_else(|| contract_violation("wrenMakeCallHandle returned null"))
    }

    fn call(&mut self, method: NonNull<WrenHandle>) -> InterpretResult {
        InterpretResult::from(unsafe { sys::wrenCall(self, method.as_ptr()) } as i32)
    }

    fn release_handle(&mut self, handle: NonNull<WrenHandle>) {
        unsafe { sys::wrenReleaseHandle(self, handle.as_ptr()) };
    }

    fn interpret(&mut self, module: &str, source: &str) -> InterpretResult {
        let (Ok(c_module), Ok(c_source)) = (CString::new(module), CString::new(source)) else {
            unsafe { host(self) }.report_error(
                ErrorType::Compile,
                Some(module),
                0,
                "Source contains a NUL byte.",
            );
            return InterpretResult::CompileError;
        };
        let result = unsafe { sys::wrenInterpret(self, c_module.as_ptr(), c_source.as_ptr()) };
        InterpretResult::from(result as i32)
    }

    fn collect_garbage(&mut self) {
        unsafe { sys::wrenCollectGarbage(self) };
    }
}

fn slot_index(slot: usize) -> c_int {
    c_int::try_from(slot).unwrap_or_else(|_| contract_violation(format_args!("slot {slot} out of range")))
}

fn c_string(text: &str) -> CString {
    CString::new(text)
        .unwrap_or_else(|_| contract_violation(format_args!("{text:?} contains a NUL byte")))
}

/// # Safety
///
/// `vm` must have been created by [`Runtime::create`], which stores the host
/// state as user data.
unsafe fn host<'a>(vm: *mut WrenVM) -> &'a HostState<WrenVM> {
    unsafe { &*sys::wrenGetUserData(vm).cast::<HostState<WrenVM>>() }
}

unsafe fn text<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
    }
}

// ============================================================================
// Callbacks installed in WrenConfiguration
// ============================================================================

unsafe extern "C" fn reallocate(memory: *mut c_void, new_size: usize, user_data: *mut c_void) -> *mut c_void {
    let host = unsafe { &*user_data.cast::<HostState<WrenVM>>() };
    match host.reallocate() {
        Some(f) => unsafe { f(memory, new_size) },
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn load_module(vm: *mut WrenVM, name: *const c_char) -> sys::WrenLoadModuleResult {
    let mut result = sys::WrenLoadModuleResult {
        source: ptr::null(),
        onComplete: None,
        userData: ptr::null_mut(),
    };
    let name = unsafe { text(name) };
    let Some(source) = (unsafe { host(vm) }).load_module(&name) else {
        return result;
    };
    match CString::new(source) {
        Ok(source) => {
            result.source = source.into_raw();
            result.onComplete = Some(free_module_source);
        }
        Err(_) => log::warn!("module '{name}' contains a NUL byte"),
    }
    result
}

unsafe extern "C" fn free_module_source(
    _vm: *mut WrenVM,
    _name: *const c_char,
    result: sys::WrenLoadModuleResult,
) {
    if !result.source.is_null() {
        drop(unsafe { CString::from_raw(result.source.cast_mut()) });
    }
}

unsafe extern "C" fn bind_foreign_method(
    vm: *mut WrenVM,
    module: *const c_char,
    class_name: *const c_char,
    is_static: bool,
    signature: *const c_char,
) -> sys::WrenForeignMethodFn {
    let (module, class_name, signature) = unsafe { (text(module), text(class_name), text(signature)) };
    unsafe { host(vm) }.bind_foreign_method(&module, &class_name, is_static, &signature)
}

unsafe extern "C" fn bind_foreign_class(
    vm: *mut WrenVM,
    module: *const c_char,
    class_name: *const c_char,
) -> sys::WrenForeignClassMethods {
    let (module, class_name) = unsafe { (text(module), text(class_name)) };
    let methods = unsafe { host(vm) }.bind_foreign_class(&module, &class_name);
    sys::WrenForeignClassMethods {
        allocate: methods.allocate,
        finalize: methods.finalize,
    }
}

unsafe extern "C" fn write(vm: *mut WrenVM, message: *const c_char) {
    unsafe { host(vm).write(&text(message)) };
}

unsafe extern "C" fn report_error(
    vm: *mut WrenVM,
    kind: sys::WrenErrorType,
    module: *const c_char,
    line: c_int,
    message: *const c_char,
) {
    let module = (!module.is_null()).then(|| unsafe { text(module) });
    let message = unsafe { text(message) };
    unsafe { host(vm) }.report_error(ErrorType::from(kind as i32), module.as_deref(), line, &message);
}
