//! The VM wrapper: owns a runtime instance and its host state.

use std::ffi::CString;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::core::error::{VmError, VmResult};
use crate::core::method::Method;
use crate::core::module::ModuleContext;
use crate::core::state::HostState;
use crate::ffi::traits::Handle;
use crate::runtime::Runtime;
use crate::types::callbacks::Config;
use crate::types::enums::{ErrorType, InterpretResult};

/// A script VM with its own dispatch tables and callbacks.
///
/// Moving a `Vm` moves ownership of the runtime. [`Method`]s borrow the VM,
/// so it cannot be dropped or reconfigured while one is alive.
///
/// # Example
///
/// ```ignore
/// let vm = Vm::<WrenVM>::new()?;
/// assert!(vm.execute_string("main", "System.print(\"hi\")").is_success());
/// ```
pub struct Vm<R: Runtime> {
    raw: NonNull<R>,
    state: NonNull<HostState<R>>,
    _marker: PhantomData<(R, HostState<R>)>,
}

impl<R: Runtime> Vm<R> {
    pub fn new() -> VmResult<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> VmResult<Self> {
        let state = NonNull::from(Box::leak(Box::new(HostState::new(config))));
        match R::create(state) {
            Some(raw) => Ok(Self {
                raw,
                state,
                _marker: PhantomData,
            }),
            None => {
                drop(unsafe { Box::from_raw(state.as_ptr()) });
                Err(VmError::CreateFailed)
            }
        }
    }

    /// Loads `module` through the configured loader and runs it.
    ///
    /// A module the loader cannot find is reported through the error
    /// callback as a compile error on line 0.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn execute_module(&self, module: &str) -> InterpretResult {
        let Some(source) = self.host().load_module(module) else {
            self.host().report_error(
                ErrorType::Compile,
                Some(module),
                0,
                &format!("Could not load module '{module}'."),
            );
            return InterpretResult::CompileError;
        };
        self.runtime().interpret(module, &source)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn execute_string(&self, module: &str, source: &str) -> InterpretResult {
        self.runtime().interpret(module, source)
    }

    pub fn collect_garbage(&self) {
        self.runtime().collect_garbage();
    }

    pub fn has_variable(&self, module: &str, variable: &str) -> bool {
        self.runtime().has_variable(module, variable)
    }

    /// Persistent handle to a top-level variable.
    ///
    /// The caller releases it, or hands it to [`method_on`](Vm::method_on).
    pub fn handle_of(&self, module: &str, variable: &str) -> VmResult<Handle<R>> {
        check_name(module)?;
        check_name(variable)?;
        let vm = self.runtime();
        if !vm.has_variable(module, variable) {
            return Err(VmError::unknown_variable(module, variable));
        }
        vm.ensure_slots(1);
        vm.get_variable(module, variable, 0);
        Ok(Handle::from_raw(vm.get_slot_handle(0)))
    }

    /// Binds `signature` on the top-level `variable` of `module`.
    ///
    /// ```ignore
    /// let update = vm.method("main", "Game", "update(_)")?;
    /// update.call((0.016,));
    /// ```
    pub fn method(&self, module: &str, variable: &str, signature: &str) -> VmResult<Method<'_, R>> {
        let receiver = self.handle_of(module, variable)?;
        self.method_on(receiver, signature)
    }

    /// Binds `signature` on an existing receiver. The method takes over the
    /// handle and releases it on drop.
    pub fn method_on(&self, receiver: Handle<R>, signature: &str) -> VmResult<Method<'_, R>> {
        if let Err(err) = check_name(signature) {
            receiver.release(self.runtime());
            return Err(err);
        }
        let method = self.runtime().make_call_handle(signature);
        Ok(Method::new(self, receiver.raw(), method, signature))
    }

    /// Starts registering bindings for `name`.
    pub fn begin_module(&mut self, name: &str) -> ModuleContext<'_, R> {
        ModuleContext::new(self, name)
    }

    pub fn host(&self) -> &HostState<R> {
        unsafe { self.state.as_ref() }
    }

    pub(crate) fn host_mut(&mut self) -> &mut HostState<R> {
        unsafe { self.state.as_mut() }
    }

    /// The runtime behind this VM.
    ///
    /// Callers keep the returned borrow short: foreign methods re-enter the
    /// runtime through the same pointer.
    #[allow(clippy::mut_from_ref)]
    pub(crate) fn runtime(&self) -> &mut R {
        unsafe { &mut *self.raw.as_ptr() }
    }
}

impl<R: Runtime> Drop for Vm<R> {
    fn drop(&mut self) {
        unsafe {
            R::destroy(self.raw);
            drop(Box::from_raw(self.state.as_ptr()));
        }
    }
}

fn check_name(text: &str) -> VmResult<()> {
    if text.contains('\0') {
        CString::new(text)?;
    }
    Ok(())
}
