//! Per-VM state the runtime reaches through its user-data pointer.

use crate::ffi::native_fn::ForeignMethodFn;
use crate::ffi::registry::{Bindings, ClassMethods};
use crate::runtime::Runtime;
use crate::types::callbacks::{Config, ReallocateFn};
use crate::types::enums::ErrorType;

/// Dispatch tables plus host callbacks of one VM.
///
/// Owned by [`Vm`](crate::core::vm::Vm) at a stable heap address for the
/// whole life of the runtime; backends call into it from their C callbacks.
pub struct HostState<R: Runtime> {
    pub(crate) bindings: Bindings<R>,
    pub(crate) config: Config,
}

impl<R: Runtime> HostState<R> {
    pub fn new(config: Config) -> Self {
        Self {
            bindings: Bindings::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bindings(&self) -> &Bindings<R> {
        &self.bindings
    }

    /// Answers the runtime's request for a foreign method's native code.
    pub fn bind_foreign_method(
        &self,
        module: &str,
        class: &str,
        is_static: bool,
        signature: &str,
    ) -> Option<ForeignMethodFn<R>> {
        let found = self.bindings.find_method(module, class, is_static, signature);
        if found.is_none() {
            log::debug!("no foreign method bound for {module}.{class}.{signature}");
        }
        found
    }

    /// Answers the runtime's request for a foreign class's allocator.
    pub fn bind_foreign_class(&self, module: &str, class: &str) -> ClassMethods<R> {
        self.bindings.find_class(module, class)
    }

    pub fn load_module(&self, name: &str) -> Option<String> {
        self.config.load_module(name)
    }

    pub fn write(&self, text: &str) {
        self.config.write(text)
    }

    pub fn report_error(&self, kind: ErrorType, module: Option<&str>, line: i32, message: &str) {
        self.config.report_error(kind, module, line, message)
    }

    pub fn reallocate(&self) -> Option<ReallocateFn> {
        self.config.reallocate()
    }
}
