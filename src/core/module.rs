//! Fluent registration of foreign classes and methods.
//!
//! ```ignore
//! vm.begin_module("main")
//!     .bind_class::<Point, _, _>("Point", |x: f64, y: f64| Point { x, y })
//!     .bind_method(false, "length()", |p: &Point| p.x.hypot(p.y))
//!     .bind_getter("x", |p: &mut Point| &mut p.x)
//!     .bind_setter("x=(_)", |p: &mut Point| &mut p.x)
//!     .end_class()
//!     .begin_class("Math")
//!     .bind_function(true, "max(_,_)", f64::max)
//!     .end_class()
//!     .end_module();
//! ```
//!
//! Bindings must be registered before the script declaring the matching
//! `foreign` methods and classes is interpreted; the runtime resolves them
//! at declaration time.

use std::marker::PhantomData;

use crate::core::vm::Vm;
use crate::ffi::convert::{FieldSlot, FromSlot};
use crate::ffi::native_fn::{
    class_methods, getter_adapter, method_adapter, setter_adapter, Constructor, ForeignFn,
    ForeignMethodFn,
};
use crate::ffi::type_id::TypeRegistry;
use crate::runtime::Runtime;

/// Registration scope for one script module.
pub struct ModuleContext<'vm, R: Runtime> {
    vm: &'vm mut Vm<R>,
    name: String,
}

impl<'vm, R: Runtime> ModuleContext<'vm, R> {
    pub(crate) fn new(vm: &'vm mut Vm<R>, name: &str) -> Self {
        Self {
            vm,
            name: name.to_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opens a class whose foreign methods are free functions.
    pub fn begin_class(&mut self, class: &str) -> ClassContext<'_, 'vm, R> {
        ClassContext {
            module: self,
            class: class.to_owned(),
        }
    }

    /// Binds `T` to the foreign class `class` of this module.
    ///
    /// `ctor` builds the value owned by each script instance from the
    /// arguments of the script constructor. The native type keeps the first
    /// script name it is bound to, across all VMs.
    pub fn bind_class<T, A, C>(&mut self, class: &str, ctor: C) -> RegisteredClassContext<'_, 'vm, R, T>
    where
        T: 'static,
        C: Constructor<R, T, A>,
    {
        TypeRegistry::global().ensure_name::<T>(&self.name, class);
        let methods = class_methods::<R, T, A, C>(ctor);
        self.vm
            .host_mut()
            .bindings
            .register_class(&self.name, class, methods);
        RegisteredClassContext {
            inner: ClassContext {
                module: self,
                class: class.to_owned(),
            },
            _marker: PhantomData,
        }
    }

    pub fn end_module(&mut self) {
        log::debug!(
            "module '{}' has {} method bindings",
            self.name,
            self.vm.host().bindings().method_count()
        );
    }

    fn register(&mut self, class: &str, is_static: bool, signature: &str, adapter: ForeignMethodFn<R>) {
        self.vm
            .host_mut()
            .bindings
            .register_method(&self.name, class, is_static, signature, adapter);
    }
}

/// Registration scope for a class of free functions.
pub struct ClassContext<'m, 'vm, R: Runtime> {
    module: &'m mut ModuleContext<'vm, R>,
    class: String,
}

impl<'m, 'vm, R: Runtime> ClassContext<'m, 'vm, R> {
    /// Binds a free function; every parameter comes from a slot.
    pub fn bind_function<M, F>(self, is_static: bool, signature: &str, f: F) -> Self
    where
        F: ForeignFn<R, (), M>,
    {
        let adapter = method_adapter::<R, (), M, F>(f);
        self.bind_cfunction(is_static, signature, adapter)
    }

    /// Binds an adapter that works on the slots itself.
    pub fn bind_cfunction(self, is_static: bool, signature: &str, f: ForeignMethodFn<R>) -> Self {
        self.module.register(&self.class, is_static, signature, f);
        self
    }

    pub fn end_class(self) -> &'m mut ModuleContext<'vm, R> {
        self.module
    }
}

/// Registration scope for a class bound to the native type `T`.
pub struct RegisteredClassContext<'m, 'vm, R: Runtime, T> {
    inner: ClassContext<'m, 'vm, R>,
    _marker: PhantomData<fn() -> T>,
}

impl<'m, 'vm, R: Runtime, T: 'static> RegisteredClassContext<'m, 'vm, R, T> {
    /// Binds a method of `T` taking `&T` or `&mut T` first, or a static
    /// function.
    pub fn bind_method<M, F>(self, is_static: bool, signature: &str, f: F) -> Self
    where
        F: ForeignFn<R, T, M>,
    {
        let adapter = method_adapter::<R, T, M, F>(f);
        self.bind_cfunction(is_static, signature, adapter)
    }

    /// Binds a free function on this class.
    pub fn bind_function<M, F>(self, is_static: bool, signature: &str, f: F) -> Self
    where
        F: ForeignFn<R, (), M>,
    {
        let adapter = method_adapter::<R, (), M, F>(f);
        self.bind_cfunction(is_static, signature, adapter)
    }

    /// Binds a getter for the field `accessor` projects.
    pub fn bind_getter<U, F>(self, signature: &str, accessor: F) -> Self
    where
        U: FieldSlot<R>,
        F: Fn(&mut T) -> &mut U + Copy + 'static,
    {
        let adapter = getter_adapter::<R, T, U, F>(accessor);
        self.bind_cfunction(false, signature, adapter)
    }

    /// Binds a setter assigning its argument to the field `accessor`
    /// projects. The signature has the form `name=(_)`.
    pub fn bind_setter<U, F>(self, signature: &str, accessor: F) -> Self
    where
        U: FromSlot<R>,
        F: Fn(&mut T) -> &mut U + Copy + 'static,
    {
        let adapter = setter_adapter::<R, T, U, F>(accessor);
        self.bind_cfunction(false, signature, adapter)
    }

    pub fn bind_cfunction(self, is_static: bool, signature: &str, f: ForeignMethodFn<R>) -> Self {
        Self {
            inner: self.inner.bind_cfunction(is_static, signature, f),
            _marker: PhantomData,
        }
    }

    pub fn end_class(self) -> &'m mut ModuleContext<'vm, R> {
        self.inner.end_class()
    }
}
