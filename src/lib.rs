//! Native bindings for the Wren scripting language.
//!
//! `wrenbind` lets host code expose functions, classes and fields to a Wren
//! VM through the runtime's slot-based calling convention, and call back into
//! script-defined values from Rust.
//!
//! # Example
//!
//! ```ignore
//! use wrenbind::prelude::*;
//!
//! #[derive(Clone)]
//! struct Point { x: f64, y: f64 }
//! impl ForeignClass for Point {}
//!
//! let mut vm = Vm::<WrenVM>::new()?;
//! vm.begin_module("main")
//!     .bind_class::<Point, _, _>("Point", |x: f64, y: f64| Point { x, y })
//!     .bind_getter("x", |p: &mut Point| &mut p.x)
//!     .bind_setter("x=(_)", |p: &mut Point| &mut p.x)
//!     .end_class()
//!     .end_module();
//!
//! vm.execute_string("main", "foreign class Point { ... }");
//! ```

pub mod core;
pub mod ffi;
mod internal;
pub mod runtime;
pub mod types;

pub mod prelude {
    pub use crate::core::error::{ContractError, VmError, VmResult};
    pub use crate::core::method::Method;
    pub use crate::core::module::{ClassContext, ModuleContext, RegisteredClassContext};
    pub use crate::core::vm::Vm;
    pub use crate::ffi::convert::{FromSlot, IntoSlot};
    pub use crate::ffi::foreign::{Foreign, ForeignCell, ForeignObject};
    pub use crate::ffi::traits::{ForeignClass, Handle};
    pub use crate::ffi::type_id::{TypeId, TypeNameBinding, TypeRegistry};
    #[cfg(feature = "wren")]
    pub use crate::runtime::wren::WrenVM;
    pub use crate::runtime::Runtime;
    pub use crate::types::callbacks::Config;
    pub use crate::types::enums::{ErrorType, InterpretResult, SlotType};
    pub use crate::types::value::Value;
}
