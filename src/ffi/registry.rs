//! Signature-hashed dispatch tables owned by one VM.
//!
//! When the runtime meets a `foreign` method or class declaration it asks the
//! host for the native code behind it, naming the module, class, static flag
//! and signature. [`Bindings`] answers those queries from two maps keyed by
//! a 64-bit hash of the concatenated names:
//!
//! ```text
//! method hash = xxh64(module ++ class ++ signature ++ "s" if static)
//! class hash  = xxh64(module ++ class)
//! ```
//!
//! A lookup miss returns the unbound sentinel (`None`, or a
//! [`ClassMethods`] with both entries empty); the runtime turns that into a
//! script-visible runtime error. Hash collisions are not resolved: a
//! later registration replaces an earlier one with the same hash.

use std::fmt;

use rustc_hash::FxHashMap;
use xxhash_rust::xxh64::Xxh64;

use crate::ffi::native_fn::{FinalizeFn, ForeignMethodFn};

/// Hash of a method or class binding key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingHash(pub u64);

impl fmt::Display for BindingHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Hashes a method key. Static methods get a trailing `s`.
pub fn hash_method_signature(
    module: &str,
    class: &str,
    is_static: bool,
    signature: &str,
) -> BindingHash {
    let mut hasher = Xxh64::new(0);
    hasher.update(module.as_bytes());
    hasher.update(class.as_bytes());
    hasher.update(signature.as_bytes());
    if is_static {
        hasher.update(b"s");
    }
    BindingHash(hasher.digest())
}

pub fn hash_class_signature(module: &str, class: &str) -> BindingHash {
    let mut hasher = Xxh64::new(0);
    hasher.update(module.as_bytes());
    hasher.update(class.as_bytes());
    BindingHash(hasher.digest())
}

/// Allocate/finalize pair of a foreign class.
pub struct ClassMethods<R> {
    /// Called with the class in slot 0 and constructor arguments after it.
    pub allocate: Option<ForeignMethodFn<R>>,
    /// Called with the raw storage when the runtime reclaims an instance.
    pub finalize: Option<FinalizeFn>,
}

impl<R> ClassMethods<R> {
    /// The sentinel returned for classes nobody bound.
    pub const UNBOUND: Self = Self {
        allocate: None,
        finalize: None,
    };

    pub fn is_bound(&self) -> bool {
        self.allocate.is_some()
    }
}

impl<R> Clone for ClassMethods<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ClassMethods<R> {}

impl<R> fmt::Debug for ClassMethods<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMethods")
            .field("allocate", &self.allocate.map(|p| p as *const ()))
            .field("finalize", &self.finalize.map(|p| p as *const ()))
            .finish()
    }
}

/// Per-VM method and class tables.
pub struct Bindings<R> {
    methods: FxHashMap<BindingHash, ForeignMethodFn<R>>,
    classes: FxHashMap<BindingHash, ClassMethods<R>>,
}

impl<R> Default for Bindings<R> {
    fn default() -> Self {
        Self {
            methods: FxHashMap::default(),
            classes: FxHashMap::default(),
        }
    }
}

impl<R> Bindings<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_method(
        &mut self,
        module: &str,
        class: &str,
        is_static: bool,
        signature: &str,
        adapter: ForeignMethodFn<R>,
    ) -> BindingHash {
        let hash = hash_method_signature(module, class, is_static, signature);
        if let Some(previous) = self.methods.insert(hash, adapter) {
            if !std::ptr::fn_addr_eq(previous, adapter) {
                log::warn!(
                    "method binding {module}.{class}.{signature} (static: {is_static}) replaced an earlier adapter with hash {hash}"
                );
            }
        }
        log::debug!("bound method {module}.{class}.{signature} (static: {is_static})");
        hash
    }

    pub fn register_class(
        &mut self,
        module: &str,
        class: &str,
        methods: ClassMethods<R>,
    ) -> BindingHash {
        let hash = hash_class_signature(module, class);
        if self.classes.insert(hash, methods).is_some() {
            log::warn!("class binding {module}.{class} replaced an earlier one with hash {hash}");
        }
        log::debug!("bound foreign class {module}.{class}");
        hash
    }

    pub fn find_method(
        &self,
        module: &str,
        class: &str,
        is_static: bool,
        signature: &str,
    ) -> Option<ForeignMethodFn<R>> {
        self.methods
            .get(&hash_method_signature(module, class, is_static, signature))
            .copied()
    }

    pub fn find_class(&self, module: &str, class: &str) -> ClassMethods<R> {
        self.classes
            .get(&hash_class_signature(module, class))
            .copied()
            .unwrap_or(ClassMethods::UNBOUND)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl<R> fmt::Debug for Bindings<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("methods", &self.methods.len())
            .field("classes", &self.classes.len())
            .finish()
    }
}
