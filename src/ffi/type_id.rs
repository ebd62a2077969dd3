//! Process-wide identity of native types exposed to scripts.
//!
//! Every native type gets a dense [`TypeId`] the first time it is asked for,
//! starting at zero. The registry also records which script module and class
//! a type was bound to, indexed by that id. A single registry is shared by
//! all VMs in the process so the same type resolves to the same identity
//! everywhere; registration is expected to finish before scripts run
//! concurrently.

use std::any::{type_name, TypeId as StdTypeId};
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use rustc_hash::FxHashMap;

use crate::core::error::{contract_violation, ContractError};

static TYPE_REGISTRY: OnceLock<Mutex<TypeRegistry>> = OnceLock::new();

/// Dense identifier of a native type.
///
/// Stored as the header of every foreign object so reads can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Script-side name of a bound native type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeNameBinding {
    pub module: String,
    pub class: String,
}

impl TypeNameBinding {
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class: class.into(),
        }
    }
}

impl fmt::Display for TypeNameBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.class)
    }
}

/// Id assignment and name tables.
///
/// `rust_names[id]` always exists for an assigned id; `names` only grows by
/// [`bind_name`](TypeRegistry::bind_name) and its length is the next id that
/// may be bound.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    ids: FxHashMap<StdTypeId, TypeId>,
    rust_names: Vec<&'static str>,
    names: Vec<TypeNameBinding>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the process-wide registry.
    ///
    /// The tables are never left half-written, so poisoning is ignored.
    pub fn global() -> MutexGuard<'static, TypeRegistry> {
        TYPE_REGISTRY
            .get_or_init(|| Mutex::new(TypeRegistry::new()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the id of `T`, assigning the next one on first use.
    pub fn id_of<T: 'static>(&mut self) -> TypeId {
        let next = TypeId(self.rust_names.len() as u32);
        let rust_names = &mut self.rust_names;
        *self.ids.entry(StdTypeId::of::<T>()).or_insert_with(|| {
            rust_names.push(type_name::<T>());
            next
        })
    }

    /// Returns the id of `T` without assigning one.
    pub fn find<T: 'static>(&self) -> Option<TypeId> {
        self.ids.get(&StdTypeId::of::<T>()).copied()
    }

    /// Records the script name of `T`.
    ///
    /// Aborts if [`try_bind_name`](TypeRegistry::try_bind_name) would fail.
    pub fn bind_name<T: 'static>(&mut self, module: &str, class: &str) -> TypeId {
        self.try_bind_name::<T>(module, class)
            .unwrap_or_else(|err| contract_violation(err))
    }

    /// Records the script name of `T`.
    ///
    /// Fails if `T` is already bound, or if another type received an id
    /// after `T` and has not been bound yet.
    pub fn try_bind_name<T: 'static>(
        &mut self,
        module: &str,
        class: &str,
    ) -> Result<TypeId, ContractError> {
        let id = self.id_of::<T>();
        if let Some(existing) = self.names.get(id.index()) {
            return Err(ContractError::AlreadyBound {
                rust: type_name::<T>(),
                existing: existing.to_string(),
            });
        }
        if id.index() != self.names.len() {
            return Err(ContractError::BoundOutOfOrder {
                rust: type_name::<T>(),
                id: id.0,
                recorded: self.names.len(),
            });
        }
        self.names.push(TypeNameBinding::new(module, class));
        Ok(id)
    }

    /// Binds `T` unless it already is.
    ///
    /// Lets the same native type be registered against several VMs. A
    /// re-binding under a different name keeps the first name.
    pub fn ensure_name<T: 'static>(&mut self, module: &str, class: &str) -> TypeId {
        match (self.find::<T>(), self.try_name_of::<T>()) {
            (Some(id), Some(existing)) => {
                if existing.module != module || existing.class != class {
                    log::warn!(
                        "{} already bound to {existing}; ignoring {module}.{class}",
                        type_name::<T>()
                    );
                }
                id
            }
            _ => self.bind_name::<T>(module, class),
        }
    }

    /// Returns the bound name of `T`, aborting if it was never bound.
    pub fn name_of<T: 'static>(&self) -> &TypeNameBinding {
        self.bound_name::<T>()
            .unwrap_or_else(|err| contract_violation(err))
    }

    pub fn bound_name<T: 'static>(&self) -> Result<&TypeNameBinding, ContractError> {
        self.try_name_of::<T>().ok_or(ContractError::Unbound {
            rust: type_name::<T>(),
        })
    }

    pub fn try_name_of<T: 'static>(&self) -> Option<&TypeNameBinding> {
        self.find::<T>().and_then(|id| self.name_of_id(id))
    }

    pub fn name_of_id(&self, id: TypeId) -> Option<&TypeNameBinding> {
        self.names.get(id.index())
    }

    /// Rust type name recorded for `id`, for diagnostics.
    pub fn rust_name(&self, id: TypeId) -> Option<&'static str> {
        self.rust_names.get(id.index()).copied()
    }

    pub fn is_bound<T: 'static>(&self) -> bool {
        self.try_name_of::<T>().is_some()
    }

    /// Number of ids assigned so far.
    pub fn len(&self) -> usize {
        self.rust_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rust_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;

    #[test]
    fn ids_follow_first_use_order() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.id_of::<A>().as_u32(), 0);
        assert_eq!(registry.id_of::<B>().as_u32(), 1);
        assert_eq!(registry.id_of::<C>().as_u32(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn repeated_id_of_is_stable() {
        let mut registry = TypeRegistry::new();
        let first = registry.id_of::<A>();
        registry.id_of::<B>();
        assert_eq!(registry.id_of::<A>(), first);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn find_does_not_assign() {
        let mut registry = TypeRegistry::new();
        assert!(registry.find::<A>().is_none());
        assert!(registry.is_empty());
        let id = registry.id_of::<A>();
        assert_eq!(registry.find::<A>(), Some(id));
    }

    #[test]
    fn bind_in_registration_order() {
        let mut registry = TypeRegistry::new();
        let a = registry.bind_name::<A>("main", "A");
        let b = registry.bind_name::<B>("util", "B");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(registry.name_of::<A>(), &TypeNameBinding::new("main", "A"));
        assert_eq!(registry.name_of::<B>().to_string(), "util.B");
        assert_eq!(registry.name_of_id(b).map(|n| n.class.as_str()), Some("B"));
        assert!(registry.rust_name(a).is_some_and(|n| n.ends_with("A")));
    }

    #[test]
    fn double_bind_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.bind_name::<A>("main", "A");
        assert_eq!(
            registry.try_bind_name::<A>("main", "Other"),
            Err(ContractError::AlreadyBound {
                rust: type_name::<A>(),
                existing: "main.A".into(),
            })
        );
        assert_eq!(registry.name_of::<A>().class, "A");
    }

    #[test]
    fn out_of_order_bind_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.id_of::<A>();
        let err = registry.try_bind_name::<B>("main", "B").unwrap_err();
        assert!(matches!(err, ContractError::BoundOutOfOrder { id: 1, recorded: 0, .. }));
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn unbound_name_is_an_error() {
        let mut registry = TypeRegistry::new();
        registry.id_of::<A>();
        assert_eq!(
            registry.bound_name::<A>(),
            Err(ContractError::Unbound { rust: type_name::<A>() })
        );
        assert!(registry.try_name_of::<A>().is_none());
    }

    #[test]
    fn ensure_name_keeps_first_binding() {
        let mut registry = TypeRegistry::new();
        let first = registry.ensure_name::<A>("main", "A");
        let second = registry.ensure_name::<A>("other", "Renamed");
        assert_eq!(first, second);
        assert_eq!(registry.name_of::<A>(), &TypeNameBinding::new("main", "A"));
    }

    #[test]
    fn global_registry_is_shared() {
        struct OnlyHere;
        let id = TypeRegistry::global().ensure_name::<OnlyHere>("main", "OnlyHere");
        assert_eq!(TypeRegistry::global().find::<OnlyHere>(), Some(id));
        assert_eq!(TypeRegistry::global().id_of::<OnlyHere>(), id);
        assert_eq!(TypeRegistry::global().name_of::<OnlyHere>().class, "OnlyHere");
    }
}
