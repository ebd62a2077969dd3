use std::ffi::NulError;
use std::fmt;
use std::panic::Location;
use std::process;
use thiserror::Error;

use crate::types::enums::SlotType;

pub type VmResult<T> = Result<T, VmError>;

/// Recoverable failures of the VM wrapper.
///
/// Script outcomes are not errors; they are reported as
/// [`InterpretResult`](crate::types::enums::InterpretResult).
#[derive(Error, Debug)]
pub enum VmError {
    #[error("Failed to create script runtime")]
    CreateFailed,

    #[error("Variable '{variable}' not found in module '{module}'")]
    UnknownVariable { module: String, variable: String },

    #[error("String conversion error: {0}")]
    StringConversion(#[from] NulError),
}

impl VmError {
    pub fn unknown_variable(module: impl Into<String>, variable: impl Into<String>) -> Self {
        VmError::UnknownVariable {
            module: module.into(),
            variable: variable.into(),
        }
    }
}

/// A broken binding declaration detected at the slot boundary.
///
/// The checked entry points ([`try_downcast`], [`Method::try_call`] and
/// friends) return these. Their unchecked counterparts hand them to
/// [`contract_violation`].
///
/// [`try_downcast`]: crate::ffi::foreign::try_downcast
/// [`Method::try_call`]: crate::core::method::Method::try_call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("{rust} is already bound to {existing}")]
    AlreadyBound { rust: &'static str, existing: String },

    #[error("{rust} bound out of order: id {id} but {recorded} names recorded")]
    BoundOutOfOrder {
        rust: &'static str,
        id: u32,
        recorded: usize,
    },

    #[error("{rust} has no script class; bind it before use")]
    Unbound { rust: &'static str },

    #[error("foreign object type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },

    #[error("slot {slot} holds {found:?}, expected foreign {expected}")]
    NotForeign {
        slot: usize,
        found: SlotType,
        expected: &'static str,
    },

    #[error("call through a released method handle")]
    ReleasedMethod,

    #[error("method '{signature}' expects {expected} arguments, {given} given")]
    ArityMismatch {
        signature: String,
        expected: usize,
        given: usize,
    },
}

/// Reports a broken binding declaration and aborts the process.
///
/// Contract violations are raised while the runtime may be inside a
/// foreign call, with its fiber and slot stack mid-update. Unwinding
/// through the C frames is not possible, so there is nothing to recover.
#[cold]
#[track_caller]
pub(crate) fn contract_violation(message: impl fmt::Display) -> ! {
    let location = Location::caller();
    log::error!("binding contract violation at {location}: {message}");
    eprintln!("wrenbind: binding contract violation at {location}: {message}");
    process::abort()
}
