//! Calling script methods from native code.

use std::fmt;

use crate::core::error::{contract_violation, ContractError};
use crate::core::vm::Vm;
use crate::ffi::native_fn::CallArgs;
use crate::internal::utils::signature_arity;
use crate::runtime::Runtime;
use crate::types::enums::InterpretResult;
use crate::types::value::Value;

struct Handles<H> {
    receiver: H,
    method: H,
}

/// A script receiver bound to a call signature, callable any number of
/// times.
///
/// Owns both runtime handles and releases them exactly once, on drop or on
/// [`release`](Method::release). Not `Clone`; moving it moves the handles.
pub struct Method<'vm, R: Runtime> {
    vm: &'vm Vm<R>,
    handles: Option<Handles<R::Handle>>,
    signature: String,
    arity: usize,
}

impl<'vm, R: Runtime> Method<'vm, R> {
    pub(crate) fn new(vm: &'vm Vm<R>, receiver: R::Handle, method: R::Handle, signature: &str) -> Self {
        Self {
            vm,
            handles: Some(Handles { receiver, method }),
            signature: signature.to_owned(),
            arity: signature_arity(signature),
        }
    }

    /// Calls the method with `args` in slots 1 and up.
    ///
    /// Returns the boxed result, or [`Value::Null`] if the call failed. The
    /// failure itself goes to the error callback. Aborts where
    /// [`try_call`](Method::try_call) would return an error.
    pub fn call<A: CallArgs<R>>(&self, args: A) -> Value {
        self.try_call(args).unwrap_or_else(|err| contract_violation(err))
    }

    /// Like [`call`](Method::call), but reports a released method or an
    /// argument count that does not match the signature.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn try_call<A: CallArgs<R>>(&self, args: A) -> Result<Value, ContractError> {
        let Some(handles) = &self.handles else {
            return Err(ContractError::ReleasedMethod);
        };
        if A::ARITY != self.arity {
            return Err(ContractError::ArityMismatch {
                signature: self.signature.clone(),
                expected: self.arity,
                given: A::ARITY,
            });
        }

        let vm = self.vm.runtime();
        vm.ensure_slots(A::ARITY + 1);
        vm.set_slot_handle(0, handles.receiver);
        args.push(vm);
        Ok(match vm.call(handles.method) {
            InterpretResult::Success => Value::from_slot(vm, 0),
            InterpretResult::CompileError | InterpretResult::RuntimeError => Value::Null,
        })
    }

    /// Whether the method still holds its handles.
    pub fn is_valid(&self) -> bool {
        self.handles.is_some()
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Releases both handles now instead of on drop.
    pub fn release(&mut self) {
        if let Some(handles) = self.handles.take() {
            let vm = self.vm.runtime();
            vm.release_handle(handles.method);
            vm.release_handle(handles.receiver);
        }
    }
}

impl<R: Runtime> Drop for Method<'_, R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: Runtime> fmt::Debug for Method<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Method");
        if let Some(handles) = &self.handles {
            s.field("receiver", &handles.receiver)
                .field("method", &handles.method);
        }
        s.field("signature", &self.signature)
            .field("arity", &self.arity)
            .finish()
    }
}
