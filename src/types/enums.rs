use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;

/// Runtime type tag of a slot's current value.
///
/// Discriminants match `WrenType` in the C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum SlotType {
    Bool = 0,
    Num = 1,
    Foreign = 2,
    List = 3,
    Map = 4,
    Null = 5,
    String = 6,
    /// Any other object kind (class, fiber, closure...).
    #[num_enum(default)]
    Unknown = 7,
}

/// Kind of diagnostic passed to the error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ErrorType {
    /// A syntax or resolution error while compiling a module.
    Compile = 0,
    /// The message of an uncaught runtime error.
    #[num_enum(default)]
    Runtime = 1,
    /// One frame of the stack trace following a runtime error.
    StackTrace = 2,
}

impl ErrorType {
    /// Name of the kind as printed by the default error reporter.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Compile => "WREN_ERROR_COMPILE",
            ErrorType::Runtime => "WREN_ERROR_RUNTIME",
            ErrorType::StackTrace => "WREN_ERROR_STACK_TRACE",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of interpreting a module or invoking a call handle.
///
/// Errors are terminal for the attempt only; the VM stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum InterpretResult {
    Success = 0,
    CompileError = 1,
    #[num_enum(default)]
    RuntimeError = 2,
}

impl InterpretResult {
    pub fn is_success(self) -> bool {
        self == InterpretResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_type_from_c_values() {
        assert_eq!(SlotType::from(0), SlotType::Bool);
        assert_eq!(SlotType::from(2), SlotType::Foreign);
        assert_eq!(SlotType::from(6), SlotType::String);
        assert_eq!(SlotType::from(42), SlotType::Unknown);
    }

    #[test]
    fn interpret_result_from_c_values() {
        assert_eq!(InterpretResult::from(0), InterpretResult::Success);
        assert_eq!(InterpretResult::from(1), InterpretResult::CompileError);
        assert_eq!(InterpretResult::from(2), InterpretResult::RuntimeError);
        assert!(InterpretResult::Success.is_success());
        assert!(!InterpretResult::CompileError.is_success());
    }

    #[test]
    fn error_type_display() {
        assert_eq!(ErrorType::Compile.to_string(), "WREN_ERROR_COMPILE");
        assert_eq!(ErrorType::from(2), ErrorType::StackTrace);
        assert_eq!(i32::from(ErrorType::Runtime), 1);
    }
}
