//! Host callbacks and configuration handed to a VM at construction.

use std::ffi::c_void;
use std::fmt;
use std::io::Write;

use crate::internal::utils::read_module_file;
use crate::types::enums::ErrorType;

/// Returns the source of an imported module, or `None` if it cannot be found.
pub type LoadModuleFn = Box<dyn Fn(&str) -> Option<String>>;

/// Receives text printed by `System.print` and friends.
pub type WriteFn = Box<dyn Fn(&str)>;

/// Receives compile errors, runtime errors and stack trace lines.
///
/// Arguments are the error kind, the module (absent for some runtime
/// errors), the line and the message.
pub type ErrorFn = Box<dyn Fn(ErrorType, Option<&str>, i32, &str)>;

/// Memory function with `realloc` semantics: a null pointer allocates, a zero
/// size frees, anything else resizes.
pub type ReallocateFn = unsafe fn(memory: *mut c_void, new_size: usize) -> *mut c_void;

pub const DEFAULT_INITIAL_HEAP_SIZE: usize = 0xA0_0000;
pub const DEFAULT_MIN_HEAP_SIZE: usize = 0x10_0000;
pub const DEFAULT_HEAP_GROWTH_PERCENT: i32 = 50;

/// Per-VM configuration.
///
/// # Example
///
/// ```ignore
/// let config = Config::default()
///     .with_write(|text| log::info!("{text}"))
///     .with_load_module(|name| std::fs::read_to_string(format!("scripts/{name}.wren")).ok())
///     .with_initial_heap_size(1 << 20);
/// let vm = Vm::<WrenVM>::with_config(config)?;
/// ```
pub struct Config {
    pub(crate) load_module: LoadModuleFn,
    pub(crate) write: WriteFn,
    pub(crate) error: ErrorFn,
    pub(crate) reallocate: Option<ReallocateFn>,
    pub initial_heap_size: usize,
    pub min_heap_size: usize,
    pub heap_growth_percent: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            load_module: Box::new(default_load_module),
            write: Box::new(default_write),
            error: Box::new(default_error),
            reallocate: None,
            initial_heap_size: DEFAULT_INITIAL_HEAP_SIZE,
            min_heap_size: DEFAULT_MIN_HEAP_SIZE,
            heap_growth_percent: DEFAULT_HEAP_GROWTH_PERCENT,
        }
    }
}

impl Config {
    pub fn with_load_module(mut self, f: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.load_module = Box::new(f);
        self
    }

    pub fn with_write(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.write = Box::new(f);
        self
    }

    pub fn with_error(mut self, f: impl Fn(ErrorType, Option<&str>, i32, &str) + 'static) -> Self {
        self.error = Box::new(f);
        self
    }

    /// Routes every runtime allocation through `f` instead of the C allocator.
    pub fn with_reallocate(mut self, f: ReallocateFn) -> Self {
        self.reallocate = Some(f);
        self
    }

    pub fn with_initial_heap_size(mut self, bytes: usize) -> Self {
        self.initial_heap_size = bytes;
        self
    }

    pub fn with_min_heap_size(mut self, bytes: usize) -> Self {
        self.min_heap_size = bytes;
        self
    }

    pub fn with_heap_growth_percent(mut self, percent: i32) -> Self {
        self.heap_growth_percent = percent;
        self
    }

    pub fn load_module(&self, name: &str) -> Option<String> {
        (self.load_module)(name)
    }

    pub fn write(&self, text: &str) {
        (self.write)(text)
    }

    pub fn report_error(&self, kind: ErrorType, module: Option<&str>, line: i32, message: &str) {
        (self.error)(kind, module, line, message)
    }

    pub fn reallocate(&self) -> Option<ReallocateFn> {
        self.reallocate
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("reallocate", &self.reallocate.is_some())
            .field("initial_heap_size", &self.initial_heap_size)
            .field("min_heap_size", &self.min_heap_size)
            .field("heap_growth_percent", &self.heap_growth_percent)
            .finish_non_exhaustive()
    }
}

/// Loads `<name>.wren` from the working directory.
pub fn default_load_module(name: &str) -> Option<String> {
    read_module_file(name)
}

/// Prints script output to stdout.
pub fn default_write(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

/// Logs script errors as `WREN_ERROR_COMPILE in main:3> message`.
pub fn default_error(kind: ErrorType, module: Option<&str>, line: i32, message: &str) {
    log::error!("{}", format_error(kind, module, line, message));
}

pub(crate) fn format_error(kind: ErrorType, module: Option<&str>, line: i32, message: &str) -> String {
    match module {
        Some(module) => format!("{kind} in {module}:{line}> {message}"),
        None => format!("{kind}> {message}"),
    }
}
