pub mod error;
pub mod method;
pub mod module;
pub mod state;
pub mod vm;
