//! Marshalling and dispatch between Rust values and script slots.
//!
//! - [`type_id`]: process-wide identity and script names of native types
//! - [`foreign`]: owned and borrowed native objects inside script storage
//! - [`convert`]: per-type slot conversions
//! - [`native_fn`]: generated call adapters for free functions, methods and fields
//! - [`registry`]: signature-hashed dispatch tables

pub mod convert;
pub mod foreign;
pub mod native_fn;
pub mod registry;
pub mod traits;
pub mod type_id;
