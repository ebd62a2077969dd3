//! Raw bindings to the Wren embedding API, generated from `wren.h` at build
//! time. Safe wrappers live in the `wrenbind` crate.

#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals)]

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
