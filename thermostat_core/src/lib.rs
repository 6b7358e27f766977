// thermostat_core/src/lib.rs

// This file defines the public modules of the library.
pub mod buffer;
pub mod error;
pub mod estimation;
pub mod memory;
pub mod prelude;
pub mod states;
pub mod timeline;
pub mod types;
