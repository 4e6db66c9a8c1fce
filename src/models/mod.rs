//! Data shapes shared by the store gateway and the HTTP layer.
//!
//! `object` holds what the store reports; `file` holds what clients see.

pub mod file;
pub mod object;
