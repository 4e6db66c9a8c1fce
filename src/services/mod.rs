//! Gallery behavior on top of the object store gateway.
//!
//! - `bucket`: lazy bucket provisioning
//! - `namespace`: live/trash key rules and upload key derivation
//! - `archive`: streamed ZIP export
//! - `gallery_service`: the operations the HTTP layer calls

pub mod archive;
pub mod bucket;
pub mod gallery_service;
pub mod namespace;
