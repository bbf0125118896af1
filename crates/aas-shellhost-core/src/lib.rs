//! # aas-shellhost Core
//!
//! Path-addressed element tree store for AAS submodels.
//!
//! This crate provides:
//! - A generic, event-emitting hierarchical container (`ElementContainer`)
//!   with `/`-delimited path addressing and sibling-unique `idShort`s
//! - Synchronous change events for create/update/delete
//! - AAS Part 2 encoding rules for identifiers and idShortPaths

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod encoding;
pub mod error;
pub mod events;

pub use container::{join_path, ElementContainer, Referable};
pub use encoding::{
    decode_id_base64url, decode_idshort_path, encode_id_base64url, encode_idshort_path,
};
pub use error::{KindMismatch, StoreError};
pub use events::{ChangeEvent, ChangeEventKind};
