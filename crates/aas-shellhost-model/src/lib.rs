//! # aas-shellhost Model
//!
//! The submodel element value model for aas-shellhost.
//!
//! This crate provides:
//! - The XSD-like scalar type system (`DataObjectType`, `DataType`) and
//!   its mapping to host representations
//! - `Value` with a three-tier conversion contract
//! - References, qualifiers, and common AAS metadata
//! - The closed set of submodel element variants with overridable
//!   get/set value binding
//! - The operation model (variables, handlers, results)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod datatype;
pub mod element;
pub mod operation;
pub mod semantics;
pub mod value;

pub use collection::SubmodelElementCollection;
pub use datatype::{DataObjectType, DataType, HostKind};
pub use element::{
    AnnotatedRelationshipElement, BasicEvent, Blob, ElementBase, Entity, EntityType, EventElement,
    FileElement, GetHandler, MultiLanguageProperty, Property, RangeElement, ReferenceElement,
    RelationshipElement, SetHandler, SubmodelElement, ValueBinding, ValueError,
};
pub use operation::{
    operation_handler, HandlerError, HandlerFuture, InvocationScope, MessageType, Operation,
    OperationHandler, OperationResult, OperationVariableSet, ResultMessage,
};
pub use semantics::{
    AdministrativeInformation, Constraint, IdType, Identifier, Key, KeyElement, LangString,
    ModelingKind, Reference,
};
pub use value::{ConversionError, Value};
