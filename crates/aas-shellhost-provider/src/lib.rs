//! # aas-shellhost Provider
//!
//! The submodel service provider: owns one submodel's element tree,
//! maintains per-path handler registries (value bindings, operation
//! handlers, event delegates), and executes operation invocations
//! under a race between completion and a timeout, in synchronous and
//! deferred/callback modes with a result-retrieval cache.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod invocation;
pub mod provider;
pub mod publish;
pub mod submodel;

pub use config::{ConfigError, ProviderConfig};
pub use invocation::{CallbackResponse, ExecutionState, InvocationRequest, InvocationResponse};
pub use provider::{EventDelegate, ProviderError, SubmodelProvider};
pub use publish::{EventMessage, EventPublisher, EventTopics, PublishError, Qos, TopicKind};
pub use submodel::Submodel;
