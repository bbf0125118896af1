//! The operation model: variables, handlers, and results.
//!
//! A handler is the only contract business code implements to plug
//! into the invocation engine: an async capability receiving the
//! operation, its argument sets, and a cancellation token. Argument
//! sets are alias clones, so a handler writes results straight through
//! element set-binding and the engine reads them back from the same
//! skeletons.

use crate::element::{ElementBase, SubmodelElement, ValueBinding, ValueError};
use crate::value::ConversionError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An ordered sequence of operation variables keyed by `idShort`.
#[derive(Clone, Default)]
pub struct OperationVariableSet {
    variables: Vec<SubmodelElement>,
}

impl OperationVariableSet {
    /// An empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable, preserving insertion order.
    #[must_use]
    pub fn with(mut self, element: SubmodelElement) -> Self {
        self.variables.push(element);
        self
    }

    /// Append a variable in place.
    pub fn push(&mut self, element: SubmodelElement) {
        self.variables.push(element);
    }

    /// Look up a variable by `idShort`.
    #[must_use]
    pub fn get(&self, id_short: &str) -> Option<&SubmodelElement> {
        self.variables
            .iter()
            .find(|element| element.base().id_short == id_short)
    }

    /// Iterate the variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SubmodelElement> {
        self.variables.iter()
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Fresh empty-valued instances mirroring the declared variable
    /// types, not their values.
    #[must_use]
    pub fn to_skeleton(&self) -> Self {
        Self {
            variables: self
                .variables
                .iter()
                .map(SubmodelElement::empty_like)
                .collect(),
        }
    }
}

/// Severity of a result message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// Informational
    Info,
    /// Something noteworthy but non-fatal
    Warning,
    /// The operation failed
    Error,
    /// The handler raised an exception
    Exception,
}

/// One message attached to an operation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    /// Severity
    pub message_type: MessageType,
    /// Machine-readable code
    pub code: Option<String>,
    /// Human-readable text
    pub text: String,
}

impl ResultMessage {
    /// An informational message.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Info,
            code: None,
            text: text.into(),
        }
    }

    /// An error message.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Error,
            code: None,
            text: text.into(),
        }
    }
}

/// The outcome a handler reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation succeeded
    pub success: bool,
    /// Attached messages
    pub messages: Vec<ResultMessage>,
}

impl OperationResult {
    /// A plain success.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            messages: Vec::new(),
        }
    }

    /// A failure carrying one error message.
    #[must_use]
    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![ResultMessage::error(text)],
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: ResultMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// An error reported by an operation handler. Captured by the engine
/// and folded into the invocation response, never rethrown.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    /// What went wrong
    pub message: String,
}

impl HandlerError {
    /// A handler error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ValueError> for HandlerError {
    fn from(err: ValueError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<ConversionError> for HandlerError {
    fn from(err: ConversionError) -> Self {
        Self::new(err.to_string())
    }
}

/// Everything a handler receives for one invocation.
#[derive(Clone)]
pub struct InvocationScope {
    /// The operation element being invoked
    pub operation: Operation,
    /// Input arguments as supplied by the caller
    pub inputs: OperationVariableSet,
    /// In/out arguments, mutated in place through set-binding
    pub inouts: OperationVariableSet,
    /// Output skeletons for the handler to fill
    pub outputs: OperationVariableSet,
    /// Single-shot cancellation signal; observed cooperatively
    pub cancel: CancellationToken,
}

/// The future a handler returns.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<OperationResult, HandlerError>> + Send>>;

/// An operation handler capability.
pub type OperationHandler = Arc<dyn Fn(InvocationScope) -> HandlerFuture + Send + Sync>;

/// Wrap a plain async closure as an [`OperationHandler`].
pub fn operation_handler<F, Fut>(f: F) -> OperationHandler
where
    F: Fn(InvocationScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OperationResult, HandlerError>> + Send + 'static,
{
    Arc::new(move |scope| Box::pin(f(scope)))
}

/// An invocable behavior element with declared input, output, and
/// in/out variables and an optional attached default handler.
#[derive(Clone)]
pub struct Operation {
    /// Common metadata
    pub base: ElementBase,
    inputs: OperationVariableSet,
    outputs: OperationVariableSet,
    inouts: OperationVariableSet,
    handler: Arc<RwLock<Option<OperationHandler>>>,
    binding: ValueBinding,
}

impl Operation {
    /// An operation with no variables and no handler.
    #[must_use]
    pub fn new(id_short: impl Into<String>) -> Self {
        Self {
            base: ElementBase::new(id_short),
            inputs: OperationVariableSet::new(),
            outputs: OperationVariableSet::new(),
            inouts: OperationVariableSet::new(),
            handler: Arc::new(RwLock::new(None)),
            binding: ValueBinding::unbound(),
        }
    }

    /// Declare an input variable.
    #[must_use]
    pub fn with_input(mut self, element: SubmodelElement) -> Self {
        self.inputs.push(element);
        self
    }

    /// Declare an output variable.
    #[must_use]
    pub fn with_output(mut self, element: SubmodelElement) -> Self {
        self.outputs.push(element);
        self
    }

    /// Declare an in/out variable.
    #[must_use]
    pub fn with_inout(mut self, element: SubmodelElement) -> Self {
        self.inouts.push(element);
        self
    }

    /// Attach the default handler.
    #[must_use]
    pub fn with_handler(self, handler: OperationHandler) -> Self {
        *self.handler.write() = Some(handler);
        self
    }

    /// Replace the default handler on a live operation.
    pub fn set_handler(&self, handler: OperationHandler) {
        *self.handler.write() = Some(handler);
    }

    /// The attached default handler, if any.
    #[must_use]
    pub fn handler(&self) -> Option<OperationHandler> {
        self.handler.read().clone()
    }

    /// Declared input variables.
    #[must_use]
    pub fn inputs(&self) -> &OperationVariableSet {
        &self.inputs
    }

    /// Declared output variables.
    #[must_use]
    pub fn outputs(&self) -> &OperationVariableSet {
        &self.outputs
    }

    /// Declared in/out variables.
    #[must_use]
    pub fn inouts(&self) -> &OperationVariableSet {
        &self.inouts
    }

    /// The (unbound by default) value binding of this operation.
    #[must_use]
    pub fn binding(&self) -> &ValueBinding {
        &self.binding
    }

    /// A fresh operation mirroring this one's declared variables, with
    /// no handler and cleared backing values.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        let mut fresh = Self::new(self.base.id_short.clone());
        fresh.base = self.base.clone();
        fresh.inputs = self.inputs.to_skeleton();
        fresh.outputs = self.outputs.to_skeleton();
        fresh.inouts = self.inouts.to_skeleton();
        fresh
    }
}
