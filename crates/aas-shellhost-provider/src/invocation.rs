//! The operation invocation engine.
//!
//! Every invocation spawns one independent unit of work and races it
//! against a timer; there is no central scheduler loop, and concurrent
//! invocations have no mutual ordering. A single cancellation token per
//! invocation is signalled exactly once, by the timer or by completion
//! (to release handler-internal resources promptly), and handlers
//! observe it cooperatively; the engine never tears a handler down
//! forcibly.
//!
//! Handler errors and panics are folded into a `Failed` response, and a
//! timeout yields a successful response envelope carrying the `Timeout`
//! state: neither surfaces as a call-level error.

use crate::provider::{ProviderError, SubmodelProvider};
use aas_shellhost_core::encode_idshort_path;
use aas_shellhost_model::{
    InvocationScope, Operation, OperationHandler, OperationResult, OperationVariableSet,
    SubmodelElement,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Lifecycle status of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionState {
    /// Created, not yet started
    Idle,
    /// The race is in flight
    Running,
    /// The handler finished successfully
    Completed,
    /// The handler returned an error or panicked
    Failed,
    /// The timer won the race
    Timeout,
}

impl ExecutionState {
    /// Whether this state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }
}

/// One invocation request.
#[derive(Clone)]
pub struct InvocationRequest {
    /// Caller-visible request identifier
    pub request_id: String,
    /// Input arguments
    pub input_arguments: OperationVariableSet,
    /// In/out arguments, mutated in place by the handler
    pub in_out_arguments: OperationVariableSet,
    /// Timeout budget; the provider default applies when absent
    pub timeout_ms: Option<u64>,
}

impl Default for InvocationRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationRequest {
    /// A request with a fresh random identifier and no arguments.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            input_arguments: OperationVariableSet::new(),
            in_out_arguments: OperationVariableSet::new(),
            timeout_ms: None,
        }
    }

    /// Use a caller-chosen request identifier.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Append an input argument.
    #[must_use]
    pub fn with_input(mut self, element: SubmodelElement) -> Self {
        self.input_arguments.push(element);
        self
    }

    /// Append an in/out argument.
    #[must_use]
    pub fn with_inout(mut self, element: SubmodelElement) -> Self {
        self.in_out_arguments.push(element);
        self
    }

    /// Set the timeout budget in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// The filled response of one invocation.
#[derive(Clone)]
pub struct InvocationResponse {
    /// Echoed request identifier
    pub request_id: String,
    /// In/out arguments after the handler ran
    pub in_out_arguments: OperationVariableSet,
    /// Output arguments filled by the handler
    pub output_arguments: OperationVariableSet,
    /// Terminal or in-flight state
    pub execution_state: ExecutionState,
    /// The handler's result, a captured failure, or a timeout notice
    pub operation_result: Option<OperationResult>,
}

/// The immediate answer of an asynchronous invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackResponse {
    /// Request identifier to poll with
    pub request_id: String,
    /// Where the result can be retrieved
    pub callback_url: String,
}

/// Key of one stored asynchronous invocation result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InvocationKey {
    pub(crate) path: String,
    pub(crate) request_id: String,
}

/// A stored response plus its completion instant, used for eviction.
pub(crate) struct StoredResult {
    pub(crate) response: InvocationResponse,
    pub(crate) completed_at: Option<Instant>,
}

impl SubmodelProvider {
    /// Invoke the operation at a path and wait for the race to settle.
    ///
    /// The handler runs as an independently cancellable unit of work;
    /// the call blocks only at the race-join point. A timeout is a
    /// successful response envelope, not a call failure.
    ///
    /// # Errors
    ///
    /// `NotFound` when the path does not resolve to an operation,
    /// `NoHandler` when neither a registered nor an attached handler
    /// exists. Both are reported before any execution state is set.
    pub async fn invoke_operation(
        &self,
        path: &str,
        request: InvocationRequest,
    ) -> Result<InvocationResponse, ProviderError> {
        let (handler, scope) = self.prepare_invocation(path, &request)?;
        let timeout = self.timeout_budget(&request);

        tracing::debug!(path, request_id = %request.request_id, "Invoking operation");
        let (state, result) = run_race(handler, scope.clone(), timeout).await;
        tracing::debug!(path, request_id = %request.request_id, state = ?state, "Invocation settled");

        Ok(InvocationResponse {
            request_id: request.request_id,
            in_out_arguments: scope.inouts,
            output_arguments: scope.outputs,
            execution_state: state,
            operation_result: result,
        })
    }

    /// Start the invocation race in a detached unit of work and return
    /// immediately with a callback response.
    ///
    /// A `Running` entry is stored under `(path, request_id)` before
    /// the race starts, so a poll issued right after this call finds
    /// it; the terminal response overwrites it when the race settles.
    ///
    /// # Errors
    ///
    /// As for [`invoke_operation`](Self::invoke_operation).
    pub fn invoke_operation_async(
        &self,
        path: &str,
        request: InvocationRequest,
    ) -> Result<CallbackResponse, ProviderError> {
        let (handler, scope) = self.prepare_invocation(path, &request)?;
        let timeout = self.timeout_budget(&request);
        let key = InvocationKey {
            path: path.to_string(),
            request_id: request.request_id.clone(),
        };

        self.sweep_results();
        self.results.insert(
            key.clone(),
            StoredResult {
                response: InvocationResponse {
                    request_id: request.request_id.clone(),
                    in_out_arguments: scope.inouts.clone(),
                    output_arguments: scope.outputs.clone(),
                    execution_state: ExecutionState::Running,
                    operation_result: None,
                },
                completed_at: None,
            },
        );

        let results = std::sync::Arc::clone(&self.results);
        let request_id = request.request_id.clone();
        tokio::spawn(async move {
            let (state, result) = run_race(handler, scope.clone(), timeout).await;
            tracing::debug!(
                path = %key.path,
                request_id = %request_id,
                state = ?state,
                "Deferred invocation settled"
            );
            results.insert(
                key,
                StoredResult {
                    response: InvocationResponse {
                        request_id,
                        in_out_arguments: scope.inouts,
                        output_arguments: scope.outputs,
                        execution_state: state,
                        operation_result: result,
                    },
                    completed_at: Some(Instant::now()),
                },
            );
        });

        Ok(CallbackResponse {
            callback_url: self.callback_url(path, &request.request_id),
            request_id: request.request_id,
        })
    }

    /// Retrieve the stored result of an asynchronous invocation.
    ///
    /// Returns whatever is currently stored, which may still be
    /// `Running` when polled before the race settles.
    ///
    /// # Errors
    ///
    /// `ResultNotFound` when nothing is stored under the key.
    pub fn get_invocation_result(
        &self,
        path: &str,
        request_id: &str,
    ) -> Result<InvocationResponse, ProviderError> {
        let key = InvocationKey {
            path: path.to_string(),
            request_id: request_id.to_string(),
        };
        self.results
            .get(&key)
            .map(|entry| entry.response.clone())
            .ok_or_else(|| ProviderError::ResultNotFound {
                path: path.to_string(),
                request_id: request_id.to_string(),
            })
    }

    /// Resolve the operation and its handler, and materialize the
    /// invocation scope. Output arguments are fresh skeletons mirroring
    /// the operation's declared output variable types, not values.
    fn prepare_invocation(
        &self,
        path: &str,
        request: &InvocationRequest,
    ) -> Result<(OperationHandler, InvocationScope), ProviderError> {
        let operation: Operation = self.submodel.elements().retrieve_typed(path)?;

        // A handler registered for the path wins over the element's own
        let handler = self
            .operation_handlers
            .get(path)
            .map(|entry| entry.value().clone())
            .or_else(|| operation.handler())
            .ok_or_else(|| ProviderError::NoHandler(path.to_string()))?;

        let scope = InvocationScope {
            inputs: request.input_arguments.clone(),
            inouts: request.in_out_arguments.clone(),
            outputs: operation.outputs().to_skeleton(),
            cancel: CancellationToken::new(),
            operation,
        };
        Ok((handler, scope))
    }

    fn timeout_budget(&self, request: &InvocationRequest) -> Duration {
        request
            .timeout_ms
            .map_or(self.config.default_timeout, Duration::from_millis)
    }

    fn callback_url(&self, path: &str, request_id: &str) -> String {
        let suffix = format!(
            "submodelElements/{}/invocationList/{}",
            encode_idshort_path(path),
            request_id
        );
        match &self.config.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.as_str().trim_end_matches('/'), suffix),
            None => format!("/{suffix}"),
        }
    }

    /// Drop terminal results older than the configured TTL. `Running`
    /// entries are never evicted.
    fn sweep_results(&self) {
        let ttl = self.config.result_ttl;
        self.results.retain(|_, stored| {
            stored
                .completed_at
                .map_or(true, |completed| completed.elapsed() < ttl)
        });
    }
}

/// Race a handler against the timeout budget. The cancellation token is
/// signalled on both outcomes; signalling is idempotent.
async fn run_race(
    handler: OperationHandler,
    scope: InvocationScope,
    timeout: Duration,
) -> (ExecutionState, Option<OperationResult>) {
    let cancel = scope.cancel.clone();
    let mut work = tokio::spawn(handler(scope));

    tokio::select! {
        joined = &mut work => {
            cancel.cancel();
            match joined {
                Ok(Ok(result)) => (ExecutionState::Completed, Some(result)),
                Ok(Err(err)) => (
                    ExecutionState::Failed,
                    Some(OperationResult::failed(err.to_string())),
                ),
                Err(err) => (
                    ExecutionState::Failed,
                    Some(OperationResult::failed(format!("handler panicked: {err}"))),
                ),
            }
        }
        () = tokio::time::sleep(timeout) => {
            // The handler keeps running detached; it observes the token
            cancel.cancel();
            (
                ExecutionState::Timeout,
                Some(OperationResult::failed(format!(
                    "operation did not finish within {}ms",
                    timeout.as_millis()
                ))),
            )
        }
    }
}
