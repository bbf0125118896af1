//! The submodel service provider.
//!
//! Owns one submodel's element tree plus the per-path registries for
//! value bindings, operation handlers, and event delegates. A binding
//! registered for a path takes precedence over the element's own
//! handlers, which is how a stored element is redirected to a live
//! source without touching the tree.

use crate::config::ProviderConfig;
use crate::invocation::{InvocationKey, StoredResult};
use crate::publish::{EventMessage, EventPublisher, EventTopics, PublishError, Qos, TopicKind};
use crate::submodel::Submodel;
use aas_shellhost_core::{ChangeEventKind, StoreError};
use aas_shellhost_model::{
    OperationHandler, SubmodelElement, Value, ValueBinding, ValueError,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// A callback invoked for every event message raised on a path.
pub type EventDelegate = Arc<dyn Fn(&EventMessage) + Send + Sync>;

/// Errors returned by provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A container operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A value binding failed.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// No handler is registered or attached for an operation.
    #[error("handler for `{0}` not found")]
    NoHandler(String),
    /// No stored invocation result under the requested key.
    #[error("no invocation result for request `{request_id}` at `{path}`")]
    ResultNotFound {
        /// The operation path
        path: String,
        /// The request identifier
        request_id: String,
    },
}

/// A submodel service provider.
pub struct SubmodelProvider {
    pub(crate) submodel: Submodel,
    pub(crate) config: ProviderConfig,
    pub(crate) bindings: DashMap<String, ValueBinding>,
    pub(crate) operation_handlers: DashMap<String, OperationHandler>,
    pub(crate) event_delegates: DashMap<String, Vec<EventDelegate>>,
    pub(crate) results: Arc<DashMap<InvocationKey, StoredResult>>,
    pub(crate) publisher: Arc<RwLock<Option<Arc<dyn EventPublisher>>>>,
    pub(crate) topics: EventTopics,
}

impl SubmodelProvider {
    /// A provider owning the given submodel.
    ///
    /// Structural change events on the element tree are republished
    /// through the attached publisher, when one is present.
    #[must_use]
    pub fn new(submodel: Submodel, config: ProviderConfig) -> Self {
        let topics = EventTopics::new(&submodel.identification.id);
        let publisher: Arc<RwLock<Option<Arc<dyn EventPublisher>>>> =
            Arc::new(RwLock::new(None));

        {
            let publisher = Arc::clone(&publisher);
            let topics = topics.clone();
            submodel.elements().on_change(move |event| {
                let Some(publisher) = publisher.read().clone() else {
                    return;
                };
                let kind = match event.kind {
                    ChangeEventKind::Created => TopicKind::Created,
                    ChangeEventKind::Updated => TopicKind::Updated,
                    ChangeEventKind::Deleted => TopicKind::Deleted,
                };
                let topic = topics.element(&event.path, kind);
                let message = EventMessage::new(
                    topic.clone(),
                    event.path.clone(),
                    serde_json::json!({ "idShort": event.id_short }),
                );
                let bytes = match message.to_bytes() {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::warn!(error = %err, topic, "Failed to encode change event");
                        return;
                    }
                };
                if let Err(err) = publisher.publish(&topic, &bytes, Qos::AtLeastOnce, false) {
                    tracing::warn!(error = %err, topic, "Failed to publish change event");
                }
            });
        }

        tracing::info!(
            submodel_id = %submodel.identification.id,
            id_short = %submodel.id_short,
            "Submodel provider created"
        );

        Self {
            submodel,
            config,
            bindings: DashMap::new(),
            operation_handlers: DashMap::new(),
            event_delegates: DashMap::new(),
            results: Arc::new(DashMap::new()),
            publisher,
            topics,
        }
    }

    /// The owned submodel.
    #[must_use]
    pub fn submodel(&self) -> &Submodel {
        &self.submodel
    }

    /// The provider configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The topic scheme of this provider's submodel.
    #[must_use]
    pub fn topics(&self) -> &EventTopics {
        &self.topics
    }

    /// Attach the event transport.
    pub fn attach_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self.publisher.write() = Some(publisher);
    }

    // -- element CRUD delegation --------------------------------------

    /// Create a top-level element.
    ///
    /// # Errors
    ///
    /// As for the container contract.
    pub fn create_element(&self, element: SubmodelElement) -> Result<SubmodelElement, ProviderError> {
        Ok(self.submodel.elements().create(element)?)
    }

    /// Resolve an element by path.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not resolve.
    pub fn retrieve_element(&self, path: &str) -> Result<SubmodelElement, ProviderError> {
        Ok(self.submodel.elements().retrieve(path)?)
    }

    /// All elements of the submodel, value-then-descendants order.
    #[must_use]
    pub fn retrieve_elements(&self) -> Vec<SubmodelElement> {
        self.submodel.elements().flatten()
    }

    /// Replace the element at a path, creating it when absent.
    ///
    /// # Errors
    ///
    /// `NotFound` if the parent of an absent path is missing.
    pub fn update_element(
        &self,
        path: &str,
        element: SubmodelElement,
    ) -> Result<SubmodelElement, ProviderError> {
        Ok(self.submodel.elements().create_or_update(path, element)?)
    }

    /// Delete the element at a path.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not resolve.
    pub fn delete_element(&self, path: &str) -> Result<(), ProviderError> {
        Ok(self.submodel.elements().delete(path)?)
    }

    // -- value access -------------------------------------------------

    /// Produce the current value of the element at a path.
    ///
    /// A binding registered for the path takes precedence over the
    /// element's own handlers.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing element; binding errors otherwise.
    pub fn get_value(&self, path: &str) -> Result<Value, ProviderError> {
        let element = self.submodel.elements().retrieve(path)?;
        let registered = self.bindings.get(path).map(|entry| entry.value().clone());
        let value = match registered {
            Some(binding) => binding.get_value(path)?,
            None => element.get_value()?,
        };
        Ok(value)
    }

    /// Push a value to the element at a path, then raise a
    /// value-changed event to the path's delegates and the transport.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing element; binding errors otherwise.
    pub fn set_value(&self, path: &str, value: Value) -> Result<(), ProviderError> {
        let element = self.submodel.elements().retrieve(path)?;
        let registered = self.bindings.get(path).map(|entry| entry.value().clone());
        match registered {
            Some(binding) => binding.set_value(path, value.clone())?,
            None => element.set_value(value.clone())?,
        }
        self.raise_value_changed(path, &element, &value);
        Ok(())
    }

    fn raise_value_changed(&self, path: &str, element: &SubmodelElement, value: &Value) {
        let topic = self.topics.value_changed(path);
        let payload = serde_json::json!({
            "idShort": element.base().id_short,
            "value": value.payload,
            "valueType": value.value_type.object_type.xsd_name(),
        });
        let message = EventMessage::new(topic.clone(), path.to_string(), payload);

        let delegates = self
            .event_delegates
            .get(path)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        for delegate in delegates {
            delegate(&message);
        }

        if let Some(publisher) = self.publisher.read().clone() {
            match message.to_bytes() {
                Ok(bytes) => {
                    if let Err(err) = publisher.publish(&topic, &bytes, Qos::AtLeastOnce, false) {
                        tracing::warn!(error = %err, topic, path, "Failed to publish value change");
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, topic, path, "Failed to encode value change");
                }
            }
        }
    }

    // -- registries ---------------------------------------------------

    /// Register a value binding for a path, overriding the element's
    /// own handlers.
    pub fn register_value_binding(&self, path: impl Into<String>, binding: ValueBinding) {
        self.bindings.insert(path.into(), binding);
    }

    /// Register an operation handler for a path, taking precedence
    /// over the operation element's attached handler.
    pub fn register_operation_handler(&self, path: impl Into<String>, handler: OperationHandler) {
        self.operation_handlers.insert(path.into(), handler);
    }

    /// Register an event delegate for a path.
    pub fn register_event_delegate(&self, path: impl Into<String>, delegate: EventDelegate) {
        self.event_delegates
            .entry(path.into())
            .or_default()
            .push(delegate);
    }

    // -- explicit publication -----------------------------------------

    /// Publish an event message through the attached transport.
    ///
    /// # Errors
    ///
    /// `NoTransport` when no publisher is attached; transport errors
    /// otherwise.
    pub fn publish_event(&self, message: &EventMessage) -> Result<(), PublishError> {
        let publisher = self
            .publisher
            .read()
            .clone()
            .ok_or(PublishError::NoTransport)?;
        let bytes = message.to_bytes()?;
        publisher.publish(&message.topic, &bytes, Qos::AtLeastOnce, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aas_shellhost_model::{DataObjectType, DataType, Identifier, Property};
    use std::sync::Mutex;

    struct RecordingPublisher {
        published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl RecordingPublisher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                published: Mutex::new(Vec::new()),
            })
        }

        fn topics(&self) -> Vec<String> {
            self.published
                .lock()
                .unwrap()
                .iter()
                .map(|(topic, _)| topic.clone())
                .collect()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(
            &self,
            topic: &str,
            payload: &[u8],
            _qos: Qos,
            _retain: bool,
        ) -> Result<(), PublishError> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    fn provider() -> SubmodelProvider {
        let submodel = Submodel::new("Plant", Identifier::iri("urn:example:sm:plant"));
        submodel
            .add_element(SubmodelElement::from(Property::new(
                "Temperature",
                DataType::new(DataObjectType::Double),
            )))
            .unwrap();
        SubmodelProvider::new(submodel, ProviderConfig::default())
    }

    #[test]
    fn set_then_get_through_provider() {
        let provider = provider();
        provider
            .set_value("Temperature", Value::double(21.5))
            .unwrap();
        let value = provider.get_value("Temperature").unwrap();
        assert_eq!(value.to::<f64>().unwrap(), 21.5);
    }

    #[test]
    fn registered_binding_takes_precedence() {
        let provider = provider();
        provider
            .set_value("Temperature", Value::double(1.0))
            .unwrap();

        let live = ValueBinding::new(
            Arc::new(|| Ok(Value::double(99.9))),
            Arc::new(|_| Ok(())),
        );
        provider.register_value_binding("Temperature", live);

        let value = provider.get_value("Temperature").unwrap();
        assert_eq!(value.to::<f64>().unwrap(), 99.9);
    }

    #[test]
    fn missing_path_is_not_found() {
        let provider = provider();
        assert!(matches!(
            provider.get_value("Nowhere"),
            Err(ProviderError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn set_value_raises_delegates_and_publishes() {
        let provider = provider();
        let publisher = RecordingPublisher::new();
        provider.attach_publisher(publisher.clone());

        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        provider.register_event_delegate(
            "Temperature",
            Arc::new(move |message: &EventMessage| {
                sink.lock().unwrap().push(message.source_path.clone());
            }),
        );

        provider
            .set_value("Temperature", Value::double(30.0))
            .unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), ["Temperature".to_string()]);
        let topics = publisher.topics();
        assert_eq!(topics.len(), 1);
        assert!(topics[0].ends_with("/valueChanged"));
    }

    #[test]
    fn structural_changes_are_published() {
        let provider = provider();
        let publisher = RecordingPublisher::new();
        provider.attach_publisher(publisher.clone());

        provider
            .create_element(SubmodelElement::from(Property::new(
                "Pressure",
                DataType::new(DataObjectType::Double),
            )))
            .unwrap();
        provider.delete_element("Pressure").unwrap();

        let topics = publisher.topics();
        assert_eq!(topics.len(), 2);
        assert!(topics[0].ends_with("/created"));
        assert!(topics[1].ends_with("/deleted"));
    }

    #[test]
    fn publish_event_needs_transport() {
        let provider = provider();
        let message = EventMessage::new(
            provider.topics().element("Temperature", TopicKind::Event),
            "Temperature".to_string(),
            serde_json::json!({}),
        );
        assert!(matches!(
            provider.publish_event(&message),
            Err(PublishError::NoTransport)
        ));
    }
}
