use aas_shellhost_model::{
    DataObjectType, DataType, Identifier, Property, Reference, ReferenceElement,
    SubmodelElement, SubmodelElementCollection, Value, ValueBinding,
};
use aas_shellhost_provider::{
    EventMessage, EventPublisher, ProviderConfig, PublishError, Qos, Submodel, SubmodelProvider,
    TopicKind,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

struct RecordingPublisher {
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingPublisher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
        })
    }

    fn messages(&self) -> Vec<(String, EventMessage)> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, bytes)| {
                (
                    topic.clone(),
                    serde_json::from_slice(bytes).expect("event payload is JSON"),
                )
            })
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

fn machine_provider() -> SubmodelProvider {
    let submodel = Submodel::new(
        "OperationalData",
        Identifier::iri("urn:example:sm:operationaldata"),
    );

    let status = SubmodelElementCollection::new("Status", false, true);
    status
        .add(SubmodelElement::from(Property::new(
            "Mode",
            DataType::new(DataObjectType::String),
        )))
        .unwrap();
    status
        .add(SubmodelElement::from(Property::new(
            "Uptime",
            DataType::new(DataObjectType::UInt64),
        )))
        .unwrap();

    submodel.add_element(SubmodelElement::from(status)).unwrap();
    submodel
        .add_element(SubmodelElement::from(Property::new(
            "Temperature",
            DataType::new(DataObjectType::Double),
        )))
        .unwrap();

    SubmodelProvider::new(submodel, ProviderConfig::default())
}

#[test]
fn nested_value_access_through_provider() -> Result<()> {
    let provider = machine_provider();

    provider.set_value("Status/Mode", Value::string("running"))?;
    provider.set_value("Status/Uptime", Value::integer(3600, DataObjectType::UInt64))?;

    let mode: String = provider.get_value("Status/Mode")?.to()?;
    assert_eq!(mode, "running");

    // The collection's own value form is a map keyed by idShort
    let status = provider.retrieve_element("Status")?;
    let composed = status.get_value()?;
    assert_eq!(composed.payload["Mode"], "running");
    assert_eq!(composed.payload["Uptime"], 3600);
    Ok(())
}

#[test]
fn round_trip_across_scalar_kinds() -> Result<()> {
    let submodel = Submodel::new("Types", Identifier::iri("urn:example:sm:types"));
    let provider = SubmodelProvider::new(submodel, ProviderConfig::default());

    let samples = [
        (DataObjectType::String, serde_json::json!("abc")),
        (DataObjectType::Bool, serde_json::json!(true)),
        (DataObjectType::Int8, serde_json::json!(-7)),
        (DataObjectType::Int32, serde_json::json!(-70_000)),
        (DataObjectType::Int64, serde_json::json!(1_234_567_890_123_i64)),
        (DataObjectType::UInt16, serde_json::json!(60_000)),
        (DataObjectType::UInt64, serde_json::json!(9_000_000_000_u64)),
        (DataObjectType::Double, serde_json::json!(2.75)),
        (DataObjectType::Float, serde_json::json!(0.5)),
        (DataObjectType::AnyUri, serde_json::json!("https://example.org/x")),
        (DataObjectType::DateTime, serde_json::json!("2024-03-01T10:00:00+00:00")),
        (DataObjectType::Duration, serde_json::json!("PT90S")),
        (DataObjectType::Base64Binary, serde_json::json!("aGVsbG8=")),
        (DataObjectType::HexBinary, serde_json::json!("0AFF")),
    ];

    for (kind, payload) in samples {
        let id = format!("P{}", kind.xsd_name());
        provider.create_element(SubmodelElement::from(Property::new(
            id.clone(),
            DataType::new(kind),
        )))?;

        provider.set_value(&id, Value::json(payload.clone()))?;
        let read = provider.get_value(&id)?;

        // Written values come back convertible to the written form
        let reread = Value::json(payload).coerce(kind)?;
        assert_eq!(read.payload, reread.payload, "{kind:?}");
    }
    Ok(())
}

#[test]
fn live_binding_redirects_a_stored_element() -> Result<()> {
    let provider = machine_provider();

    let sensor = Arc::new(Mutex::new(18.0_f64));
    let source = Arc::clone(&sensor);
    let sink = Arc::clone(&sensor);
    provider.register_value_binding(
        "Temperature",
        ValueBinding::new(
            Arc::new(move || Ok(Value::double(*source.lock().unwrap()))),
            Arc::new(move |value| {
                *sink.lock().unwrap() = value.to::<f64>().map_err(|e| {
                    aas_shellhost_model::ValueError::Source(e.to_string())
                })?;
                Ok(())
            }),
        ),
    );

    assert_eq!(provider.get_value("Temperature")?.to::<f64>()?, 18.0);

    *sensor.lock().unwrap() = 23.5;
    assert_eq!(provider.get_value("Temperature")?.to::<f64>()?, 23.5);

    provider.set_value("Temperature", Value::double(30.0))?;
    assert_eq!(*sensor.lock().unwrap(), 30.0);
    Ok(())
}

#[test]
fn typed_retrieval_distinguishes_kind_mismatch() {
    let provider = machine_provider();
    provider
        .create_element(SubmodelElement::from(ReferenceElement::new(
            "AssetRef",
        )))
        .unwrap();

    let elements = provider.submodel().elements();
    assert!(elements.retrieve_typed::<ReferenceElement>("AssetRef").is_ok());

    let err = elements
        .retrieve_typed::<Property>("AssetRef")
        .map(|_| ())
        .unwrap_err();
    assert!(err.to_string().contains("not Property"));
}

#[test]
fn change_and_value_events_reach_the_transport() -> Result<()> {
    let provider = machine_provider();
    let publisher = RecordingPublisher::new();
    provider.attach_publisher(publisher.clone());

    provider.create_element(SubmodelElement::from(Property::new(
        "Vibration",
        DataType::new(DataObjectType::Double),
    )))?;
    provider.set_value("Vibration", Value::double(0.2))?;
    provider.delete_element("Vibration")?;

    let messages = publisher.messages();
    let kinds: Vec<TopicKind> = messages
        .iter()
        .map(|(topic, _)| provider.topics().parse(topic).expect("own topic").1)
        .collect();
    assert_eq!(
        kinds,
        [TopicKind::Created, TopicKind::ValueChanged, TopicKind::Deleted]
    );

    let (_, value_event) = &messages[1];
    assert_eq!(value_event.source_path, "Vibration");
    assert_eq!(value_event.payload["value"], 0.2);
    assert_eq!(value_event.payload["valueType"], "double");
    Ok(())
}

#[test]
fn explicit_event_publication() -> Result<()> {
    let provider = machine_provider();
    let publisher = RecordingPublisher::new();
    provider.attach_publisher(publisher.clone());

    let topic = provider.topics().element("Temperature", TopicKind::Event);
    let message = EventMessage::new(
        topic.clone(),
        "Temperature".to_string(),
        serde_json::json!({"alarm": "overheat"}),
    );
    provider.publish_event(&message)?;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, topic);
    assert_eq!(messages[0].1.payload["alarm"], "overheat");
    Ok(())
}

#[test]
fn reference_element_round_trip() -> Result<()> {
    let provider = machine_provider();
    provider.create_element(SubmodelElement::from(
        ReferenceElement::new("AssetRef")
            .with_reference(Reference::global("urn:example:asset:42")),
    ))?;

    let value = provider.get_value("AssetRef")?;
    let reference: Reference = value.to()?;
    assert_eq!(reference.last().unwrap().value, "urn:example:asset:42");
    Ok(())
}
