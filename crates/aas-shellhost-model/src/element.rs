//! The closed set of submodel element variants and their value binding.
//!
//! Every leaf-bearing variant routes its current value through a
//! get/set handler pair instead of a plain field. Defaults installed at
//! construction close over the variant's own backing state; callers may
//! rebind either side per node to redirect to an external source, which
//! is how a node becomes "live". Element clones alias the same backing
//! state, so handing an element to concurrent code keeps everyone
//! looking at one value.

use crate::collection::SubmodelElementCollection;
use crate::datatype::{DataObjectType, DataType};
use crate::operation::Operation;
use crate::semantics::{Constraint, LangString, ModelingKind, Reference};
use crate::value::{ConversionError, Value};
use aas_shellhost_core::{ElementContainer, KindMismatch, Referable};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Errors raised by value binding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValueError {
    /// The element has no handler or backing value bound.
    #[error("element `{0}` has no value bound")]
    Unbound(String),
    /// Value coercion failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// A live value source failed to produce or accept a value.
    #[error("value source failed: {0}")]
    Source(String),
}

/// Read side of a value binding.
pub type GetHandler = Arc<dyn Fn() -> Result<Value, ValueError> + Send + Sync>;
/// Write side of a value binding.
pub type SetHandler = Arc<dyn Fn(Value) -> Result<(), ValueError> + Send + Sync>;

/// An overridable get/set handler pair.
#[derive(Clone)]
pub struct ValueBinding {
    get: Arc<RwLock<Option<GetHandler>>>,
    set: Arc<RwLock<Option<SetHandler>>>,
}

impl ValueBinding {
    /// A binding with both handlers installed.
    #[must_use]
    pub fn new(get: GetHandler, set: SetHandler) -> Self {
        Self {
            get: Arc::new(RwLock::new(Some(get))),
            set: Arc::new(RwLock::new(Some(set))),
        }
    }

    /// A binding with no handlers; reads and writes report `Unbound`
    /// until a caller binds them.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            get: Arc::new(RwLock::new(None)),
            set: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the read handler.
    pub fn bind_get(&self, handler: GetHandler) {
        *self.get.write() = Some(handler);
        tracing::debug!("read handler rebound");
    }

    /// Replace the write handler.
    pub fn bind_set(&self, handler: SetHandler) {
        *self.set.write() = Some(handler);
        tracing::debug!("write handler rebound");
    }

    /// Produce the current value through the read handler.
    ///
    /// # Errors
    ///
    /// `Unbound` when no handler is installed; otherwise whatever the
    /// handler reports.
    pub fn get_value(&self, id_short: &str) -> Result<Value, ValueError> {
        let handler = self.get.read().clone();
        match handler {
            Some(get) => get(),
            None => Err(ValueError::Unbound(id_short.to_string())),
        }
    }

    /// Push a value through the write handler.
    ///
    /// # Errors
    ///
    /// `Unbound` when no handler is installed; otherwise whatever the
    /// handler reports.
    pub fn set_value(&self, id_short: &str, value: Value) -> Result<(), ValueError> {
        let handler = self.set.read().clone();
        match handler {
            Some(set) => set(value),
            None => Err(ValueError::Unbound(id_short.to_string())),
        }
    }
}

/// Metadata common to all element variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementBase {
    /// Sibling-unique short name
    pub id_short: String,
    /// Classification category
    pub category: Option<String>,
    /// Human-readable descriptions
    pub description: Vec<LangString>,
    /// Reference to the semantic definition
    pub semantic_id: Option<Reference>,
    /// Template or instance
    pub kind: ModelingKind,
    /// Qualifiers and formulas
    pub constraints: Vec<Constraint>,
}

impl ElementBase {
    /// New metadata for the given `idShort`.
    #[must_use]
    pub fn new(id_short: impl Into<String>) -> Self {
        Self {
            id_short: id_short.into(),
            category: None,
            description: Vec::new(),
            semantic_id: None,
            kind: ModelingKind::Instance,
            constraints: Vec::new(),
        }
    }

    /// Attach a semantic reference.
    #[must_use]
    pub fn with_semantic_id(mut self, semantic_id: Reference) -> Self {
        self.semantic_id = Some(semantic_id);
        self
    }
}

// -- Property ---------------------------------------------------------

/// A single typed value.
#[derive(Clone)]
pub struct Property {
    /// Common metadata
    pub base: ElementBase,
    /// Declared value type
    pub value_type: DataType,
    backing: Arc<RwLock<Option<Value>>>,
    binding: ValueBinding,
}

impl Property {
    /// A property with an internal backing field and default handlers
    /// closing over it. Writes coerce to the declared type.
    #[must_use]
    pub fn new(id_short: impl Into<String>, value_type: DataType) -> Self {
        let base = ElementBase::new(id_short);
        let backing = Arc::new(RwLock::new(None::<Value>));
        let get = {
            let backing = Arc::clone(&backing);
            let id = base.id_short.clone();
            Arc::new(move || {
                backing
                    .read()
                    .clone()
                    .ok_or_else(|| ValueError::Unbound(id.clone()))
            }) as GetHandler
        };
        let set = {
            let backing = Arc::clone(&backing);
            let target = value_type.object_type;
            Arc::new(move |value: Value| {
                let coerced = if value.value_type.object_type == target {
                    value
                } else {
                    value.coerce(target)?
                };
                *backing.write() = Some(coerced);
                Ok(())
            }) as SetHandler
        };
        Self {
            base,
            value_type,
            backing,
            binding: ValueBinding::new(get, set),
        }
    }

    /// Seed the backing value through the write handler.
    ///
    /// # Errors
    ///
    /// Conversion errors from coercing to the declared type.
    pub fn with_value(self, value: Value) -> Result<Self, ValueError> {
        self.binding.set_value(&self.base.id_short, value)?;
        Ok(self)
    }

    /// The value binding of this property.
    #[must_use]
    pub fn binding(&self) -> &ValueBinding {
        &self.binding
    }
}

// -- MultiLanguageProperty --------------------------------------------

/// A set of language-tagged strings.
#[derive(Clone)]
pub struct MultiLanguageProperty {
    /// Common metadata
    pub base: ElementBase,
    backing: Arc<RwLock<Vec<LangString>>>,
    binding: ValueBinding,
}

impl MultiLanguageProperty {
    /// An empty multi-language property.
    #[must_use]
    pub fn new(id_short: impl Into<String>) -> Self {
        let base = ElementBase::new(id_short);
        let backing = Arc::new(RwLock::new(Vec::<LangString>::new()));
        let get = {
            let backing = Arc::clone(&backing);
            Arc::new(move || {
                let texts = backing.read().clone();
                let payload = serde_json::to_value(texts)
                    .map_err(|e| ValueError::Source(e.to_string()))?;
                Ok(Value::new(
                    payload,
                    DataType::collection_of(DataObjectType::LangString),
                ))
            }) as GetHandler
        };
        let set = {
            let backing = Arc::clone(&backing);
            Arc::new(move |value: Value| {
                let texts: Vec<LangString> = value.to()?;
                *backing.write() = texts;
                Ok(())
            }) as SetHandler
        };
        Self {
            base,
            backing,
            binding: ValueBinding::new(get, set),
        }
    }

    /// Add one language-tagged text.
    #[must_use]
    pub fn with_text(self, language: &str, text: &str) -> Self {
        self.backing.write().push(LangString::new(language, text));
        self
    }
}

// -- Range ------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RangeBounds {
    min: Option<serde_json::Value>,
    max: Option<serde_json::Value>,
}

/// A min/max pair of one scalar kind.
#[derive(Clone)]
pub struct RangeElement {
    /// Common metadata
    pub base: ElementBase,
    /// Declared type of both bounds
    pub value_type: DataType,
    backing: Arc<RwLock<RangeBounds>>,
    binding: ValueBinding,
}

impl RangeElement {
    /// A range with unset bounds.
    #[must_use]
    pub fn new(id_short: impl Into<String>, value_type: DataType) -> Self {
        let base = ElementBase::new(id_short);
        let backing = Arc::new(RwLock::new(RangeBounds::default()));
        let get = {
            let backing = Arc::clone(&backing);
            Arc::new(move || {
                let bounds = backing.read().clone();
                let payload = serde_json::to_value(bounds)
                    .map_err(|e| ValueError::Source(e.to_string()))?;
                Ok(Value::json(payload))
            }) as GetHandler
        };
        let set = {
            let backing = Arc::clone(&backing);
            let target = value_type.object_type;
            Arc::new(move |value: Value| {
                let mut bounds: RangeBounds = value.to()?;
                for bound in [&mut bounds.min, &mut bounds.max] {
                    if let Some(payload) = bound.take() {
                        let coerced = Value::json(payload).coerce(target)?;
                        *bound = Some(coerced.payload);
                    }
                }
                *backing.write() = bounds;
                Ok(())
            }) as SetHandler
        };
        Self {
            base,
            value_type,
            backing,
            binding: ValueBinding::new(get, set),
        }
    }
}

// -- File and Blob ----------------------------------------------------

/// A reference to a file by path or URI.
#[derive(Clone)]
pub struct FileElement {
    /// Common metadata
    pub base: ElementBase,
    /// MIME type of the referenced content
    pub content_type: String,
    backing: Arc<RwLock<String>>,
    binding: ValueBinding,
}

impl FileElement {
    /// A file element with an empty path.
    #[must_use]
    pub fn new(id_short: impl Into<String>, content_type: impl Into<String>) -> Self {
        let base = ElementBase::new(id_short);
        let backing = Arc::new(RwLock::new(String::new()));
        let get = {
            let backing = Arc::clone(&backing);
            Arc::new(move || {
                Ok(Value::new(
                    serde_json::Value::String(backing.read().clone()),
                    DataType::new(DataObjectType::AnyUri),
                ))
            }) as GetHandler
        };
        let set = {
            let backing = Arc::clone(&backing);
            Arc::new(move |value: Value| {
                *backing.write() = value.to::<String>()?;
                Ok(())
            }) as SetHandler
        };
        Self {
            base,
            content_type: content_type.into(),
            backing,
            binding: ValueBinding::new(get, set),
        }
    }
}

/// Binary content carried inline, exposed base64-encoded.
#[derive(Clone)]
pub struct Blob {
    /// Common metadata
    pub base: ElementBase,
    /// MIME type of the content
    pub content_type: String,
    backing: Arc<RwLock<Vec<u8>>>,
    binding: ValueBinding,
}

impl Blob {
    /// An empty blob.
    #[must_use]
    pub fn new(id_short: impl Into<String>, content_type: impl Into<String>) -> Self {
        let base = ElementBase::new(id_short);
        let backing = Arc::new(RwLock::new(Vec::<u8>::new()));
        let get = {
            let backing = Arc::clone(&backing);
            Arc::new(move || {
                let encoded = STANDARD.encode(backing.read().as_slice());
                Ok(Value::new(
                    serde_json::Value::String(encoded),
                    DataType::new(DataObjectType::Base64Binary),
                ))
            }) as GetHandler
        };
        let set = {
            let backing = Arc::clone(&backing);
            Arc::new(move |value: Value| {
                let text = value.to::<String>()?;
                let bytes = STANDARD
                    .decode(text.as_bytes())
                    .map_err(|e| ValueError::Source(format!("invalid base64: {e}")))?;
                *backing.write() = bytes;
                Ok(())
            }) as SetHandler
        };
        Self {
            base,
            content_type: content_type.into(),
            backing,
            binding: ValueBinding::new(get, set),
        }
    }

    /// Seed the content bytes.
    #[must_use]
    pub fn with_bytes(self, bytes: Vec<u8>) -> Self {
        *self.backing.write() = bytes;
        self
    }
}

// -- Reference and relationship elements ------------------------------

/// A single reference value.
#[derive(Clone)]
pub struct ReferenceElement {
    /// Common metadata
    pub base: ElementBase,
    backing: Arc<RwLock<Option<Reference>>>,
    binding: ValueBinding,
}

impl ReferenceElement {
    /// A reference element with no target yet.
    #[must_use]
    pub fn new(id_short: impl Into<String>) -> Self {
        let base = ElementBase::new(id_short);
        let backing = Arc::new(RwLock::new(None::<Reference>));
        let get = {
            let backing = Arc::clone(&backing);
            let id = base.id_short.clone();
            Arc::new(move || {
                let reference = backing
                    .read()
                    .clone()
                    .ok_or_else(|| ValueError::Unbound(id.clone()))?;
                let payload = serde_json::to_value(reference)
                    .map_err(|e| ValueError::Source(e.to_string()))?;
                Ok(Value::json(payload))
            }) as GetHandler
        };
        let set = {
            let backing = Arc::clone(&backing);
            Arc::new(move |value: Value| {
                *backing.write() = Some(value.to::<Reference>()?);
                Ok(())
            }) as SetHandler
        };
        Self {
            base,
            backing,
            binding: ValueBinding::new(get, set),
        }
    }

    /// Seed the target reference.
    #[must_use]
    pub fn with_reference(self, reference: Reference) -> Self {
        *self.backing.write() = Some(reference);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RelationEnds {
    first: Option<Reference>,
    second: Option<Reference>,
}

fn relation_binding(backing: &Arc<RwLock<RelationEnds>>) -> ValueBinding {
    let get = {
        let backing = Arc::clone(backing);
        Arc::new(move || {
            let ends = backing.read().clone();
            let payload =
                serde_json::to_value(ends).map_err(|e| ValueError::Source(e.to_string()))?;
            Ok(Value::json(payload))
        }) as GetHandler
    };
    let set = {
        let backing = Arc::clone(backing);
        Arc::new(move |value: Value| {
            *backing.write() = value.to::<RelationEnds>()?;
            Ok(())
        }) as SetHandler
    };
    ValueBinding::new(get, set)
}

/// A directed relation between two referenced elements. Its value form
/// is the synthetic `{first, second}` composite.
#[derive(Clone)]
pub struct RelationshipElement {
    /// Common metadata
    pub base: ElementBase,
    backing: Arc<RwLock<RelationEnds>>,
    binding: ValueBinding,
}

impl RelationshipElement {
    /// A relationship with unset ends.
    #[must_use]
    pub fn new(id_short: impl Into<String>) -> Self {
        let backing = Arc::new(RwLock::new(RelationEnds::default()));
        let binding = relation_binding(&backing);
        Self {
            base: ElementBase::new(id_short),
            backing,
            binding,
        }
    }

    /// Set both ends.
    #[must_use]
    pub fn with_ends(self, first: Reference, second: Reference) -> Self {
        *self.backing.write() = RelationEnds {
            first: Some(first),
            second: Some(second),
        };
        self
    }
}

/// A relationship annotated with further data elements.
#[derive(Clone)]
pub struct AnnotatedRelationshipElement {
    /// Common metadata
    pub base: ElementBase,
    backing: Arc<RwLock<RelationEnds>>,
    annotations: ElementContainer<SubmodelElement>,
    binding: ValueBinding,
}

impl AnnotatedRelationshipElement {
    /// A relationship with an empty annotation container.
    #[must_use]
    pub fn new(id_short: impl Into<String>) -> Self {
        let backing = Arc::new(RwLock::new(RelationEnds::default()));
        let binding = relation_binding(&backing);
        Self {
            base: ElementBase::new(id_short),
            backing,
            annotations: ElementContainer::new(),
            binding,
        }
    }

    /// Set both ends.
    #[must_use]
    pub fn with_ends(self, first: Reference, second: Reference) -> Self {
        *self.backing.write() = RelationEnds {
            first: Some(first),
            second: Some(second),
        };
        self
    }

    /// The annotation container.
    #[must_use]
    pub fn annotations(&self) -> &ElementContainer<SubmodelElement> {
        &self.annotations
    }
}

// -- Entity -----------------------------------------------------------

/// How an entity's lifecycle is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    /// Managed together with a co-managing party
    CoManagedEntity,
    /// Managed by the entity itself
    SelfManagedEntity,
}

/// An entity with statements and an optional global asset reference.
#[derive(Clone)]
pub struct Entity {
    /// Common metadata
    pub base: ElementBase,
    /// Lifecycle management kind
    pub entity_type: EntityType,
    asset: Arc<RwLock<Option<Reference>>>,
    statements: ElementContainer<SubmodelElement>,
    binding: ValueBinding,
}

impl Entity {
    /// An entity with an empty statement container.
    #[must_use]
    pub fn new(id_short: impl Into<String>, entity_type: EntityType) -> Self {
        let asset = Arc::new(RwLock::new(None::<Reference>));
        let get = {
            let asset = Arc::clone(&asset);
            Arc::new(move || {
                let payload = serde_json::json!({
                    "entityType": entity_type,
                    "globalAssetId": asset.read().clone(),
                });
                Ok(Value::json(payload))
            }) as GetHandler
        };
        let set = {
            let asset = Arc::clone(&asset);
            Arc::new(move |value: Value| {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct EntityValue {
                    global_asset_id: Option<Reference>,
                }
                let parsed: EntityValue = value.to()?;
                *asset.write() = parsed.global_asset_id;
                Ok(())
            }) as SetHandler
        };
        Self {
            base: ElementBase::new(id_short),
            entity_type,
            asset,
            statements: ElementContainer::new(),
            binding: ValueBinding::new(get, set),
        }
    }

    /// Set the global asset reference.
    #[must_use]
    pub fn with_asset(self, reference: Reference) -> Self {
        *self.asset.write() = Some(reference);
        self
    }

    /// The statement container.
    #[must_use]
    pub fn statements(&self) -> &ElementContainer<SubmodelElement> {
        &self.statements
    }
}

// -- Events -----------------------------------------------------------

/// An event element with no default value semantics; reads and writes
/// report unbound until a live binding is attached.
#[derive(Clone)]
pub struct EventElement {
    /// Common metadata
    pub base: ElementBase,
    binding: ValueBinding,
}

impl EventElement {
    /// A plain event element.
    #[must_use]
    pub fn new(id_short: impl Into<String>) -> Self {
        Self {
            base: ElementBase::new(id_short),
            binding: ValueBinding::unbound(),
        }
    }
}

/// An event observing one referenced element.
#[derive(Clone)]
pub struct BasicEvent {
    /// Common metadata
    pub base: ElementBase,
    backing: Arc<RwLock<Reference>>,
    binding: ValueBinding,
}

impl BasicEvent {
    /// A basic event observing the given reference.
    #[must_use]
    pub fn new(id_short: impl Into<String>, observed: Reference) -> Self {
        let backing = Arc::new(RwLock::new(observed));
        let get = {
            let backing = Arc::clone(&backing);
            Arc::new(move || {
                let payload = serde_json::to_value(backing.read().clone())
                    .map_err(|e| ValueError::Source(e.to_string()))?;
                Ok(Value::json(payload))
            }) as GetHandler
        };
        let set = {
            let backing = Arc::clone(&backing);
            Arc::new(move |value: Value| {
                *backing.write() = value.to::<Reference>()?;
                Ok(())
            }) as SetHandler
        };
        Self {
            base: ElementBase::new(id_short),
            backing,
            binding: ValueBinding::new(get, set),
        }
    }

    /// The observed reference.
    #[must_use]
    pub fn observed(&self) -> Reference {
        self.backing.read().clone()
    }
}

// -- The closed variant set -------------------------------------------

/// A typed node in the submodel tree.
#[derive(Clone)]
pub enum SubmodelElement {
    /// Single typed value
    Property(Property),
    /// Language-tagged string set
    MultiLanguageProperty(MultiLanguageProperty),
    /// Min/max pair
    Range(RangeElement),
    /// File reference
    File(FileElement),
    /// Inline binary content
    Blob(Blob),
    /// Single reference value
    ReferenceElement(ReferenceElement),
    /// Relation between two elements
    RelationshipElement(RelationshipElement),
    /// Relation with annotations
    AnnotatedRelationshipElement(AnnotatedRelationshipElement),
    /// Entity with statements
    Entity(Entity),
    /// Invocable behavior
    Operation(Operation),
    /// Plain event
    Event(EventElement),
    /// Event observing a reference
    BasicEvent(BasicEvent),
    /// Nested element collection
    Collection(SubmodelElementCollection),
}

impl SubmodelElement {
    /// Common metadata of the wrapped variant.
    #[must_use]
    pub fn base(&self) -> &ElementBase {
        match self {
            Self::Property(e) => &e.base,
            Self::MultiLanguageProperty(e) => &e.base,
            Self::Range(e) => &e.base,
            Self::File(e) => &e.base,
            Self::Blob(e) => &e.base,
            Self::ReferenceElement(e) => &e.base,
            Self::RelationshipElement(e) => &e.base,
            Self::AnnotatedRelationshipElement(e) => &e.base,
            Self::Entity(e) => &e.base,
            Self::Operation(e) => &e.base,
            Self::Event(e) => &e.base,
            Self::BasicEvent(e) => &e.base,
            Self::Collection(e) => &e.base,
        }
    }

    /// The model type name of the wrapped variant.
    #[must_use]
    pub fn model_type(&self) -> &'static str {
        match self {
            Self::Property(_) => "Property",
            Self::MultiLanguageProperty(_) => "MultiLanguageProperty",
            Self::Range(_) => "Range",
            Self::File(_) => "File",
            Self::Blob(_) => "Blob",
            Self::ReferenceElement(_) => "ReferenceElement",
            Self::RelationshipElement(_) => "RelationshipElement",
            Self::AnnotatedRelationshipElement(_) => "AnnotatedRelationshipElement",
            Self::Entity(_) => "Entity",
            Self::Operation(_) => "Operation",
            Self::Event(_) => "Event",
            Self::BasicEvent(_) => "BasicEvent",
            Self::Collection(_) => "SubmodelElementCollection",
        }
    }

    /// The value binding of the wrapped variant.
    #[must_use]
    pub fn binding(&self) -> &ValueBinding {
        match self {
            Self::Property(e) => &e.binding,
            Self::MultiLanguageProperty(e) => &e.binding,
            Self::Range(e) => &e.binding,
            Self::File(e) => &e.binding,
            Self::Blob(e) => &e.binding,
            Self::ReferenceElement(e) => &e.binding,
            Self::RelationshipElement(e) => &e.binding,
            Self::AnnotatedRelationshipElement(e) => &e.binding,
            Self::Entity(e) => &e.binding,
            Self::Operation(e) => e.binding(),
            Self::Event(e) => &e.binding,
            Self::BasicEvent(e) => &e.binding,
            Self::Collection(e) => e.binding(),
        }
    }

    /// Produce the current value through the element's binding.
    ///
    /// # Errors
    ///
    /// Whatever the bound handler reports, or `Unbound`.
    pub fn get_value(&self) -> Result<Value, ValueError> {
        self.binding().get_value(self.base().id_short.as_str())
    }

    /// Push a value through the element's binding.
    ///
    /// # Errors
    ///
    /// Whatever the bound handler reports, or `Unbound`.
    pub fn set_value(&self, value: Value) -> Result<(), ValueError> {
        self.binding().set_value(self.base().id_short.as_str(), value)
    }

    /// Redirect the read side to an external source.
    pub fn bind_get(&self, handler: GetHandler) {
        self.binding().bind_get(handler);
    }

    /// Redirect the write side to an external sink.
    pub fn bind_set(&self, handler: SetHandler) {
        self.binding().bind_set(handler);
    }

    /// A fresh element of the same kind, structure, and typing with
    /// cleared backing state. Used to materialize output argument
    /// skeletons that mirror declared types, not values.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        match self {
            Self::Property(e) => {
                let mut fresh = Property::new(e.base.id_short.clone(), e.value_type.clone());
                fresh.base = e.base.clone();
                Self::Property(fresh)
            }
            Self::MultiLanguageProperty(e) => {
                let mut fresh = MultiLanguageProperty::new(e.base.id_short.clone());
                fresh.base = e.base.clone();
                Self::MultiLanguageProperty(fresh)
            }
            Self::Range(e) => {
                let mut fresh = RangeElement::new(e.base.id_short.clone(), e.value_type.clone());
                fresh.base = e.base.clone();
                Self::Range(fresh)
            }
            Self::File(e) => {
                let mut fresh = FileElement::new(e.base.id_short.clone(), e.content_type.clone());
                fresh.base = e.base.clone();
                Self::File(fresh)
            }
            Self::Blob(e) => {
                let mut fresh = Blob::new(e.base.id_short.clone(), e.content_type.clone());
                fresh.base = e.base.clone();
                Self::Blob(fresh)
            }
            Self::ReferenceElement(e) => {
                let mut fresh = ReferenceElement::new(e.base.id_short.clone());
                fresh.base = e.base.clone();
                Self::ReferenceElement(fresh)
            }
            Self::RelationshipElement(e) => {
                let mut fresh = RelationshipElement::new(e.base.id_short.clone());
                fresh.base = e.base.clone();
                Self::RelationshipElement(fresh)
            }
            Self::AnnotatedRelationshipElement(e) => {
                let mut fresh = AnnotatedRelationshipElement::new(e.base.id_short.clone());
                fresh.base = e.base.clone();
                Self::AnnotatedRelationshipElement(fresh)
            }
            Self::Entity(e) => {
                let mut fresh = Entity::new(e.base.id_short.clone(), e.entity_type);
                fresh.base = e.base.clone();
                Self::Entity(fresh)
            }
            Self::Operation(e) => Self::Operation(e.empty_like()),
            Self::Event(e) => {
                let mut fresh = EventElement::new(e.base.id_short.clone());
                fresh.base = e.base.clone();
                Self::Event(fresh)
            }
            Self::BasicEvent(e) => {
                let mut fresh = BasicEvent::new(e.base.id_short.clone(), e.observed());
                fresh.base = e.base.clone();
                Self::BasicEvent(fresh)
            }
            Self::Collection(e) => Self::Collection(e.empty_like()),
        }
    }
}

impl fmt::Debug for SubmodelElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.model_type(), self.base().id_short)
    }
}

impl Referable for SubmodelElement {
    fn id_short(&self) -> &str {
        &self.base().id_short
    }

    fn nested(&self) -> Option<ElementContainer<SubmodelElement>> {
        match self {
            Self::Collection(e) => Some(e.container().clone()),
            Self::Entity(e) => Some(e.statements().clone()),
            Self::AnnotatedRelationshipElement(e) => Some(e.annotations().clone()),
            _ => None,
        }
    }
}

macro_rules! element_variant {
    ($variant:ident, $name:literal, $ty:ty) => {
        impl From<$ty> for SubmodelElement {
            fn from(inner: $ty) -> Self {
                SubmodelElement::$variant(inner)
            }
        }

        impl TryFrom<SubmodelElement> for $ty {
            type Error = KindMismatch;

            fn try_from(element: SubmodelElement) -> Result<Self, Self::Error> {
                match element {
                    SubmodelElement::$variant(inner) => Ok(inner),
                    other => Err(KindMismatch::new($name, other.model_type())),
                }
            }
        }
    };
}

element_variant!(Property, "Property", Property);
element_variant!(MultiLanguageProperty, "MultiLanguageProperty", MultiLanguageProperty);
element_variant!(Range, "Range", RangeElement);
element_variant!(File, "File", FileElement);
element_variant!(Blob, "Blob", Blob);
element_variant!(ReferenceElement, "ReferenceElement", ReferenceElement);
element_variant!(RelationshipElement, "RelationshipElement", RelationshipElement);
element_variant!(
    AnnotatedRelationshipElement,
    "AnnotatedRelationshipElement",
    AnnotatedRelationshipElement
);
element_variant!(Entity, "Entity", Entity);
element_variant!(Operation, "Operation", Operation);
element_variant!(Event, "Event", EventElement);
element_variant!(BasicEvent, "BasicEvent", BasicEvent);
element_variant!(Collection, "SubmodelElementCollection", SubmodelElementCollection);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_set_then_get_roundtrip() {
        let property = Property::new("Temperature", DataType::new(DataObjectType::Double));
        let element = SubmodelElement::from(property);

        element.set_value(Value::double(25.5)).unwrap();
        let value = element.get_value().unwrap();
        assert_eq!(value.to::<f64>().unwrap(), 25.5);
    }

    #[test]
    fn property_write_coerces_to_declared_type() {
        let property = Property::new("Count", DataType::new(DataObjectType::Int32));
        let element = SubmodelElement::from(property);

        element.set_value(Value::string("17")).unwrap();
        let value = element.get_value().unwrap();
        assert_eq!(value.payload, serde_json::json!(17));
        assert_eq!(value.value_type.object_type, DataObjectType::Int32);
    }

    #[test]
    fn unread_property_is_unbound() {
        let element = SubmodelElement::from(Property::new(
            "Pressure",
            DataType::new(DataObjectType::Double),
        ));
        assert!(matches!(element.get_value(), Err(ValueError::Unbound(_))));
    }

    #[test]
    fn clones_alias_live_state() {
        let element = SubmodelElement::from(Property::new(
            "Speed",
            DataType::new(DataObjectType::Int64),
        ));
        let alias = element.clone();

        alias.set_value(Value::integer(90, DataObjectType::Int64)).unwrap();
        assert_eq!(element.get_value().unwrap().to::<i64>().unwrap(), 90);
    }

    #[test]
    fn override_makes_value_live() {
        let element = SubmodelElement::from(Property::new(
            "SensorReading",
            DataType::new(DataObjectType::Int64),
        ));
        let reads = Arc::new(std::sync::atomic::AtomicI64::new(0));
        let source = Arc::clone(&reads);
        element.bind_get(Arc::new(move || {
            let n = source.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Value::integer(n, DataObjectType::Int64))
        }));

        assert_eq!(element.get_value().unwrap().to::<i64>().unwrap(), 0);
        assert_eq!(element.get_value().unwrap().to::<i64>().unwrap(), 1);
    }

    #[test]
    fn relationship_composes_structural_value() {
        let rel = RelationshipElement::new("Link").with_ends(
            Reference::global("urn:a"),
            Reference::global("urn:b"),
        );
        let value = SubmodelElement::from(rel).get_value().unwrap();
        assert!(value.payload["first"]["keys"][0]["value"] == "urn:a");
        assert!(value.payload["second"]["keys"][0]["value"] == "urn:b");
    }

    #[test]
    fn blob_roundtrips_base64() {
        let blob = Blob::new("Manual", "application/pdf").with_bytes(b"hello".to_vec());
        let element = SubmodelElement::from(blob);
        let value = element.get_value().unwrap();
        assert_eq!(value.to::<String>().unwrap(), "aGVsbG8=");

        element.set_value(Value::string("aGk=")).unwrap();
        assert_eq!(element.get_value().unwrap().to::<String>().unwrap(), "aGk=");
    }

    #[test]
    fn empty_like_clears_state_but_keeps_typing() {
        let property = Property::new("Out", DataType::new(DataObjectType::Int32));
        let seeded = SubmodelElement::from(
            property.with_value(Value::integer(5, DataObjectType::Int32)).unwrap(),
        );

        let skeleton = seeded.empty_like();
        assert!(matches!(skeleton.get_value(), Err(ValueError::Unbound(_))));
        match &skeleton {
            SubmodelElement::Property(p) => {
                assert_eq!(p.value_type.object_type, DataObjectType::Int32);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        // The original is untouched
        assert_eq!(seeded.get_value().unwrap().to::<i32>().unwrap(), 5);
    }

    #[test]
    fn typed_narrowing_reports_kind() {
        let element = SubmodelElement::from(ReferenceElement::new("Ref"));
        let err = Property::try_from(element).map(|_| ()).unwrap_err();
        assert_eq!(err.expected, "Property");
        assert_eq!(err.found, "ReferenceElement");
    }
}
