//! References, qualifiers, and common AAS metadata.

use serde::{Deserialize, Serialize};

/// Kind of identifier carried by a [`Key`] or [`Identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdType {
    /// An IRI (the common case for AAS identifiers)
    Iri,
    /// An IRDI per ISO/IEC 11179-6
    Irdi,
    /// A local `idShort`
    IdShort,
    /// Any other scheme
    Custom,
}

/// The model element kind a [`Key`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyElement {
    /// An Asset Administration Shell
    AssetAdministrationShell,
    /// An asset
    Asset,
    /// A submodel
    Submodel,
    /// Any submodel element
    SubmodelElement,
    /// A property element
    Property,
    /// An operation element
    Operation,
    /// A concept description
    ConceptDescription,
    /// A reference outside the AAS environment
    GlobalReference,
}

/// One step of a [`Reference`] chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// What kind of element the key addresses
    pub element: KeyElement,
    /// The identifier value
    pub value: String,
    /// The identifier scheme of `value`
    pub id_type: IdType,
}

impl Key {
    /// Create a new key.
    #[must_use]
    pub fn new(element: KeyElement, value: impl Into<String>, id_type: IdType) -> Self {
        Self {
            element,
            value: value.into(),
            id_type,
        }
    }
}

/// A chain of keys addressing a model element or external resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The key chain, outermost first
    pub keys: Vec<Key>,
}

impl Reference {
    /// A reference made of a single key.
    #[must_use]
    pub fn single(key: Key) -> Self {
        Self { keys: vec![key] }
    }

    /// A global reference to an external resource by IRI.
    #[must_use]
    pub fn global(iri: impl Into<String>) -> Self {
        Self::single(Key::new(KeyElement::GlobalReference, iri, IdType::Iri))
    }

    /// The innermost key, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Key> {
        self.keys.last()
    }
}

/// The identification of an Identifiable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// The globally unique identifier
    pub id: String,
    /// The identifier scheme
    pub id_type: IdType,
}

impl Identifier {
    /// An IRI identifier.
    #[must_use]
    pub fn iri(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            id_type: IdType::Iri,
        }
    }
}

/// Version metadata of an Identifiable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrativeInformation {
    /// Version string
    pub version: Option<String>,
    /// Revision string
    pub revision: Option<String>,
}

/// A language-tagged string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangString {
    /// BCP 47 language tag
    pub language: String,
    /// The text in that language
    pub text: String,
}

impl LangString {
    /// Create a new language-tagged string.
    #[must_use]
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
        }
    }
}

/// Whether an element is a template or a concrete instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelingKind {
    /// A reusable template
    Template,
    /// A concrete instance
    #[default]
    Instance,
}

/// A constraint attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modelType", rename_all = "camelCase")]
pub enum Constraint {
    /// A typed qualifier value
    #[serde(rename_all = "camelCase")]
    Qualifier {
        /// The qualifier kind (e.g. "Cardinality")
        qualifier_type: String,
        /// XSD name of the value type
        value_type: String,
        /// The qualifier value
        value: Option<String>,
        /// Reference to the semantics of the value
        value_id: Option<Reference>,
    },
    /// A formula over other elements
    #[serde(rename_all = "camelCase")]
    Formula {
        /// Elements the formula depends on
        depends_on: Vec<Reference>,
    },
}
