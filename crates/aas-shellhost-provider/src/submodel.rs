//! The submodel aggregate.

use aas_shellhost_core::{ElementContainer, StoreError};
use aas_shellhost_model::{
    AdministrativeInformation, Identifier, ModelingKind, Reference, SubmodelElement,
};

/// A named collection of submodel elements describing one aspect of an
/// asset.
///
/// Clones alias the same element tree.
#[derive(Clone)]
pub struct Submodel {
    /// Globally unique identification
    pub identification: Identifier,
    /// Version metadata
    pub administration: Option<AdministrativeInformation>,
    /// Short name
    pub id_short: String,
    /// Reference to the semantic definition
    pub semantic_id: Option<Reference>,
    /// Template or instance
    pub kind: ModelingKind,
    elements: ElementContainer<SubmodelElement>,
}

impl Submodel {
    /// A new submodel with an empty element tree.
    #[must_use]
    pub fn new(id_short: impl Into<String>, identification: Identifier) -> Self {
        Self {
            identification,
            administration: None,
            id_short: id_short.into(),
            semantic_id: None,
            kind: ModelingKind::Instance,
            elements: ElementContainer::new(),
        }
    }

    /// Attach a semantic reference.
    #[must_use]
    pub fn with_semantic_id(mut self, semantic_id: Reference) -> Self {
        self.semantic_id = Some(semantic_id);
        self
    }

    /// Attach version metadata.
    #[must_use]
    pub fn with_administration(mut self, administration: AdministrativeInformation) -> Self {
        self.administration = Some(administration);
        self
    }

    /// The element tree of this submodel.
    #[must_use]
    pub fn elements(&self) -> &ElementContainer<SubmodelElement> {
        &self.elements
    }

    /// Add a top-level element.
    ///
    /// # Errors
    ///
    /// `Conflict` on a duplicate `idShort`, `InvalidArgument` on an
    /// empty one.
    pub fn add_element(&self, element: SubmodelElement) -> Result<SubmodelElement, StoreError> {
        self.elements.create(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aas_shellhost_model::{DataObjectType, DataType, Property};

    #[test]
    fn submodel_owns_its_tree() {
        let submodel = Submodel::new(
            "OperationalData",
            Identifier::iri("urn:example:sm:operationaldata"),
        );
        submodel
            .add_element(SubmodelElement::from(Property::new(
                "Temperature",
                DataType::new(DataObjectType::Double),
            )))
            .unwrap();

        assert!(submodel.elements().has_child("Temperature"));
        // Clones alias the same tree
        assert!(submodel.clone().elements().has_child("Temperature"));
    }
}
