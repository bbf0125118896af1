//! Submodel element collections.
//!
//! A collection is simultaneously an element and a container: CRUD
//! delegates to an owned child container, and the collection's own
//! value form is composed from that container. The
//! `allow_duplicates`/`ordered` flag pair is a data contract, not an
//! internal detail: with both set the collection reads as an array of
//! raw values (index identity), otherwise as a map keyed by `idShort`
//! (name identity).

use crate::datatype::{DataObjectType, DataType};
use crate::element::{ElementBase, GetHandler, SetHandler, SubmodelElement, ValueBinding, ValueError};
use crate::value::Value;
use aas_shellhost_core::{ElementContainer, StoreError};
use std::sync::Arc;

/// An element that owns a nested container of further elements.
#[derive(Clone)]
pub struct SubmodelElementCollection {
    /// Common metadata
    pub base: ElementBase,
    allow_duplicates: bool,
    ordered: bool,
    container: ElementContainer<SubmodelElement>,
    binding: ValueBinding,
}

impl SubmodelElementCollection {
    /// A collection with the given identity flags.
    #[must_use]
    pub fn new(id_short: impl Into<String>, allow_duplicates: bool, ordered: bool) -> Self {
        let container = ElementContainer::new();
        let get = {
            let container = container.clone();
            Arc::new(move || Ok(collection_value(&container, allow_duplicates && ordered)))
                as GetHandler
        };
        let set = Arc::new(move |_: Value| {
            Err(ValueError::Source(
                "collection value is composed from its children".to_string(),
            ))
        }) as SetHandler;
        Self {
            base: ElementBase::new(id_short),
            allow_duplicates,
            ordered,
            container,
            binding: ValueBinding::new(get, set),
        }
    }

    /// Whether duplicate values are allowed.
    #[must_use]
    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// Whether insertion order is significant.
    #[must_use]
    pub fn ordered(&self) -> bool {
        self.ordered
    }

    /// The owned child container.
    #[must_use]
    pub fn container(&self) -> &ElementContainer<SubmodelElement> {
        &self.container
    }

    /// The value binding of this collection.
    #[must_use]
    pub fn binding(&self) -> &ValueBinding {
        &self.binding
    }

    /// Append a child element.
    ///
    /// # Errors
    ///
    /// `Conflict` on a duplicate sibling `idShort`.
    pub fn add(&self, element: SubmodelElement) -> Result<SubmodelElement, StoreError> {
        self.container.create(element)
    }

    /// Resolve a child element by path.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not resolve.
    pub fn retrieve(&self, path: &str) -> Result<SubmodelElement, StoreError> {
        self.container.retrieve(path)
    }

    /// Remove a child element by path.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not resolve.
    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.container.delete(path)
    }

    /// A fresh collection mirroring this one's flags and child
    /// structure, with all backing values cleared.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        let mut fresh = Self::new(
            self.base.id_short.clone(),
            self.allow_duplicates,
            self.ordered,
        );
        fresh.base = self.base.clone();
        for child in self.container.retrieve_all() {
            // Children were sibling-unique already; re-adding cannot conflict
            let _ = fresh.container.create(child.empty_like());
        }
        fresh
    }
}

/// Compose the collection's value form from its children: an array of
/// raw values under index identity, a map keyed by `idShort` otherwise.
fn collection_value(container: &ElementContainer<SubmodelElement>, as_array: bool) -> Value {
    let children = container.retrieve_all();
    let payload = if as_array {
        serde_json::Value::Array(
            children
                .iter()
                .map(|child| child.get_value().map_or(serde_json::Value::Null, |v| v.payload))
                .collect(),
        )
    } else {
        let mut map = serde_json::Map::new();
        for child in &children {
            let value = child
                .get_value()
                .map_or(serde_json::Value::Null, |v| v.payload);
            map.insert(child.base().id_short.clone(), value);
        }
        serde_json::Value::Object(map)
    };
    Value::new(payload, DataType::collection_of(DataObjectType::AnyType))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Property;

    fn seeded(id: &str, n: i64) -> SubmodelElement {
        SubmodelElement::from(
            Property::new(id, DataType::new(DataObjectType::Int64))
                .with_value(Value::integer(n, DataObjectType::Int64))
                .unwrap(),
        )
    }

    #[test]
    fn ordered_duplicates_read_as_array() {
        let collection = SubmodelElementCollection::new("Readings", true, true);
        collection.add(seeded("R1", 1)).unwrap();
        collection.add(seeded("R2", 2)).unwrap();
        collection.add(seeded("R3", 3)).unwrap();

        let value = SubmodelElement::from(collection).get_value().unwrap();
        assert_eq!(value.payload, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn name_identity_reads_as_map() {
        let collection = SubmodelElementCollection::new("Limits", false, true);
        collection.add(seeded("Low", 0)).unwrap();
        collection.add(seeded("High", 100)).unwrap();

        let value = SubmodelElement::from(collection).get_value().unwrap();
        assert_eq!(value.payload, serde_json::json!({"Low": 0, "High": 100}));
    }

    #[test]
    fn duplicate_id_short_rejected() {
        let collection = SubmodelElementCollection::new("Set", false, false);
        collection.add(seeded("X", 1)).unwrap();
        assert!(matches!(
            collection.add(seeded("X", 2)),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn insertion_order_preserved_through_flatten() {
        let collection = SubmodelElementCollection::new("Seq", true, true);
        for (id, n) in [("C", 3), ("A", 1), ("B", 2)] {
            collection.add(seeded(id, n)).unwrap();
        }

        let ids: Vec<String> = collection
            .container()
            .flatten()
            .iter()
            .map(|e| e.base().id_short.clone())
            .collect();
        assert_eq!(ids, ["C", "A", "B"]);
    }

    #[test]
    fn nested_collection_path_descent() {
        let outer = SubmodelElementCollection::new("Outer", false, true);
        let inner = SubmodelElementCollection::new("Inner", false, true);
        inner.add(seeded("Leaf", 42)).unwrap();
        outer.add(SubmodelElement::from(inner)).unwrap();

        let leaf = outer.retrieve("Inner/Leaf").unwrap();
        assert_eq!(leaf.get_value().unwrap().to::<i64>().unwrap(), 42);
    }

    #[test]
    fn empty_like_mirrors_structure() {
        let collection = SubmodelElementCollection::new("Args", true, true);
        collection.add(seeded("N", 9)).unwrap();

        let skeleton = collection.empty_like();
        let child = skeleton.retrieve("N").unwrap();
        assert!(child.get_value().is_err());
        assert!(skeleton.allow_duplicates());
    }
}
