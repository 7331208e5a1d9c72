//! Concept description collection.
//!
//! Concept descriptions are never stored; they are projected from the
//! element tree at encode time, one per distinct `semanticId`.

use crate::model::{ConceptDescription, ElementContent, Submodel, SubmodelElement};
use std::collections::{HashMap, HashSet};

/// Collect concept descriptions from every submodel.
///
/// Elements are visited depth-first in document order. The first element
/// carrying a given `semanticId` supplies the metadata; later elements with
/// the same identifier are ignored.
#[must_use]
pub fn collect_concept_descriptions(submodels: &[Submodel]) -> Vec<ConceptDescription> {
    let mut collector = Collector::default();
    for submodel in submodels {
        collector.walk(&submodel.elements);
    }
    tracing::debug!(
        submodels = submodels.len(),
        concepts = collector.out.len(),
        "Collected concept descriptions"
    );
    collector.out
}

/// Collect concept descriptions from a single element tree.
#[must_use]
pub fn collect_from_elements(elements: &[SubmodelElement]) -> Vec<ConceptDescription> {
    let mut collector = Collector::default();
    collector.walk(elements);
    collector.out
}

/// Fill empty IEC 61360 fields of elements from matching concept descriptions.
///
/// Documents that keep semantic metadata only in their concept descriptions
/// (as legacy packages do) decode to elements without names or units; this
/// copies them back. Fields already set on an element are left alone.
/// Returns the number of elements that received metadata.
pub fn hydrate_from_concepts(submodels: &mut [Submodel], concepts: &[ConceptDescription]) -> usize {
    let by_id: HashMap<&str, &ConceptDescription> =
        concepts.iter().map(|c| (c.id.as_str(), c)).collect();
    let mut hydrated = 0;
    for submodel in submodels {
        hydrate_elements(&mut submodel.elements, &by_id, &mut hydrated);
    }
    hydrated
}

fn hydrate_elements(
    elements: &mut [SubmodelElement],
    by_id: &HashMap<&str, &ConceptDescription>,
    hydrated: &mut usize,
) {
    for element in elements {
        if let Some(concept) = element
            .semantic_id
            .as_deref()
            .and_then(|id| by_id.get(id.trim()))
        {
            let before = element.has_iec_metadata();
            if element.preferred_name.is_empty() {
                element.preferred_name = concept.preferred_name.clone();
            }
            if element.short_name.is_empty() {
                element.short_name = concept.short_name.clone();
            }
            if element.unit.is_none() {
                element.unit = concept.unit.clone();
            }
            if element.data_type.is_none() {
                element.data_type = concept.data_type;
            }
            if element.description.is_none() {
                element.description = concept.description.clone();
            }
            if !before && element.has_iec_metadata() {
                *hydrated += 1;
            }
        }
        match &mut element.content {
            ElementContent::Collection { children } | ElementContent::List { children } => {
                hydrate_elements(children, by_id, hydrated);
            }
            ElementContent::Entity { statements, .. } => {
                hydrate_elements(statements, by_id, hydrated);
            }
            ElementContent::AnnotatedRelationship { annotations, .. } => {
                hydrate_elements(annotations, by_id, hydrated);
            }
            ElementContent::Operation {
                input,
                output,
                inoutput,
            } => {
                hydrate_elements(input, by_id, hydrated);
                hydrate_elements(output, by_id, hydrated);
                hydrate_elements(inoutput, by_id, hydrated);
            }
            _ => {}
        }
    }
}

#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    out: Vec<ConceptDescription>,
}

impl Collector {
    fn walk(&mut self, elements: &[SubmodelElement]) {
        for element in elements {
            self.visit(element);
            for group in element.nested_groups() {
                self.walk(group);
            }
        }
    }

    fn visit(&mut self, element: &SubmodelElement) {
        let Some(semantic_id) = element.semantic_id.as_deref().map(str::trim) else {
            return;
        };
        if semantic_id.is_empty() || !self.seen.insert(semantic_id.to_string()) {
            return;
        }

        let value_type = match &element.content {
            ElementContent::Property { value_type, .. }
            | ElementContent::Range { value_type, .. } => *value_type,
            _ => None,
        };

        self.out.push(ConceptDescription {
            id: semantic_id.to_string(),
            id_short: element.id_short.clone(),
            preferred_name: element.preferred_name.clone(),
            short_name: element.short_name.clone(),
            unit: element.unit.clone(),
            data_type: element.data_type,
            description: element.description.clone(),
            value_type,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IecDataType, XsdType};

    fn prop(id_short: &str, semantic_id: &str) -> SubmodelElement {
        SubmodelElement::property(id_short, Some(XsdType::String), "").with_semantic_id(semantic_id)
    }

    #[test]
    fn shared_semantic_id_yields_one_concept() {
        let mut first = prop("SerialNumber", "0173-1#02-AAM556#002");
        first.unit = Some("-".to_string());
        first.data_type = Some(IecDataType::String);
        let second = prop("SerialNo", "0173-1#02-AAM556#002");

        let mut sm = Submodel::new("Nameplate", "https://ex/sm/1");
        sm.elements = vec![first, second];

        let concepts = collect_concept_descriptions(&[sm]);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].id_short, "SerialNumber");
        assert_eq!(concepts[0].unit.as_deref(), Some("-"));
        assert_eq!(concepts[0].value_type, Some(XsdType::String));
    }

    #[test]
    fn document_order_is_preorder() {
        let tree = vec![
            SubmodelElement::collection("Outer", vec![prop("Inner", "urn:inner")])
                .with_semantic_id("urn:outer"),
            prop("After", "urn:after"),
        ];
        let ids: Vec<_> = collect_from_elements(&tree)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, ["urn:outer", "urn:inner", "urn:after"]);
    }

    #[test]
    fn blank_semantic_ids_are_skipped() {
        let tree = vec![prop("A", "  "), SubmodelElement::property("B", None, "")];
        assert!(collect_from_elements(&tree).is_empty());
    }

    #[test]
    fn hydration_fills_only_empty_fields() {
        let mut concepts = collect_from_elements(&[{
            let mut e = prop("Source", "urn:c");
            e.unit = Some("mm".to_string());
            e.preferred_name.insert("en".to_string(), "Length".to_string());
            e
        }]);
        concepts[0].data_type = Some(IecDataType::RealMeasure);

        let mut target = prop("Target", "urn:c");
        target.unit = Some("m".to_string());
        let mut sm = Submodel::new("S", "urn:s");
        sm.elements = vec![SubmodelElement::collection("Group", vec![target])];
        let mut submodels = vec![sm];

        assert_eq!(hydrate_from_concepts(&mut submodels, &concepts), 0);
        let hydrated = &submodels[0].elements[0].children().unwrap()[0];
        assert_eq!(hydrated.unit.as_deref(), Some("m"));
        assert_eq!(hydrated.preferred_name.get("en").map(String::as_str), Some("Length"));
        assert_eq!(hydrated.data_type, Some(IecDataType::RealMeasure));
    }

    #[test]
    fn dedup_spans_submodels() {
        let mut a = Submodel::new("A", "urn:a");
        a.elements = vec![prop("X", "urn:x")];
        let mut b = Submodel::new("B", "urn:b");
        b.elements = vec![prop("Y", "urn:x"), prop("Z", "urn:z")];
        let concepts = collect_concept_descriptions(&[a, b]);
        assert_eq!(concepts.len(), 2);
        assert_eq!(concepts[0].id_short, "X");
    }
}
