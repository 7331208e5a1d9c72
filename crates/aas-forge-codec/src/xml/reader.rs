//! AAS XML reader for the 1.0, 3.0 and 3.1 dialects.

use super::dom::{self, Node};
use super::{Dialect, CARDINALITY_TYPES};
use crate::document::{Decoded, SourceFormat};
use crate::error::CodecError;
use aas_forge_core::model::{ElementContent, Key, Reference, ReferenceType, ReferenceValue};
use aas_forge_core::types::normalize_value_type;
use aas_forge_core::{
    hydrate_from_concepts, AssetKind, Cardinality, ConceptDescription, EntityType, Environment,
    IecDataType, LangMap, ModelType, ModellingKind, Shell, Submodel, SubmodelElement, Thumbnail,
    XsdType,
};

/// Decode an AAS XML document in any supported dialect.
///
/// Legacy 1.0 documents keep IEC 61360 metadata in concept descriptions;
/// it is copied back onto the elements that reference them.
///
/// # Errors
///
/// Returns error if the XML is malformed or the namespace is not an AAS dialect.
pub fn decode_xml(input: &[u8]) -> Result<Decoded, CodecError> {
    let root = dom::parse(input)?;
    let dialect = root_dialect(&root)?;

    let shell_node = root
        .child("assetAdministrationShells")
        .and_then(|n| n.child("assetAdministrationShell"));
    let mut shell = shell_node.map(read_shell).unwrap_or_default();
    if dialect == Dialect::V1_0 {
        apply_legacy_asset(&root, &mut shell);
    }
    let submodel_refs = shell_node.map(read_submodel_refs).unwrap_or_default();

    let mut submodels: Vec<Submodel> = root
        .child("submodels")
        .map(|n| n.children_named("submodel").map(read_submodel).collect())
        .unwrap_or_default();

    let concept_descriptions: Vec<ConceptDescription> = root
        .child("conceptDescriptions")
        .map(|n| n.children_named("conceptDescription").map(read_concept).collect())
        .unwrap_or_default();

    if dialect == Dialect::V1_0 {
        let hydrated = hydrate_from_concepts(&mut submodels, &concept_descriptions);
        tracing::warn!(
            hydrated,
            "Legacy AAS 1.0 document read in compatibility mode"
        );
    }

    tracing::debug!(
        %dialect,
        submodels = submodels.len(),
        concepts = concept_descriptions.len(),
        "Decoded XML environment"
    );

    Ok(Decoded {
        environment: Environment::new(shell, submodels),
        submodel_refs,
        concept_descriptions,
        format: SourceFormat::Xml(dialect),
    })
}

fn root_dialect(root: &Node) -> Result<Dialect, CodecError> {
    if let Some(dialect) = root
        .attrs
        .iter()
        .filter(|(k, _)| k.starts_with("xmlns"))
        .find_map(|(_, v)| Dialect::from_namespace(v))
    {
        return Ok(dialect);
    }
    let declared = root
        .attrs
        .iter()
        .find(|(k, _)| k.starts_with("xmlns"))
        .map_or_else(|| "no namespace".to_string(), |(_, v)| v.clone());
    Err(CodecError::UnsupportedDialect(declared))
}

fn read_id(node: &Node) -> String {
    node.child_text("id")
        .or_else(|| node.child_text("identification"))
        .unwrap_or_default()
}

fn read_shell(node: &Node) -> Shell {
    let mut shell = Shell::new(
        node.child_text("idShort").unwrap_or_default(),
        read_id(node),
    );
    if let Some(info) = node.child("assetInformation") {
        if let Some(kind) = info.child_text("assetKind") {
            shell.asset_kind = AssetKind::from_name(&kind);
        }
        shell.global_asset_id = read_text_or_reference(info, "globalAssetId");
        if let Some(thumb) = info.child("defaultThumbnail") {
            if let Some(path) = thumb.child_text("path") {
                shell.thumbnail = Some(Thumbnail {
                    path,
                    content_type: thumb.child_text("contentType").unwrap_or_default(),
                    data: Vec::new(),
                });
            }
        }
    }
    if shell.global_asset_id.is_none() {
        shell.global_asset_id = node
            .child("assetRef")
            .and_then(read_reference)
            .and_then(|r| r.first_value().map(str::to_string));
    }
    shell
}

/// 1.0 documents describe the asset in a separate `assets` section.
fn apply_legacy_asset(root: &Node, shell: &mut Shell) {
    let Some(asset) = root.child("assets").and_then(|n| n.child("asset")) else {
        return;
    };
    if let Some(kind) = asset.child_text("kind") {
        shell.asset_kind = AssetKind::from_name(&kind);
    }
    if shell.global_asset_id.is_none() {
        let id = read_id(asset);
        shell.global_asset_id = (!id.is_empty()).then_some(id);
    }
}

fn read_submodel_refs(node: &Node) -> Vec<String> {
    let refs: Vec<&Node> = match node.child("submodels") {
        Some(list) => list.children_named("reference").collect(),
        None => node
            .child("submodelRefs")
            .map(|n| n.children_named("submodelRef").collect())
            .unwrap_or_default(),
    };
    refs.into_iter()
        .filter_map(read_reference)
        .filter_map(|r| r.first_value().map(str::to_string))
        .collect()
}

fn read_submodel(node: &Node) -> Submodel {
    let mut submodel = Submodel::new(
        node.child_text("idShort").unwrap_or_default(),
        read_id(node),
    );
    if let Some(kind) = node.child_text("kind") {
        submodel.kind = ModellingKind::from_name(&kind);
    }
    submodel.semantic_id = read_semantic_id(node);
    submodel.elements = node
        .child("submodelElements")
        .map(read_elements)
        .unwrap_or_default();
    submodel
}

/// A reference in `type` + `keys/key` form; 1.0 keys carry the type as an attribute.
fn read_reference(node: &Node) -> Option<Reference> {
    let keys: Vec<Key> = node
        .child("keys")?
        .children_named("key")
        .filter_map(|key| {
            let value = key.child_text("value").or_else(|| key.text())?;
            let key_type = key
                .child_text("type")
                .or_else(|| key.attr("type").map(str::to_string))
                .unwrap_or_else(|| "GlobalReference".to_string());
            Some(Key { key_type, value })
        })
        .collect();
    if keys.is_empty() {
        return None;
    }
    let reference_type = node
        .child_text("type")
        .map_or(ReferenceType::ExternalReference, |t| ReferenceType::from_name(&t));
    Some(Reference {
        reference_type,
        keys,
    })
}

fn read_semantic_id(node: &Node) -> Option<String> {
    let semantic = node.child("semanticId")?;
    read_reference(semantic)
        .and_then(|r| r.first_value().map(str::to_string))
        .or_else(|| semantic.text())
}

/// Plain text, or the first key of a reference, under `name`.
fn read_text_or_reference(node: &Node, name: &str) -> Option<String> {
    let child = node.child(name)?;
    child.text().or_else(|| {
        read_reference(child).and_then(|r| r.first_value().map(str::to_string))
    })
}

/// Language-tagged strings in any of the historical spellings.
fn read_lang_strings(node: &Node) -> LangMap {
    node.children
        .iter()
        .filter(|c| c.name.starts_with("langString"))
        .filter_map(|entry| {
            let language = entry
                .attr("lang")
                .map(str::to_string)
                .or_else(|| entry.child_text("language"))?;
            let text = entry
                .child_raw_text("text")
                .or_else(|| entry.raw_text())?;
            Some((language, text))
        })
        .collect()
}

/// English entry if present, otherwise the first one.
fn pick_english(strings: &LangMap) -> Option<String> {
    strings
        .iter()
        .find(|(lang, _)| lang.eq_ignore_ascii_case("en"))
        .or_else(|| strings.iter().next())
        .map(|(_, text)| text.clone())
}

fn read_description(node: &Node) -> Option<String> {
    node.child("description")
        .map(read_lang_strings)
        .and_then(|strings| pick_english(&strings))
}

fn read_value_type(node: &Node, name: &str) -> Option<XsdType> {
    let raw_node = node.child(name)?;
    // 1.0 sometimes nests the name in dataObjectType.
    let raw = raw_node.text().or_else(|| {
        raw_node
            .find_descendant(&|n: &Node| n.name == "name")
            .and_then(Node::text)
    })?;
    let value_type = normalize_value_type(Some(&raw));
    if value_type.is_none() {
        tracing::warn!(value_type = %raw, "Unknown valueType dropped");
    }
    value_type
}

fn read_cardinality(node: &Node) -> Cardinality {
    let mut candidates = Vec::new();
    for container in ["qualifiers", "qualifier"] {
        if let Some(found) = node.child(container) {
            candidates.push(found);
            found.descendants_named("qualifier", &mut candidates);
        }
    }
    candidates
        .into_iter()
        .filter(|q| {
            q.child_text("type")
                .is_some_and(|t| CARDINALITY_TYPES.contains(&t.as_str()))
        })
        .find_map(|q| q.child_text("value").and_then(|v| v.parse().ok()))
        .unwrap_or_default()
}

/// IEC 61360 content of an embedded data specification.
#[derive(Default)]
struct IecContent {
    preferred_name: LangMap,
    short_name: LangMap,
    unit: Option<String>,
    data_type: Option<IecDataType>,
    definition: Option<String>,
    value_format: Option<XsdType>,
}

fn read_iec(node: &Node) -> IecContent {
    let Some(block) = ["embeddedDataSpecifications", "embeddedDataSpecification"]
        .into_iter()
        .filter_map(|name| node.child(name))
        .find_map(|eds| {
            eds.find_descendant(&|n: &Node| {
                n.name.eq_ignore_ascii_case("dataSpecificationIec61360")
            })
        })
    else {
        return IecContent::default();
    };

    let data_type = block.child_text("dataType").and_then(|raw| {
        let parsed = raw.parse::<IecDataType>().ok();
        if parsed.is_none() {
            tracing::warn!(data_type = %raw, "Unknown IEC 61360 dataType dropped");
        }
        parsed
    });

    IecContent {
        preferred_name: block
            .child("preferredName")
            .map(read_lang_strings)
            .unwrap_or_default(),
        short_name: block
            .child("shortName")
            .map(read_lang_strings)
            .unwrap_or_default(),
        unit: block.child_text("unit"),
        data_type,
        definition: block
            .child("definition")
            .map(read_lang_strings)
            .and_then(|strings| pick_english(&strings)),
        value_format: block
            .child_text("valueFormat")
            .and_then(|raw| normalize_value_type(Some(&raw))),
    }
}

/// Unwrap `submodelElement` / `dataElement` wrappers down to the typed node.
fn typed_node(node: &Node) -> Option<&Node> {
    match node.name.as_str() {
        "submodelElement" | "dataElement" => node.children.first(),
        _ => Some(node),
    }
}

fn read_elements(container: &Node) -> Vec<SubmodelElement> {
    container
        .children
        .iter()
        .filter_map(typed_node)
        .filter_map(read_element)
        .collect()
}

fn read_child_elements(node: &Node, name: &str) -> Vec<SubmodelElement> {
    node.child(name).map(read_elements).unwrap_or_default()
}

fn read_variables(node: &Node, name: &str) -> Vec<SubmodelElement> {
    let Some(group) = node.child(name) else {
        return Vec::new();
    };
    let mut variables = Vec::new();
    group.descendants_named("operationVariable", &mut variables);
    variables
        .into_iter()
        .filter_map(|var| var.child("value"))
        .filter_map(|value| value.children.first())
        .filter_map(typed_node)
        .filter_map(read_element)
        .collect()
}

fn read_element(node: &Node) -> Option<SubmodelElement> {
    let Some(model_type) = ModelType::from_name(&node.name) else {
        tracing::warn!(tag = %node.name, "Unknown element tag skipped");
        return None;
    };

    let content = match model_type {
        ModelType::Property => ElementContent::Property {
            value_type: read_value_type(node, "valueType"),
            value: node.child_raw_text("value").unwrap_or_default(),
        },
        ModelType::MultiLanguageProperty => ElementContent::MultiLanguageProperty {
            value: node.child("value").map(read_lang_strings).unwrap_or_default(),
        },
        ModelType::SubmodelElementCollection => ElementContent::Collection {
            children: read_child_elements(node, "value"),
        },
        ModelType::SubmodelElementList => ElementContent::List {
            children: read_child_elements(node, "value"),
        },
        ModelType::File => ElementContent::File {
            value: node.child_text("value").unwrap_or_default(),
            content_type: node
                .child_text("contentType")
                .or_else(|| node.child_text("mimeType")),
            file_data: None,
        },
        ModelType::ReferenceElement => ElementContent::ReferenceElement {
            value: read_reference_value(node),
        },
        ModelType::Range => ElementContent::Range {
            value_type: read_value_type(node, "valueType"),
            min: node.child_raw_text("min"),
            max: node.child_raw_text("max"),
        },
        ModelType::Blob => ElementContent::Blob {
            content_type: node
                .child_text("contentType")
                .or_else(|| node.child_text("mimeType")),
            value: read_blob(node),
        },
        ModelType::Capability => ElementContent::Capability,
        ModelType::Entity => ElementContent::Entity {
            entity_type: node
                .child_text("entityType")
                .map_or_else(EntityType::default, |t| EntityType::from_name(&t)),
            global_asset_id: read_text_or_reference(node, "globalAssetId").or_else(|| {
                node.child("assetRef")
                    .and_then(read_reference)
                    .and_then(|r| r.first_value().map(str::to_string))
            }),
            statements: read_child_elements(node, "statements"),
        },
        ModelType::RelationshipElement => ElementContent::Relationship {
            first: node.child("first").and_then(read_reference),
            second: node.child("second").and_then(read_reference),
        },
        ModelType::AnnotatedRelationshipElement => ElementContent::AnnotatedRelationship {
            first: node.child("first").and_then(read_reference),
            second: node.child("second").and_then(read_reference),
            annotations: read_child_elements(node, "annotations"),
        },
        ModelType::Operation => ElementContent::Operation {
            input: read_variables(node, "inputVariables"),
            output: read_variables(node, "outputVariables"),
            inoutput: read_variables(node, "inoutputVariables"),
        },
        ModelType::BasicEventElement => ElementContent::BasicEvent {
            observed: node.child("observed").and_then(read_reference),
            direction: node.child_text("direction"),
            state: node.child_text("state"),
            message_topic: node.child_text("messageTopic"),
        },
    };

    let iec = read_iec(node);
    let id_short = node.child_text("idShort").unwrap_or_default();
    let mut element = SubmodelElement::new(id_short, content);
    element.category = node.child_text("category");
    element.description = read_description(node).or(iec.definition);
    element.semantic_id = read_semantic_id(node);
    element.cardinality = read_cardinality(node);
    element.preferred_name = iec.preferred_name;
    element.short_name = iec.short_name;
    element.unit = iec.unit;
    element.data_type = iec.data_type;
    Some(element)
}

fn read_reference_value(node: &Node) -> ReferenceValue {
    if let Some(reference) = node.child("value").and_then(read_reference) {
        return ReferenceValue::Keys(reference);
    }
    match read_text_or_reference(node, "valueId").or_else(|| node.child_text("value")) {
        Some(target) => ReferenceValue::Scalar(target),
        None => ReferenceValue::Unset,
    }
}

fn read_blob(node: &Node) -> Vec<u8> {
    let Some(text) = node.child_text("value") else {
        return Vec::new();
    };
    crate::encoding::decode_payload(&text).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Blob value is not base64, dropped");
        Vec::new()
    })
}

fn read_concept(node: &Node) -> ConceptDescription {
    let iec = read_iec(node);
    ConceptDescription {
        id: read_id(node),
        id_short: node.child_text("idShort").unwrap_or_default(),
        preferred_name: iec.preferred_name,
        short_name: iec.short_name,
        unit: iec.unit,
        data_type: iec.data_type,
        description: read_description(node).or(iec.definition),
        value_type: iec.value_format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_namespace_is_rejected() {
        let err = decode_xml(br#"<environment xmlns="urn:other"/>"#).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedDialect(ns) if ns == "urn:other"));
    }

    #[test]
    fn reads_3_0_property_with_qualifier() {
        let xml = br#"<?xml version="1.0"?>
<environment xmlns="https://admin-shell.io/aas/3/0">
  <submodels>
    <submodel>
      <idShort>TechnicalData</idShort>
      <id>https://ex/sm/td</id>
      <submodelElements>
        <property>
          <idShort>MaxTemp</idShort>
          <qualifiers>
            <qualifier>
              <type>SMT/Cardinality</type>
              <valueType>xs:string</valueType>
              <value>ZeroToOne</value>
            </qualifier>
          </qualifiers>
          <valueType>xs:double</valueType>
          <value>85.5</value>
        </property>
        <somethingElse><idShort>Skip</idShort></somethingElse>
      </submodelElements>
    </submodel>
  </submodels>
</environment>"#;
        let decoded = decode_xml(xml).unwrap();
        assert_eq!(decoded.format, SourceFormat::Xml(Dialect::V3_0));
        let elements = &decoded.environment.submodels[0].elements;
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].cardinality, Cardinality::ZeroToOne);
        assert_eq!(
            elements[0].content,
            ElementContent::Property {
                value_type: Some(XsdType::Double),
                value: "85.5".to_string()
            }
        );
    }

    #[test]
    fn reference_element_value_forms() {
        let xml = br#"<environment xmlns="https://admin-shell.io/aas/3/1"><submodels><submodel>
<idShort>S</idShort><id>urn:s</id><submodelElements>
<referenceElement><idShort>Keyed</idShort><value><type>ModelReference</type>
<keys><key><type>Submodel</type><value>urn:x</value></key></keys></value></referenceElement>
<referenceElement><idShort>Scalar</idShort><valueId>https://ex/y</valueId></referenceElement>
</submodelElements></submodel></submodels></environment>"#;
        let decoded = decode_xml(xml).unwrap();
        let elements = &decoded.environment.submodels[0].elements;
        assert_eq!(
            elements[0].content,
            ElementContent::ReferenceElement {
                value: ReferenceValue::Keys(Reference::model("Submodel", "urn:x"))
            }
        );
        assert_eq!(
            elements[1].content,
            ElementContent::ReferenceElement {
                value: ReferenceValue::Scalar("https://ex/y".to_string())
            }
        );
    }

    #[test]
    fn iec_definition_backfills_description() {
        let xml = br#"<environment xmlns="https://admin-shell.io/aas/3/1"><submodels><submodel>
<idShort>S</idShort><id>urn:s</id><submodelElements><property><idShort>P</idShort>
<valueType>xs:string</valueType>
<embeddedDataSpecifications><embeddedDataSpecification><dataSpecificationContent>
<dataSpecificationIec61360>
<preferredName><langStringPreferredNameTypeIec61360><language>de</language><text>Wert</text></langStringPreferredNameTypeIec61360></preferredName>
<dataType>NOT_A_TYPE</dataType>
<definition><langStringDefinitionTypeIec61360><language>en</language><text>A value</text></langStringDefinitionTypeIec61360></definition>
</dataSpecificationIec61360></dataSpecificationContent></embeddedDataSpecification></embeddedDataSpecifications>
</property></submodelElements></submodel></submodels></environment>"#;
        let decoded = decode_xml(xml).unwrap();
        let p = &decoded.environment.submodels[0].elements[0];
        assert_eq!(p.description.as_deref(), Some("A value"));
        assert_eq!(p.preferred_name.get("de").map(String::as_str), Some("Wert"));
        assert_eq!(p.data_type, None);
    }
}
