//! AAS JSON encoding.
//!
//! Encodes the `assetAdministrationShells` / `submodels` /
//! `conceptDescriptions` envelope. Decoding also accepts the shapes found in
//! template files: language strings as maps, `children` instead of `value`,
//! `#text` wrapped scalars and a bare submodel array.

use crate::document::{Decoded, SourceFormat};
use crate::encoding::{decode_payload, encode_payload};
use crate::error::CodecError;
use crate::xml::{
    effective_content_type, CARDINALITY_QUALIFIER, CARDINALITY_TYPES, IEC61360_TEMPLATE,
};
use aas_forge_core::model::{ElementContent, Key, Reference, ReferenceType, ReferenceValue};
use aas_forge_core::types::{normalize_value_type, resolve_value_type};
use aas_forge_core::{
    AssetKind, Cardinality, ConceptDescription, EntityType, Environment, IecDataType, LangMap,
    ModelType, ModellingKind, Shell, Submodel, SubmodelElement, Thumbnail, XsdType,
};
use serde_json::{json, Map, Value};

/// Build the JSON document for an environment.
#[must_use]
pub fn to_json_value(env: &Environment, concepts: &[ConceptDescription]) -> Value {
    let mut root = Map::new();
    if !env.shell.id.is_empty() || !env.shell.id_short.is_empty() {
        root.insert(
            "assetAdministrationShells".into(),
            json!([shell_to_json(&env.shell, &env.submodels)]),
        );
    }
    root.insert(
        "submodels".into(),
        Value::Array(env.submodels.iter().map(submodel_to_json).collect()),
    );
    if !concepts.is_empty() {
        root.insert(
            "conceptDescriptions".into(),
            Value::Array(concepts.iter().map(concept_to_json).collect()),
        );
    }
    Value::Object(root)
}

/// Encode an environment as pretty-printed AAS JSON.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn encode_json(
    env: &Environment,
    concepts: &[ConceptDescription],
) -> Result<String, CodecError> {
    let text = serde_json::to_string_pretty(&to_json_value(env, concepts))
        .map_err(|e| CodecError::json(e.to_string()))?;
    tracing::debug!(
        submodels = env.submodels.len(),
        concepts = concepts.len(),
        bytes = text.len(),
        "Encoded JSON environment"
    );
    Ok(text)
}

fn reference_to_json(reference: &Reference) -> Value {
    json!({
        "type": reference.reference_type.as_str(),
        "keys": reference
            .keys
            .iter()
            .map(|k| json!({ "type": k.key_type, "value": k.value }))
            .collect::<Vec<_>>(),
    })
}

fn lang_to_json(strings: &LangMap) -> Value {
    Value::Array(
        strings
            .iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(language, text)| json!({ "language": language, "text": text }))
            .collect(),
    )
}

fn insert_opt(obj: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        obj.insert(key.into(), Value::String(value.to_string()));
    }
}

fn insert_lang(obj: &mut Map<String, Value>, key: &str, strings: &LangMap) {
    if strings.values().any(|t| !t.trim().is_empty()) {
        obj.insert(key.into(), lang_to_json(strings));
    }
}

fn insert_description(obj: &mut Map<String, Value>, description: Option<&str>) {
    if let Some(text) = description.filter(|d| !d.trim().is_empty()) {
        obj.insert(
            "description".into(),
            json!([{ "language": "en", "text": text }]),
        );
    }
}

fn insert_semantic_id(obj: &mut Map<String, Value>, semantic_id: Option<&str>) {
    if let Some(id) = semantic_id.map(str::trim).filter(|s| !s.is_empty()) {
        obj.insert("semanticId".into(), reference_to_json(&Reference::global(id)));
    }
}

fn shell_to_json(shell: &Shell, submodels: &[Submodel]) -> Value {
    let mut info = Map::new();
    info.insert("assetKind".into(), json!(shell.asset_kind.as_str()));
    insert_opt(&mut info, "globalAssetId", shell.global_asset_id.as_deref());
    if let Some(thumbnail) = &shell.thumbnail {
        info.insert(
            "defaultThumbnail".into(),
            json!({ "path": thumbnail.path, "contentType": thumbnail.content_type }),
        );
    }

    json!({
        "idShort": shell.id_short,
        "id": shell.id,
        "modelType": "AssetAdministrationShell",
        "assetInformation": Value::Object(info),
        "submodels": submodels
            .iter()
            .filter(|s| !s.id.is_empty())
            .map(|s| reference_to_json(&Reference::model("Submodel", s.id.as_str())))
            .collect::<Vec<_>>(),
    })
}

fn submodel_to_json(submodel: &Submodel) -> Value {
    let mut obj = Map::new();
    obj.insert("idShort".into(), json!(submodel.id_short));
    obj.insert("id".into(), json!(submodel.id));
    obj.insert("modelType".into(), json!("Submodel"));
    obj.insert("kind".into(), json!(submodel.kind.as_str()));
    insert_semantic_id(&mut obj, submodel.semantic_id.as_deref());
    obj.insert(
        "submodelElements".into(),
        Value::Array(submodel.elements.iter().map(element_to_json).collect()),
    );
    Value::Object(obj)
}

fn elements_to_json(elements: &[SubmodelElement]) -> Value {
    Value::Array(elements.iter().map(element_to_json).collect())
}

fn variables_to_json(elements: &[SubmodelElement]) -> Value {
    Value::Array(
        elements
            .iter()
            .map(|e| json!({ "value": element_to_json(e) }))
            .collect(),
    )
}

fn cardinality_qualifier(cardinality: Cardinality) -> Value {
    json!([{
        "kind": "TemplateQualifier",
        "type": CARDINALITY_QUALIFIER,
        "valueType": XsdType::String.as_str(),
        "value": cardinality.as_str(),
    }])
}

fn element_to_json(element: &SubmodelElement) -> Value {
    let model_type = element.model_type();
    let mut obj = Map::new();
    obj.insert("idShort".into(), json!(element.id_short));
    obj.insert("modelType".into(), json!(model_type.as_str()));
    insert_opt(&mut obj, "category", element.category.as_deref());
    insert_description(&mut obj, element.description.as_deref());
    if model_type != ModelType::ReferenceElement {
        insert_semantic_id(&mut obj, element.semantic_id.as_deref());
    }
    insert_lang(&mut obj, "preferredName", &element.preferred_name);
    insert_lang(&mut obj, "shortName", &element.short_name);
    insert_opt(&mut obj, "unit", element.unit.as_deref());
    insert_opt(&mut obj, "dataType", element.data_type.map(IecDataType::as_str));
    if element.cardinality != Cardinality::One {
        obj.insert("cardinality".into(), json!(element.cardinality.as_str()));
        obj.insert("qualifiers".into(), cardinality_qualifier(element.cardinality));
    }

    match &element.content {
        ElementContent::Property { value_type, value } => {
            let value_type =
                resolve_value_type(*value_type, element.data_type).unwrap_or(XsdType::String);
            obj.insert("valueType".into(), json!(value_type.as_str()));
            obj.insert("value".into(), json!(value));
        }
        ElementContent::MultiLanguageProperty { value } => {
            obj.insert("value".into(), lang_to_json(value));
        }
        ElementContent::File {
            value,
            content_type,
            file_data,
        } => {
            obj.insert("value".into(), json!(value));
            let content_type = effective_content_type(
                file_data.as_ref().map(|d| d.mime_type.as_str()),
                content_type.as_deref(),
            );
            obj.insert("contentType".into(), json!(content_type));
        }
        ElementContent::Collection { children } => {
            obj.insert("value".into(), elements_to_json(children));
        }
        ElementContent::List { children } => {
            let item_type = children
                .first()
                .map_or("SubmodelElement", |c| c.model_type().as_str());
            obj.insert("typeValueListElement".into(), json!(item_type));
            obj.insert("value".into(), elements_to_json(children));
        }
        ElementContent::ReferenceElement { value } => match value {
            ReferenceValue::Keys(reference) => {
                obj.insert("value".into(), reference_to_json(reference));
            }
            ReferenceValue::Scalar(target) => {
                insert_opt(&mut obj, "valueId", Some(target.as_str()));
            }
            ReferenceValue::Unset => {
                insert_opt(&mut obj, "valueId", element.semantic_id.as_deref());
            }
        },
        ElementContent::Range {
            value_type,
            min,
            max,
        } => {
            let value_type =
                resolve_value_type(*value_type, element.data_type).unwrap_or(XsdType::String);
            obj.insert("valueType".into(), json!(value_type.as_str()));
            insert_opt(&mut obj, "min", min.as_deref());
            insert_opt(&mut obj, "max", max.as_deref());
        }
        ElementContent::Blob {
            content_type,
            value,
        } => {
            let content_type = effective_content_type(None, content_type.as_deref());
            obj.insert("contentType".into(), json!(content_type));
            if !value.is_empty() {
                obj.insert("value".into(), json!(encode_payload(value)));
            }
        }
        ElementContent::Capability => {}
        ElementContent::Entity {
            entity_type,
            global_asset_id,
            statements,
        } => {
            obj.insert("entityType".into(), json!(entity_type.as_str()));
            insert_opt(&mut obj, "globalAssetId", global_asset_id.as_deref());
            obj.insert("statements".into(), elements_to_json(statements));
        }
        ElementContent::Relationship { first, second } => {
            insert_reference(&mut obj, "first", first.as_ref());
            insert_reference(&mut obj, "second", second.as_ref());
        }
        ElementContent::AnnotatedRelationship {
            first,
            second,
            annotations,
        } => {
            insert_reference(&mut obj, "first", first.as_ref());
            insert_reference(&mut obj, "second", second.as_ref());
            obj.insert("annotations".into(), elements_to_json(annotations));
        }
        ElementContent::Operation {
            input,
            output,
            inoutput,
        } => {
            obj.insert("inputVariables".into(), variables_to_json(input));
            obj.insert("outputVariables".into(), variables_to_json(output));
            obj.insert("inoutputVariables".into(), variables_to_json(inoutput));
        }
        ElementContent::BasicEvent {
            observed,
            direction,
            state,
            message_topic,
        } => {
            insert_reference(&mut obj, "observed", observed.as_ref());
            insert_opt(&mut obj, "direction", direction.as_deref());
            insert_opt(&mut obj, "state", state.as_deref());
            insert_opt(&mut obj, "messageTopic", message_topic.as_deref());
        }
    }

    Value::Object(obj)
}

fn insert_reference(obj: &mut Map<String, Value>, key: &str, reference: Option<&Reference>) {
    if let Some(reference) = reference {
        obj.insert(key.into(), reference_to_json(reference));
    }
}

fn concept_to_json(concept: &ConceptDescription) -> Value {
    let mut content = Map::new();
    content.insert("modelType".into(), json!("DataSpecificationIec61360"));
    let preferred = if concept.preferred_name.values().any(|t| !t.trim().is_empty()) {
        concept.preferred_name.clone()
    } else {
        let label = if concept.id_short.is_empty() {
            &concept.id
        } else {
            &concept.id_short
        };
        LangMap::from([("en".to_string(), label.clone())])
    };
    content.insert("preferredName".into(), lang_to_json(&preferred));
    insert_lang(&mut content, "shortName", &concept.short_name);
    insert_opt(&mut content, "unit", concept.unit.as_deref());
    insert_opt(&mut content, "dataType", concept.data_type.map(IecDataType::as_str));
    if let Some(definition) = concept.description.as_deref().filter(|d| !d.trim().is_empty()) {
        content.insert(
            "definition".into(),
            json!([{ "language": "en", "text": definition }]),
        );
    }
    insert_opt(&mut content, "valueFormat", concept.value_type.map(XsdType::as_str));

    let mut obj = Map::new();
    obj.insert("idShort".into(), json!(concept.id_short));
    obj.insert("id".into(), json!(concept.id));
    obj.insert("modelType".into(), json!("ConceptDescription"));
    insert_description(&mut obj, concept.description.as_deref());
    obj.insert(
        "embeddedDataSpecifications".into(),
        json!([{
            "dataSpecification": reference_to_json(&Reference::global(IEC61360_TEMPLATE)),
            "dataSpecificationContent": Value::Object(content),
        }]),
    );
    Value::Object(obj)
}

/// Decode an AAS JSON document.
///
/// Accepts the full envelope, a single submodel object, or a bare array of
/// submodels. Missing sections decode as empty.
///
/// # Errors
///
/// Returns error if the input is not JSON or not an object/array at the top level.
pub fn decode_json(input: &[u8]) -> Result<Decoded, CodecError> {
    let root: Value = serde_json::from_slice(input).map_err(|e| CodecError::json(e.to_string()))?;

    let (shell_value, submodel_values, concept_values): (Option<&Value>, Vec<&Value>, Vec<&Value>) =
        match &root {
            Value::Array(items) => (None, items.iter().collect(), Vec::new()),
            Value::Object(obj) if obj.contains_key("submodelElements") => {
                (None, vec![&root], Vec::new())
            }
            Value::Object(obj) => (
                obj.get("assetAdministrationShells")
                    .and_then(Value::as_array)
                    .and_then(|shells| shells.first()),
                array_items(obj.get("submodels")),
                array_items(obj.get("conceptDescriptions")),
            ),
            _ => return Err(CodecError::json("top level must be an object or array")),
        };

    let shell = shell_value.map(shell_from_json).unwrap_or_default();
    let submodel_refs = shell_value
        .map(|s| {
            array_items(s.get("submodels"))
                .into_iter()
                .filter_map(reference_from_json)
                .filter_map(|r| r.first_value().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let submodels: Vec<Submodel> = submodel_values.into_iter().map(submodel_from_json).collect();
    let concept_descriptions: Vec<ConceptDescription> =
        concept_values.into_iter().map(concept_from_json).collect();

    tracing::debug!(
        submodels = submodels.len(),
        concepts = concept_descriptions.len(),
        "Decoded JSON environment"
    );

    Ok(Decoded {
        environment: Environment::new(shell, submodels),
        submodel_refs,
        concept_descriptions,
        format: SourceFormat::Json,
    })
}

fn array_items(value: Option<&Value>) -> Vec<&Value> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Scalar text, unwrapping `{"#text": ..}` and stringifying numbers and booleans.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(obj) => obj.get("#text").and_then(text_of),
        _ => None,
    }
}

fn field_text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(text_of)
        .filter(|s| !s.trim().is_empty())
}

/// Language strings as `[{language, text}]`, `{lang: text}` or a bare string.
fn lang_from_json(value: &Value) -> LangMap {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let language = field_text(item, "language").or_else(|| field_text(item, "lang"))?;
                let text = field_text(item, "text").or_else(|| text_of(item))?;
                Some((language, text))
            })
            .collect(),
        Value::Object(obj) if !obj.contains_key("#text") => obj
            .iter()
            .filter_map(|(language, text)| text_of(text).map(|t| (language.clone(), t)))
            .collect(),
        other => text_of(other)
            .filter(|t| !t.trim().is_empty())
            .map(|t| LangMap::from([("en".to_string(), t)]))
            .unwrap_or_default(),
    }
}

fn field_lang(value: &Value, key: &str) -> LangMap {
    value.get(key).map(lang_from_json).unwrap_or_default()
}

fn pick_english(strings: &LangMap) -> Option<String> {
    strings
        .iter()
        .find(|(lang, _)| lang.eq_ignore_ascii_case("en"))
        .or_else(|| strings.iter().next())
        .map(|(_, text)| text.clone())
}

fn reference_from_json(value: &Value) -> Option<Reference> {
    if let Some(text) = value.as_str().filter(|s| !s.trim().is_empty()) {
        return Some(Reference::global(text));
    }
    let keys: Vec<Key> = value
        .get("keys")?
        .as_array()?
        .iter()
        .filter_map(|key| {
            Some(Key {
                key_type: field_text(key, "type").unwrap_or_else(|| "GlobalReference".to_string()),
                value: field_text(key, "value")?,
            })
        })
        .collect();
    if keys.is_empty() {
        return None;
    }
    let reference_type = field_text(value, "type")
        .map_or(ReferenceType::ExternalReference, |t| ReferenceType::from_name(&t));
    Some(Reference {
        reference_type,
        keys,
    })
}

/// String form or first key of a reference under `key`.
fn field_reference_text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(reference_from_json)
        .and_then(|r| r.first_value().map(str::to_string))
}

fn model_type_of(value: &Value) -> Option<String> {
    match value.get("modelType")? {
        Value::Object(obj) => obj.get("name").and_then(text_of),
        other => text_of(other),
    }
}

fn shell_from_json(value: &Value) -> Shell {
    let mut shell = Shell::new(
        field_text(value, "idShort").unwrap_or_default(),
        field_text(value, "id").unwrap_or_default(),
    );
    if let Some(info) = value.get("assetInformation") {
        if let Some(kind) = field_text(info, "assetKind") {
            shell.asset_kind = AssetKind::from_name(&kind);
        }
        shell.global_asset_id = field_text(info, "globalAssetId")
            .or_else(|| field_reference_text(info, "globalAssetId"));
        if let Some(thumb) = info.get("defaultThumbnail") {
            if let Some(path) = field_text(thumb, "path") {
                shell.thumbnail = Some(Thumbnail {
                    path,
                    content_type: field_text(thumb, "contentType").unwrap_or_default(),
                    data: Vec::new(),
                });
            }
        }
    }
    shell
}

fn submodel_from_json(value: &Value) -> Submodel {
    let mut submodel = Submodel::new(
        field_text(value, "idShort").unwrap_or_default(),
        field_text(value, "id").unwrap_or_default(),
    );
    if let Some(kind) = field_text(value, "kind") {
        submodel.kind = ModellingKind::from_name(&kind);
    }
    submodel.semantic_id = field_reference_text(value, "semanticId");
    submodel.elements = elements_from_json(value.get("submodelElements"));
    submodel
}

fn elements_from_json(value: Option<&Value>) -> Vec<SubmodelElement> {
    array_items(value)
        .into_iter()
        .filter_map(element_from_json)
        .collect()
}

fn variables_from_json(value: Option<&Value>) -> Vec<SubmodelElement> {
    array_items(value)
        .into_iter()
        .filter_map(|var| element_from_json(var.get("value").unwrap_or(var)))
        .collect()
}

/// Children under `value`, or under `children` for older templates.
fn children_from_json(value: &Value) -> Vec<SubmodelElement> {
    match value.get("value") {
        Some(items @ Value::Array(_)) => elements_from_json(Some(items)),
        _ => elements_from_json(value.get("children")),
    }
}

fn cardinality_from_json(value: &Value) -> Cardinality {
    if let Some(parsed) = field_text(value, "cardinality").and_then(|c| c.parse().ok()) {
        return parsed;
    }
    array_items(value.get("qualifiers"))
        .into_iter()
        .filter(|q| {
            field_text(q, "type").is_some_and(|t| CARDINALITY_TYPES.contains(&t.as_str()))
        })
        .find_map(|q| field_text(q, "value").and_then(|v| v.parse().ok()))
        .unwrap_or_default()
}

fn value_type_from_json(value: &Value, key: &str) -> Option<XsdType> {
    let raw = field_text(value, key)?;
    let value_type = normalize_value_type(Some(&raw));
    if value_type.is_none() {
        tracing::warn!(value_type = %raw, "Unknown valueType dropped");
    }
    value_type
}

fn data_type_from_json(value: &Value) -> Option<IecDataType> {
    let raw = field_text(value, "dataType")?;
    let parsed = raw.parse::<IecDataType>().ok();
    if parsed.is_none() {
        tracing::warn!(data_type = %raw, "Unknown IEC 61360 dataType dropped");
    }
    parsed
}

/// IEC 61360 content of the first embedded data specification.
fn iec_content(value: &Value) -> Option<&Value> {
    array_items(value.get("embeddedDataSpecifications"))
        .into_iter()
        .find_map(|eds| eds.get("dataSpecificationContent"))
}

fn element_from_json(value: &Value) -> Option<SubmodelElement> {
    let type_name = model_type_of(value).unwrap_or_default();
    let Some(model_type) = ModelType::from_name(&type_name) else {
        tracing::warn!(model_type = %type_name, "Unknown element modelType skipped");
        return None;
    };

    let content = match model_type {
        ModelType::Property => ElementContent::Property {
            value_type: value_type_from_json(value, "valueType"),
            value: value.get("value").and_then(text_of).unwrap_or_default(),
        },
        ModelType::MultiLanguageProperty => ElementContent::MultiLanguageProperty {
            value: field_lang(value, "value"),
        },
        ModelType::SubmodelElementCollection => ElementContent::Collection {
            children: children_from_json(value),
        },
        ModelType::SubmodelElementList => ElementContent::List {
            children: children_from_json(value),
        },
        ModelType::File => ElementContent::File {
            value: value.get("value").and_then(text_of).unwrap_or_default(),
            content_type: field_text(value, "contentType")
                .or_else(|| field_text(value, "mimeType")),
            file_data: None,
        },
        ModelType::ReferenceElement => ElementContent::ReferenceElement {
            value: reference_value_from_json(value),
        },
        ModelType::Range => ElementContent::Range {
            value_type: value_type_from_json(value, "valueType"),
            min: field_text(value, "min"),
            max: field_text(value, "max"),
        },
        ModelType::Blob => ElementContent::Blob {
            content_type: field_text(value, "contentType")
                .or_else(|| field_text(value, "mimeType")),
            value: field_text(value, "value")
                .map(|text| {
                    decode_payload(&text).unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "Blob value is not base64, dropped");
                        Vec::new()
                    })
                })
                .unwrap_or_default(),
        },
        ModelType::Capability => ElementContent::Capability,
        ModelType::Entity => ElementContent::Entity {
            entity_type: field_text(value, "entityType")
                .map_or_else(EntityType::default, |t| EntityType::from_name(&t)),
            global_asset_id: field_text(value, "globalAssetId")
                .or_else(|| field_reference_text(value, "globalAssetId")),
            statements: elements_from_json(value.get("statements")),
        },
        ModelType::RelationshipElement => ElementContent::Relationship {
            first: value.get("first").and_then(reference_from_json),
            second: value.get("second").and_then(reference_from_json),
        },
        ModelType::AnnotatedRelationshipElement => ElementContent::AnnotatedRelationship {
            first: value.get("first").and_then(reference_from_json),
            second: value.get("second").and_then(reference_from_json),
            annotations: elements_from_json(value.get("annotations")),
        },
        ModelType::Operation => ElementContent::Operation {
            input: variables_from_json(value.get("inputVariables")),
            output: variables_from_json(value.get("outputVariables")),
            inoutput: variables_from_json(value.get("inoutputVariables")),
        },
        ModelType::BasicEventElement => ElementContent::BasicEvent {
            observed: value.get("observed").and_then(reference_from_json),
            direction: field_text(value, "direction"),
            state: field_text(value, "state"),
            message_topic: field_text(value, "messageTopic"),
        },
    };

    let id_short = field_text(value, "idShort").unwrap_or_default();
    let mut element = SubmodelElement::new(id_short, content);
    element.category = field_text(value, "category");
    element.description = value
        .get("description")
        .map(lang_from_json)
        .and_then(|strings| pick_english(&strings));
    element.semantic_id = field_reference_text(value, "semanticId");
    element.cardinality = cardinality_from_json(value);
    element.preferred_name = field_lang(value, "preferredName");
    element.short_name = field_lang(value, "shortName");
    element.unit = field_text(value, "unit");
    element.data_type = data_type_from_json(value);

    // Metadata may also sit in an embedded data specification.
    if let Some(iec) = iec_content(value) {
        if element.preferred_name.is_empty() {
            element.preferred_name = field_lang(iec, "preferredName");
        }
        if element.short_name.is_empty() {
            element.short_name = field_lang(iec, "shortName");
        }
        if element.unit.is_none() {
            element.unit = field_text(iec, "unit");
        }
        if element.data_type.is_none() {
            element.data_type = data_type_from_json(iec);
        }
        if element.description.is_none() {
            element.description = pick_english(&field_lang(iec, "definition"));
        }
    }

    Some(element)
}

fn reference_value_from_json(value: &Value) -> ReferenceValue {
    match value.get("value") {
        Some(Value::String(target)) if !target.trim().is_empty() => {
            return ReferenceValue::Scalar(target.clone());
        }
        Some(reference) => {
            if let Some(reference) = reference_from_json(reference) {
                return ReferenceValue::Keys(reference);
            }
        }
        None => {}
    }
    field_text(value, "valueId")
        .or_else(|| field_reference_text(value, "valueId"))
        .map_or(ReferenceValue::Unset, ReferenceValue::Scalar)
}

fn concept_from_json(value: &Value) -> ConceptDescription {
    let iec = iec_content(value);
    let from_iec = |key: &str| iec.and_then(|c| field_text(c, key));
    ConceptDescription {
        id: field_text(value, "id").unwrap_or_default(),
        id_short: field_text(value, "idShort").unwrap_or_default(),
        preferred_name: iec.map(|c| field_lang(c, "preferredName")).unwrap_or_default(),
        short_name: iec.map(|c| field_lang(c, "shortName")).unwrap_or_default(),
        unit: from_iec("unit"),
        data_type: iec.and_then(data_type_from_json),
        description: value
            .get("description")
            .map(lang_from_json)
            .and_then(|strings| pick_english(&strings))
            .or_else(|| iec.and_then(|c| pick_english(&field_lang(c, "definition")))),
        value_type: from_iec("valueFormat").and_then(|raw| normalize_value_type(Some(&raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_language_value_is_an_array() {
        let el = SubmodelElement::multi_language("Label", [("en", "Motor"), ("de", "Motor DE")]);
        let value = element_to_json(&el);
        let entries = value["value"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["language"], "de");
    }

    #[test]
    fn template_shapes_are_accepted() {
        let input = br##"{
            "submodels": [{
                "idShort": "Docs",
                "id": "urn:docs",
                "submodelElements": [{
                    "idShort": "Group",
                    "modelType": {"name": "SubmodelElementCollection"},
                    "children": [
                        {"idShort": "Title", "modelType": "MultiLanguageProperty",
                         "value": {"en": "Manual", "de": "Handbuch"}},
                        {"idShort": "Pages", "modelType": "Property", "valueType": "int",
                         "value": {"#text": 12}}
                    ]
                }]
            }]
        }"##;
        let decoded = decode_json(input).unwrap();
        let group = &decoded.environment.submodels[0].elements[0];
        let children = group.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(
            children[0].content,
            ElementContent::MultiLanguageProperty {
                value: LangMap::from([
                    ("de".to_string(), "Handbuch".to_string()),
                    ("en".to_string(), "Manual".to_string()),
                ])
            }
        );
        assert_eq!(
            children[1].content,
            ElementContent::Property {
                value_type: Some(XsdType::Int),
                value: "12".to_string()
            }
        );
    }

    #[test]
    fn cardinality_from_flat_field_or_qualifier() {
        let flat = json!({"cardinality": "ZeroToMany"});
        assert_eq!(cardinality_from_json(&flat), Cardinality::ZeroToMany);
        let qualified = json!({"qualifiers": [{"type": "Multiplicity", "value": "OneToMany"}]});
        assert_eq!(cardinality_from_json(&qualified), Cardinality::OneToMany);
        assert_eq!(cardinality_from_json(&json!({})), Cardinality::One);
    }

    #[test]
    fn bare_submodel_array() {
        let decoded = decode_json(br#"[{"idShort": "A", "id": "urn:a", "submodelElements": []}]"#)
            .unwrap();
        assert_eq!(decoded.environment.submodels.len(), 1);
        assert_eq!(decoded.environment.shell, Shell::default());
    }

    #[test]
    fn scalar_top_level_is_rejected() {
        assert!(matches!(decode_json(b"42"), Err(CodecError::Json(_))));
        assert!(matches!(decode_json(b"{"), Err(CodecError::Json(_))));
    }
}
