//! AAS 3.1 XML writer.

use super::{effective_content_type, namespace, CARDINALITY_QUALIFIER, IEC61360_TEMPLATE};
use crate::error::CodecError;
use aas_forge_core::model::{ElementContent, Reference, ReferenceValue};
use aas_forge_core::types::resolve_value_type;
use aas_forge_core::{
    Cardinality, ConceptDescription, Environment, IecDataType, LangMap, ModelType, Shell,
    Submodel, SubmodelElement, XsdType,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Encode an environment and its concept descriptions as AAS 3.1 XML.
///
/// # Errors
///
/// Returns error if the underlying writer fails.
pub fn encode_xml(
    env: &Environment,
    concepts: &[ConceptDescription],
) -> Result<String, CodecError> {
    let mut out = XmlOut::new();
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.event(Event::Start(BytesStart::new("environment").with_attributes([
        ("xmlns", namespace::AAS_3_1),
        ("xmlns:xsi", namespace::XSI),
    ])))?;

    if !env.shell.id.is_empty() || !env.shell.id_short.is_empty() {
        out.start("assetAdministrationShells")?;
        write_shell(&mut out, &env.shell, &env.submodels)?;
        out.end("assetAdministrationShells")?;
    }

    if !env.submodels.is_empty() {
        out.start("submodels")?;
        for submodel in &env.submodels {
            write_submodel(&mut out, submodel)?;
        }
        out.end("submodels")?;
    }

    if !concepts.is_empty() {
        out.start("conceptDescriptions")?;
        for concept in concepts {
            write_concept(&mut out, concept)?;
        }
        out.end("conceptDescriptions")?;
    }

    out.end("environment")?;
    let xml = out.finish()?;
    tracing::debug!(
        submodels = env.submodels.len(),
        concepts = concepts.len(),
        bytes = xml.len(),
        "Encoded XML environment"
    );
    Ok(xml)
}

/// Thin wrapper that maps every write failure into [`CodecError`].
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), CodecError> {
        self.writer
            .write_event(event)
            .map_err(|e| CodecError::xml(format!("write failed: {e}")))
    }

    fn start(&mut self, tag: &str) -> Result<(), CodecError> {
        self.event(Event::Start(BytesStart::new(tag)))
    }

    fn end(&mut self, tag: &str) -> Result<(), CodecError> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn empty(&mut self, tag: &str) -> Result<(), CodecError> {
        self.event(Event::Empty(BytesStart::new(tag)))
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), CodecError> {
        self.start(tag)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    /// Text element, or a self-closing one when the text is empty.
    fn text_or_empty(&mut self, tag: &str, text: &str) -> Result<(), CodecError> {
        if text.is_empty() {
            self.empty(tag)
        } else {
            self.text(tag, text)
        }
    }

    fn opt_text(&mut self, tag: &str, text: Option<&str>) -> Result<(), CodecError> {
        match text {
            Some(text) if !text.trim().is_empty() => self.text(tag, text),
            _ => Ok(()),
        }
    }

    fn finish(self) -> Result<String, CodecError> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| CodecError::xml(format!("non UTF-8 output: {e}")))
    }
}

fn write_reference(out: &mut XmlOut, tag: &str, reference: &Reference) -> Result<(), CodecError> {
    out.start(tag)?;
    out.text("type", reference.reference_type.as_str())?;
    out.start("keys")?;
    for key in &reference.keys {
        out.start("key")?;
        out.text("type", &key.key_type)?;
        out.text("value", &key.value)?;
        out.end("key")?;
    }
    out.end("keys")?;
    out.end(tag)
}

fn write_opt_reference(
    out: &mut XmlOut,
    tag: &str,
    reference: Option<&Reference>,
) -> Result<(), CodecError> {
    match reference {
        Some(reference) if !reference.keys.is_empty() => write_reference(out, tag, reference),
        _ => Ok(()),
    }
}

fn write_semantic_id(out: &mut XmlOut, semantic_id: Option<&str>) -> Result<(), CodecError> {
    match semantic_id.map(str::trim) {
        Some(id) if !id.is_empty() => write_reference(out, "semanticId", &Reference::global(id)),
        _ => Ok(()),
    }
}

fn write_lang_strings(
    out: &mut XmlOut,
    tag: &str,
    entry_tag: &str,
    entries: &LangMap,
) -> Result<(), CodecError> {
    let filled: Vec<_> = entries.iter().filter(|(_, t)| !t.trim().is_empty()).collect();
    if filled.is_empty() {
        return Ok(());
    }
    out.start(tag)?;
    for (language, text) in filled {
        out.start(entry_tag)?;
        out.text("language", language)?;
        out.text("text", text)?;
        out.end(entry_tag)?;
    }
    out.end(tag)
}

fn write_description(out: &mut XmlOut, description: Option<&str>) -> Result<(), CodecError> {
    match description {
        Some(text) if !text.trim().is_empty() => {
            let entries = LangMap::from([("en".to_string(), text.to_string())]);
            write_lang_strings(out, "description", "langStringTextType", &entries)
        }
        _ => Ok(()),
    }
}

fn write_shell(out: &mut XmlOut, shell: &Shell, submodels: &[Submodel]) -> Result<(), CodecError> {
    out.start("assetAdministrationShell")?;
    out.opt_text("idShort", Some(&shell.id_short))?;
    out.text("id", &shell.id)?;

    out.start("assetInformation")?;
    out.text("assetKind", shell.asset_kind.as_str())?;
    out.opt_text("globalAssetId", shell.global_asset_id.as_deref())?;
    if let Some(thumbnail) = &shell.thumbnail {
        out.start("defaultThumbnail")?;
        out.text("path", &thumbnail.path)?;
        out.opt_text("contentType", Some(&thumbnail.content_type))?;
        out.end("defaultThumbnail")?;
    }
    out.end("assetInformation")?;

    let refs: Vec<_> = submodels.iter().filter(|s| !s.id.is_empty()).collect();
    if !refs.is_empty() {
        out.start("submodels")?;
        for submodel in refs {
            write_reference(out, "reference", &Reference::model("Submodel", &submodel.id))?;
        }
        out.end("submodels")?;
    }

    out.end("assetAdministrationShell")
}

fn write_submodel(out: &mut XmlOut, submodel: &Submodel) -> Result<(), CodecError> {
    out.start("submodel")?;
    out.opt_text("idShort", Some(&submodel.id_short))?;
    out.text("id", &submodel.id)?;
    out.text("kind", submodel.kind.as_str())?;
    write_semantic_id(out, submodel.semantic_id.as_deref())?;
    if !submodel.elements.is_empty() {
        out.start("submodelElements")?;
        for element in &submodel.elements {
            write_element(out, element)?;
        }
        out.end("submodelElements")?;
    }
    out.end("submodel")?;
    tracing::debug!(
        submodel = %submodel.id_short,
        elements = submodel.elements.len(),
        "Encoded submodel"
    );
    Ok(())
}

fn write_elements(
    out: &mut XmlOut,
    tag: &str,
    elements: &[SubmodelElement],
) -> Result<(), CodecError> {
    if elements.is_empty() {
        return Ok(());
    }
    out.start(tag)?;
    for element in elements {
        write_element(out, element)?;
    }
    out.end(tag)
}

fn write_variables(
    out: &mut XmlOut,
    tag: &str,
    elements: &[SubmodelElement],
) -> Result<(), CodecError> {
    if elements.is_empty() {
        return Ok(());
    }
    out.start(tag)?;
    for element in elements {
        out.start("operationVariable")?;
        out.start("value")?;
        write_element(out, element)?;
        out.end("value")?;
        out.end("operationVariable")?;
    }
    out.end(tag)
}

/// Value type written for a property: declared, else IEC-derived, else string.
fn effective_value_type(declared: Option<XsdType>, data_type: Option<IecDataType>) -> XsdType {
    resolve_value_type(declared, data_type).unwrap_or(XsdType::String)
}

fn write_element(out: &mut XmlOut, element: &SubmodelElement) -> Result<(), CodecError> {
    let tag = element.model_type().xml_tag();
    out.start(tag)?;
    out.opt_text("category", element.category.as_deref())?;
    out.text("idShort", &element.id_short)?;
    write_description(out, element.description.as_deref())?;

    // Kind-specific content precedes semanticId.
    match &element.content {
        ElementContent::Property { value_type, value } => {
            let value_type = effective_value_type(*value_type, element.data_type);
            out.text("valueType", value_type.as_str())?;
            out.text_or_empty("value", value)?;
        }
        ElementContent::MultiLanguageProperty { value } => {
            if value.values().any(|t| !t.trim().is_empty()) {
                write_lang_strings(out, "value", "langStringTextType", value)?;
            } else {
                out.empty("value")?;
            }
        }
        ElementContent::File {
            value,
            content_type,
            file_data,
        } => {
            let content_type = effective_content_type(
                file_data.as_ref().map(|d| d.mime_type.as_str()),
                content_type.as_deref(),
            );
            out.text("contentType", content_type)?;
            out.text_or_empty("value", value)?;
        }
        ElementContent::Collection { children } => write_elements(out, "value", children)?,
        ElementContent::List { children } => {
            let item_type = children
                .first()
                .map_or("SubmodelElement", |c| c.model_type().as_str());
            out.text("typeValueListElement", item_type)?;
            if let Some(first) = children.first() {
                if let ElementContent::Property { value_type, .. } = &first.content {
                    let value_type = effective_value_type(*value_type, first.data_type);
                    out.text("valueTypeListElement", value_type.as_str())?;
                }
            }
            write_elements(out, "value", children)?;
        }
        ElementContent::ReferenceElement { value } => match value {
            ReferenceValue::Keys(reference) if !reference.keys.is_empty() => {
                write_reference(out, "value", reference)?;
            }
            ReferenceValue::Scalar(target) if !target.trim().is_empty() => {
                out.text("valueId", target)?;
            }
            _ => out.opt_text("valueId", element.semantic_id.as_deref())?,
        },
        ElementContent::Range {
            value_type,
            min,
            max,
        } => {
            let value_type = effective_value_type(*value_type, element.data_type);
            out.text("valueType", value_type.as_str())?;
            out.opt_text("min", min.as_deref())?;
            out.opt_text("max", max.as_deref())?;
        }
        ElementContent::Blob {
            content_type,
            value,
        } => {
            out.text(
                "contentType",
                effective_content_type(None, content_type.as_deref()),
            )?;
            if !value.is_empty() {
                out.text("value", &crate::encoding::encode_payload(value))?;
            }
        }
        ElementContent::Capability => {}
        ElementContent::Entity {
            entity_type,
            global_asset_id,
            statements,
        } => {
            write_elements(out, "statements", statements)?;
            out.text("entityType", entity_type.as_str())?;
            out.opt_text("globalAssetId", global_asset_id.as_deref())?;
        }
        ElementContent::Relationship { first, second } => {
            write_opt_reference(out, "first", first.as_ref())?;
            write_opt_reference(out, "second", second.as_ref())?;
        }
        ElementContent::AnnotatedRelationship {
            first,
            second,
            annotations,
        } => {
            write_opt_reference(out, "first", first.as_ref())?;
            write_opt_reference(out, "second", second.as_ref())?;
            write_elements(out, "annotations", annotations)?;
        }
        ElementContent::Operation {
            input,
            output,
            inoutput,
        } => {
            write_variables(out, "inputVariables", input)?;
            write_variables(out, "outputVariables", output)?;
            write_variables(out, "inoutputVariables", inoutput)?;
        }
        ElementContent::BasicEvent {
            observed,
            direction,
            state,
            message_topic,
        } => {
            write_opt_reference(out, "observed", observed.as_ref())?;
            out.text("direction", direction.as_deref().unwrap_or("output"))?;
            out.text("state", state.as_deref().unwrap_or("off"))?;
            out.opt_text("messageTopic", message_topic.as_deref())?;
        }
    }

    if element.model_type() != ModelType::ReferenceElement {
        write_semantic_id(out, element.semantic_id.as_deref())?;
    }
    write_cardinality(out, element.cardinality)?;
    if element.has_iec_metadata() {
        write_iec_block(out, &IecBlock::from_element(element))?;
    }

    out.end(tag)
}

fn write_cardinality(out: &mut XmlOut, cardinality: Cardinality) -> Result<(), CodecError> {
    if cardinality == Cardinality::One {
        return Ok(());
    }
    out.start("qualifiers")?;
    out.start("qualifier")?;
    out.text("kind", "TemplateQualifier")?;
    out.text("type", CARDINALITY_QUALIFIER)?;
    out.text("valueType", XsdType::String.as_str())?;
    out.text("value", cardinality.as_str())?;
    out.end("qualifier")?;
    out.end("qualifiers")
}

/// IEC 61360 content shared by elements and concept descriptions.
struct IecBlock<'a> {
    preferred_name: LangMap,
    short_name: &'a LangMap,
    unit: Option<&'a str>,
    data_type: Option<IecDataType>,
    definition: Option<&'a str>,
    value_format: Option<XsdType>,
}

impl<'a> IecBlock<'a> {
    fn from_element(element: &'a SubmodelElement) -> Self {
        Self {
            preferred_name: preferred_or_fallback(&element.preferred_name, &element.id_short),
            short_name: &element.short_name,
            unit: element.unit.as_deref(),
            data_type: element.data_type,
            definition: element.description.as_deref(),
            value_format: None,
        }
    }

    fn from_concept(concept: &'a ConceptDescription) -> Self {
        let label = if concept.id_short.is_empty() {
            concept.id.as_str()
        } else {
            concept.id_short.as_str()
        };
        Self {
            preferred_name: preferred_or_fallback(&concept.preferred_name, label),
            short_name: &concept.short_name,
            unit: concept.unit.as_deref(),
            data_type: concept.data_type,
            definition: concept.description.as_deref(),
            value_format: concept.value_type,
        }
    }
}

/// A block that is written must carry a preferred name.
fn preferred_or_fallback(preferred: &LangMap, label: &str) -> LangMap {
    if preferred.values().any(|t| !t.trim().is_empty()) {
        preferred.clone()
    } else {
        LangMap::from([("en".to_string(), label.to_string())])
    }
}

fn write_iec_block(out: &mut XmlOut, block: &IecBlock<'_>) -> Result<(), CodecError> {
    out.start("embeddedDataSpecifications")?;
    out.start("embeddedDataSpecification")?;
    write_reference(out, "dataSpecification", &Reference::global(IEC61360_TEMPLATE))?;
    out.start("dataSpecificationContent")?;
    out.start("dataSpecificationIec61360")?;
    write_lang_strings(
        out,
        "preferredName",
        "langStringPreferredNameTypeIec61360",
        &block.preferred_name,
    )?;
    write_lang_strings(
        out,
        "shortName",
        "langStringShortNameTypeIec61360",
        block.short_name,
    )?;
    out.opt_text("unit", block.unit)?;
    out.opt_text("dataType", block.data_type.map(IecDataType::as_str))?;
    if let Some(definition) = block.definition.filter(|d| !d.trim().is_empty()) {
        let entries = LangMap::from([("en".to_string(), definition.to_string())]);
        write_lang_strings(
            out,
            "definition",
            "langStringDefinitionTypeIec61360",
            &entries,
        )?;
    }
    out.opt_text("valueFormat", block.value_format.map(XsdType::as_str))?;
    out.end("dataSpecificationIec61360")?;
    out.end("dataSpecificationContent")?;
    out.end("embeddedDataSpecification")?;
    out.end("embeddedDataSpecifications")
}

fn write_concept(out: &mut XmlOut, concept: &ConceptDescription) -> Result<(), CodecError> {
    out.start("conceptDescription")?;
    out.opt_text("idShort", Some(&concept.id_short))?;
    write_description(out, concept.description.as_deref())?;
    out.text("id", &concept.id)?;
    write_iec_block(out, &IecBlock::from_concept(concept))?;
    out.end("conceptDescription")
}
