use aas_forge_codec::{decode_auto, decode_xml, detect_dialect, encode_xml, CodecError};
use aas_forge_codec::{Dialect, SourceFormat};
use aas_forge_core::{collect_concept_descriptions, ElementContent, IecDataType, LangMap, XsdType};

const PUMP_1_0: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<aas:aasenv xmlns:aas="http://www.admin-shell.io/aas/1/0" xmlns:IEC61360="http://www.admin-shell.io/IEC61360/1/0">
  <aas:assetAdministrationShells>
    <aas:assetAdministrationShell>
      <aas:idShort>Pump7</aas:idShort>
      <aas:identification idType="URI">https://ex/aas/pump7</aas:identification>
      <aas:assetRef>
        <aas:keys>
          <aas:key type="Asset" local="true" idType="URI">https://ex/asset/pump7</aas:key>
        </aas:keys>
      </aas:assetRef>
      <aas:submodelRefs>
        <aas:submodelRef>
          <aas:keys>
            <aas:key type="Submodel" local="true" idType="URI">https://ex/sm/pump7/nameplate</aas:key>
          </aas:keys>
        </aas:submodelRef>
      </aas:submodelRefs>
    </aas:assetAdministrationShell>
  </aas:assetAdministrationShells>
  <aas:assets>
    <aas:asset>
      <aas:idShort>Pump7Asset</aas:idShort>
      <aas:identification idType="URI">https://ex/asset/pump7</aas:identification>
      <aas:kind>Type</aas:kind>
    </aas:asset>
  </aas:assets>
  <aas:submodels>
    <aas:submodel>
      <aas:idShort>Nameplate</aas:idShort>
      <aas:identification idType="URI">https://ex/sm/pump7/nameplate</aas:identification>
      <aas:kind>Instance</aas:kind>
      <aas:submodelElements>
        <aas:submodelElement>
          <aas:property>
            <aas:idShort>ManufacturerName</aas:idShort>
            <aas:description>
              <aas:langString lang="EN">Legal name of the manufacturer</aas:langString>
            </aas:description>
            <aas:semanticId>
              <aas:keys>
                <aas:key type="ConceptDescription" local="true" idType="IRDI">0173-1#02-AAO677#002</aas:key>
              </aas:keys>
            </aas:semanticId>
            <aas:valueType>string</aas:valueType>
            <aas:value>ACME Pumps</aas:value>
          </aas:property>
        </aas:submodelElement>
        <aas:submodelElement>
          <aas:submodelElementCollection>
            <aas:idShort>Address</aas:idShort>
            <aas:value>
              <aas:submodelElement>
                <aas:multiLanguageProperty>
                  <aas:idShort>Street</aas:idShort>
                  <aas:value>
                    <aas:langString lang="de">Hauptstr. 1</aas:langString>
                  </aas:value>
                </aas:multiLanguageProperty>
              </aas:submodelElement>
            </aas:value>
          </aas:submodelElementCollection>
        </aas:submodelElement>
      </aas:submodelElements>
    </aas:submodel>
  </aas:submodels>
  <aas:conceptDescriptions>
    <aas:conceptDescription>
      <aas:idShort>ManufacturerName</aas:idShort>
      <aas:identification idType="IRDI">0173-1#02-AAO677#002</aas:identification>
      <aas:embeddedDataSpecification>
        <aas:dataSpecificationContent>
          <aas:dataSpecificationIEC61360>
            <IEC61360:preferredName>
              <IEC61360:langString lang="EN">Manufacturer name</IEC61360:langString>
            </IEC61360:preferredName>
            <IEC61360:dataType>STRING</IEC61360:dataType>
          </aas:dataSpecificationIEC61360>
        </aas:dataSpecificationContent>
      </aas:embeddedDataSpecification>
    </aas:conceptDescription>
  </aas:conceptDescriptions>
</aas:aasenv>
"#;

#[test]
fn legacy_document_is_read_in_compatibility_mode() {
    assert_eq!(detect_dialect(PUMP_1_0), Some(Dialect::V1_0));

    let decoded = decode_auto(PUMP_1_0.as_bytes()).unwrap();
    assert_eq!(decoded.format, SourceFormat::Xml(Dialect::V1_0));

    let shell = &decoded.environment.shell;
    assert_eq!(shell.id_short, "Pump7");
    assert_eq!(shell.id, "https://ex/aas/pump7");
    assert_eq!(shell.global_asset_id.as_deref(), Some("https://ex/asset/pump7"));
    assert_eq!(shell.asset_kind, aas_forge_core::AssetKind::Type);
    assert_eq!(decoded.submodel_refs, vec!["https://ex/sm/pump7/nameplate".to_string()]);
}

#[test]
fn legacy_elements_are_unwrapped_and_hydrated() {
    let decoded = decode_xml(PUMP_1_0.as_bytes()).unwrap();
    let nameplate = &decoded.environment.submodels[0];
    assert_eq!(nameplate.id, "https://ex/sm/pump7/nameplate");
    assert_eq!(nameplate.elements.len(), 2);

    let manufacturer = &nameplate.elements[0];
    assert_eq!(manufacturer.description.as_deref(), Some("Legal name of the manufacturer"));
    assert_eq!(manufacturer.semantic_id.as_deref(), Some("0173-1#02-AAO677#002"));
    assert_eq!(
        manufacturer.content,
        ElementContent::Property {
            value_type: Some(XsdType::String),
            value: "ACME Pumps".to_string()
        }
    );
    // Names live only in the concept description in 1.0 documents.
    assert_eq!(
        manufacturer.preferred_name,
        LangMap::from([("EN".to_string(), "Manufacturer name".to_string())])
    );
    assert_eq!(manufacturer.data_type, Some(IecDataType::String));

    let street = &nameplate.elements[1].children().unwrap()[0];
    assert_eq!(
        street.content,
        ElementContent::MultiLanguageProperty {
            value: LangMap::from([("de".to_string(), "Hauptstr. 1".to_string())])
        }
    );
}

#[test]
fn legacy_document_upgrades_to_current_dialect() {
    let decoded = decode_xml(PUMP_1_0.as_bytes()).unwrap();
    let concepts = collect_concept_descriptions(&decoded.environment.submodels);
    let xml = encode_xml(&decoded.environment, &concepts).unwrap();
    assert_eq!(detect_dialect(&xml), Some(Dialect::V3_1));
    assert!(!xml.contains("submodelElement>"));

    let again = decode_xml(xml.as_bytes()).unwrap();
    assert_eq!(again.environment.submodels, decoded.environment.submodels);
    assert_eq!(again.concept_descriptions, concepts);
}

#[test]
fn unknown_and_malformed_documents_fail_cleanly() {
    assert!(matches!(
        decode_xml(br#"<aasenv xmlns="http://example.com/other"/>"#),
        Err(CodecError::UnsupportedDialect(_))
    ));
    assert!(matches!(
        decode_xml(b"<environment><unclosed></environment>"),
        Err(CodecError::Xml(_))
    ));
}
