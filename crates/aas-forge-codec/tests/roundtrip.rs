use aas_forge_codec::{decode_auto, decode_json, decode_xml, detect_dialect, encode_json, encode_xml};
use aas_forge_codec::{Dialect, SourceFormat};
use aas_forge_core::{
    collect_concept_descriptions, validate, AssetKind, Cardinality, ElementContent, EntityType,
    Environment, IecDataType, LangMap, Reference, ReferenceValue, Shell, Submodel,
    SubmodelElement, Thumbnail, XsdType,
};

fn motor() -> Environment {
    let mut shell = Shell::new("Motor1", "https://ex/aas/1");
    shell.asset_kind = AssetKind::Instance;
    shell.global_asset_id = Some("https://ex/asset/1".to_string());

    let mut nameplate = Submodel::new("Nameplate", "https://ex/sm/nameplate");
    nameplate.elements.push(SubmodelElement::property(
        "SerialNumber",
        Some(XsdType::String),
        "SN-42",
    ));
    Environment::new(shell, vec![nameplate])
}

/// A tree touching every element kind, written so that no encoder default
/// has to be filled in on the way out.
fn technical_data() -> Environment {
    let mut voltage = SubmodelElement::property("RatedVoltage", Some(XsdType::Double), "400")
        .with_semantic_id("0173-1#02-AAF617#004")
        .with_description("Nominal supply voltage");
    voltage.preferred_name = LangMap::from([
        ("de".to_string(), "Nennspannung".to_string()),
        ("en".to_string(), "Rated voltage".to_string()),
    ]);
    voltage.short_name = LangMap::from([("en".to_string(), "U".to_string())]);
    voltage.unit = Some("V".to_string());
    voltage.data_type = Some(IecDataType::RealMeasure);

    let label = SubmodelElement::multi_language("Label", [("en", "Drive"), ("de", "Antrieb")]);

    let mut manual = SubmodelElement::file("Manual", "/aasx/files/manual.pdf")
        .with_cardinality(Cardinality::ZeroToOne);
    manual.content = ElementContent::File {
        value: "/aasx/files/manual.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        file_data: None,
    };

    let speeds = SubmodelElement::list(
        "Speeds",
        vec![
            SubmodelElement::property("Speed0", Some(XsdType::Int), "1500"),
            SubmodelElement::property("Speed1", Some(XsdType::Int), "3000"),
        ],
    )
    .with_cardinality(Cardinality::OneToMany);

    let link = SubmodelElement::reference(
        "NameplateLink",
        ReferenceValue::Keys(Reference::model("Submodel", "https://ex/sm/nameplate")),
    );

    let range = SubmodelElement::new(
        "OperatingTemperature",
        ElementContent::Range {
            value_type: Some(XsdType::Int),
            min: Some("-20".to_string()),
            max: Some("40".to_string()),
        },
    );

    let blob = SubmodelElement::new(
        "Config",
        ElementContent::Blob {
            content_type: Some("text/plain".to_string()),
            value: b"mode=eco".to_vec(),
        },
    );

    let entity = SubmodelElement::new(
        "Bearing",
        ElementContent::Entity {
            entity_type: EntityType::SelfManagedEntity,
            global_asset_id: Some("https://ex/asset/bearing".to_string()),
            statements: vec![SubmodelElement::property(
                "Lubricant",
                Some(XsdType::String),
                "ISO VG 68",
            )],
        },
    );

    let relation = SubmodelElement::new(
        "DrivenBy",
        ElementContent::AnnotatedRelationship {
            first: Some(Reference::model("Submodel", "https://ex/sm/technical")),
            second: Some(Reference::global("https://ex/asset/gearbox")),
            annotations: vec![SubmodelElement::property(
                "Since",
                Some(XsdType::Date),
                "2024-01-01",
            )],
        },
    );

    let start = SubmodelElement::new(
        "Start",
        ElementContent::Operation {
            input: vec![SubmodelElement::property("TargetSpeed", Some(XsdType::Int), "")
                .with_cardinality(Cardinality::ZeroToOne)],
            output: vec![SubmodelElement::property("Accepted", Some(XsdType::Boolean), "")
                .with_cardinality(Cardinality::ZeroToOne)],
            inoutput: vec![],
        },
    );

    let overheat = SubmodelElement::new(
        "Overheat",
        ElementContent::BasicEvent {
            observed: Some(Reference::model("Property", "RatedVoltage")),
            direction: Some("output".to_string()),
            state: Some("on".to_string()),
            message_topic: Some("motor/overheat".to_string()),
        },
    );

    let capability = SubmodelElement::new("Regenerate", ElementContent::Capability)
        .with_cardinality(Cardinality::ZeroToMany);

    let details = SubmodelElement::collection("Details", vec![label, manual, speeds]);

    let mut technical = Submodel::new("TechnicalData", "https://ex/sm/technical");
    technical.semantic_id = Some("https://admin-shell.io/ZVEI/TechnicalData/Submodel/1/2".into());
    technical.elements = vec![
        voltage, details, link, range, blob, entity, relation, start, overheat, capability,
    ];

    let mut env = motor();
    env.shell.thumbnail = Some(Thumbnail {
        path: "/aasx/thumbnail.png".to_string(),
        content_type: "image/png".to_string(),
        data: Vec::new(),
    });
    env.submodels.push(technical);
    env
}

#[test]
fn end_to_end_motor_scenario() {
    let env = motor();

    let report = validate(&env.shell, &env.submodels);
    assert!(report.valid);
    assert!(report.issues.is_empty());

    let concepts = collect_concept_descriptions(&env.submodels);
    let xml = encode_xml(&env, &concepts).unwrap();

    let start = xml.find("<submodelElements>").unwrap();
    let end = xml.find("</submodelElements>").unwrap();
    let block = &xml[start..end];
    assert_eq!(block.matches("<property>").count(), 1);
    let value_type = block.find("<valueType>xs:string</valueType>").unwrap();
    let value = block.find("<value>SN-42</value>").unwrap();
    assert!(value_type < value);

    let decoded = decode_xml(xml.as_bytes()).unwrap();
    assert_eq!(decoded.format, SourceFormat::Xml(Dialect::V3_1));
    assert_eq!(decoded.environment, env);
    assert_eq!(decoded.submodel_refs, vec!["https://ex/sm/nameplate".to_string()]);
}

#[test]
fn xml_round_trip_preserves_every_kind() {
    let env = technical_data();
    let concepts = collect_concept_descriptions(&env.submodels);
    assert_eq!(concepts.len(), 1);

    let xml = encode_xml(&env, &concepts).unwrap();
    assert_eq!(detect_dialect(&xml), Some(Dialect::V3_1));

    let decoded = decode_xml(xml.as_bytes()).unwrap();
    assert_eq!(decoded.environment, env);
    assert_eq!(decoded.concept_descriptions, concepts);
}

#[test]
fn json_round_trip_preserves_every_kind() {
    let env = technical_data();
    let concepts = collect_concept_descriptions(&env.submodels);

    let json = encode_json(&env, &concepts).unwrap();
    let decoded = decode_json(json.as_bytes()).unwrap();
    assert_eq!(decoded.format, SourceFormat::Json);
    assert_eq!(decoded.environment, env);
    assert_eq!(decoded.concept_descriptions, concepts);
    assert_eq!(decoded.submodel_refs.len(), 2);
}

#[test]
fn xml_and_json_decode_to_the_same_tree() {
    let env = technical_data();
    let concepts = collect_concept_descriptions(&env.submodels);
    let from_xml = decode_auto(encode_xml(&env, &concepts).unwrap().as_bytes()).unwrap();
    let from_json = decode_auto(encode_json(&env, &concepts).unwrap().as_bytes()).unwrap();
    assert_eq!(from_xml.environment, from_json.environment);
}

#[test]
fn json_multi_language_value_is_an_array_of_language_text() {
    let env = technical_data();
    let value = aas_forge_codec::to_json_value(&env, &[]);
    let details = &value["submodels"][1]["submodelElements"][1];
    assert_eq!(details["modelType"], "SubmodelElementCollection");
    let label = &details["value"][0];
    assert_eq!(label["modelType"], "MultiLanguageProperty");
    assert_eq!(
        label["value"],
        serde_json::json!([
            {"language": "de", "text": "Antrieb"},
            {"language": "en", "text": "Drive"}
        ])
    );
}

#[test]
fn documented_normalizations() {
    // Untyped property: value type is materialised as xs:string.
    // Description without names: preferred name falls back to the idShort.
    let mut sm = Submodel::new("S", "urn:s");
    sm.elements.push(
        SubmodelElement::property("Untyped", None, "x").with_description("Plain text"),
    );
    let env = Environment::new(Shell::new("A", "urn:a"), vec![sm]);

    let decoded = decode_xml(encode_xml(&env, &[]).unwrap().as_bytes()).unwrap();
    let element = &decoded.environment.submodels[0].elements[0];
    assert_eq!(
        element.content,
        ElementContent::Property {
            value_type: Some(XsdType::String),
            value: "x".to_string()
        }
    );
    assert_eq!(
        element.preferred_name,
        LangMap::from([("en".to_string(), "Untyped".to_string())])
    );
    assert_eq!(element.description.as_deref(), Some("Plain text"));
}

/// Values whose text is not trimmed and non-empty, plus a File that
/// declares no content type.
fn edge_values() -> Environment {
    let mut sm = Submodel::new("Edges", "urn:edges");
    sm.elements = vec![
        SubmodelElement::property("Padded", Some(XsdType::String), " SN-42 "),
        SubmodelElement::property("Blank", Some(XsdType::Int), ""),
        SubmodelElement::multi_language("Label", [("en", " Drive ")]),
        SubmodelElement::new(
            "Window",
            ElementContent::Range {
                value_type: Some(XsdType::String),
                min: Some(" a".to_string()),
                max: Some("z ".to_string()),
            },
        ),
        SubmodelElement::file("Sheet", "/aasx/files/sheet.bin"),
    ];
    Environment::new(Shell::new("A", "urn:a"), vec![sm])
}

/// What both codecs read back: the File gains the default content type.
fn edge_values_decoded() -> Environment {
    let mut env = edge_values();
    env.submodels[0].elements[4].content = ElementContent::File {
        value: "/aasx/files/sheet.bin".to_string(),
        content_type: Some("application/octet-stream".to_string()),
        file_data: None,
    };
    env
}

#[test]
fn xml_round_trip_keeps_padded_and_empty_values() {
    let xml = encode_xml(&edge_values(), &[]).unwrap();
    assert!(xml.contains("<value> SN-42 </value>"));
    assert!(xml.contains("<value/>"));

    let decoded = decode_xml(xml.as_bytes()).unwrap();
    assert_eq!(decoded.environment.submodels, edge_values_decoded().submodels);
}

#[test]
fn json_round_trip_keeps_padded_and_empty_values() {
    let json = encode_json(&edge_values(), &[]).unwrap();
    let decoded = decode_json(json.as_bytes()).unwrap();
    assert_eq!(decoded.environment.submodels, edge_values_decoded().submodels);
}

#[test]
fn file_without_content_type_gets_the_same_default_in_both_codecs() {
    let env = edge_values();
    let value = aas_forge_codec::to_json_value(&env, &[]);
    assert_eq!(
        value["submodels"][0]["submodelElements"][4]["contentType"],
        "application/octet-stream"
    );

    let from_xml = decode_auto(encode_xml(&env, &[]).unwrap().as_bytes()).unwrap();
    let from_json = decode_auto(encode_json(&env, &[]).unwrap().as_bytes()).unwrap();
    assert_eq!(from_xml.environment, from_json.environment);
}
