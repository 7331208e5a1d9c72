//! # AAS-Forge CLI
//!
//! Validate, convert and package Asset Administration Shell documents.

use aas_forge_codec::{decode_auto, encode_json, encode_xml, read_aasx, to_json_value, Decoded};
use aas_forge_core::{collect_concept_descriptions, ExportGate};
use aas_forge_schema::{export_aasx, HttpSchemaService, SchemaGateway, SchemaReport};
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod config;

use config::CliConfig;

/// A document loaded from disk, with any attachments of its package.
struct Loaded {
    decoded: Decoded,
    attachments: BTreeMap<String, Vec<u8>>,
    /// Original XML text, when the input was an XML file
    xml: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "validate" => {
            let Some(input) = args.get(2) else {
                usage("validate <input> [--offline]");
            };
            let offline = args.iter().skip(3).any(|a| a == "--offline");
            if !validate(Path::new(input), offline).await? {
                std::process::exit(1);
            }
        }
        "convert" => {
            let (Some(input), Some(output)) = (args.get(2), args.get(3)) else {
                usage("convert <input> <output.xml|output.json>");
            };
            convert(Path::new(input), Path::new(output))?;
        }
        "concepts" => {
            let Some(input) = args.get(2) else {
                usage("concepts <input>");
            };
            concepts(Path::new(input))?;
        }
        "export" => {
            let (Some(input), Some(output)) = (args.get(2), args.get(3)) else {
                usage("export <input> <output.aasx>");
            };
            if !export(Path::new(input), Path::new(output)).await? {
                std::process::exit(1);
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn usage(synopsis: &str) -> ! {
    eprintln!("Usage: aas-forge {synopsis}");
    std::process::exit(1);
}

fn load(path: &Path) -> Result<Loaded> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if bytes.starts_with(b"PK") {
        let package = read_aasx(&bytes)
            .with_context(|| format!("Failed to read package {}", path.display()))?;
        return Ok(Loaded {
            decoded: package.document,
            attachments: package.attachments,
            xml: None,
        });
    }

    let decoded =
        decode_auto(&bytes).with_context(|| format!("Failed to decode {}", path.display()))?;
    let xml = matches!(decoded.format, aas_forge_codec::SourceFormat::Xml(_))
        .then(|| String::from_utf8_lossy(&bytes).into_owned());
    Ok(Loaded {
        decoded,
        attachments: BTreeMap::new(),
        xml,
    })
}

fn gateway() -> Result<SchemaGateway<HttpSchemaService>> {
    let config = CliConfig::from_env()?;
    let timeout = config.validator.timeout;
    let service =
        HttpSchemaService::new(config.validator).context("Failed to create validation client")?;
    Ok(SchemaGateway::new(service, timeout))
}

fn print_schema_report(report: &SchemaReport) {
    println!("Schema ({:?}): {}", report.mode, if report.valid { "valid" } else { "invalid" });
    for issue in &report.issues {
        match issue.line {
            Some(line) => println!("  line {line}: {}", issue.message),
            None => println!("  {}", issue.message),
        }
        if !issue.path.is_empty() {
            println!("    at {}", issue.path_display());
        }
        if let Some(hint) = &issue.hint {
            println!("    hint: {hint}");
        }
    }
}

async fn validate(input: &Path, offline: bool) -> Result<bool> {
    let loaded = load(input)?;
    let env = &loaded.decoded.environment;

    let structural = aas_forge_core::validate(&env.shell, &env.submodels);
    println!(
        "Structure: {}",
        if structural.valid { "valid" } else { "invalid" }
    );
    for issue in &structural.issues {
        println!("  {}: {}", issue.path_display(), issue.message);
    }

    if offline {
        return Ok(structural.valid);
    }

    let xml = match loaded.xml {
        Some(xml) => xml,
        None => encode_xml(env, &collect_concept_descriptions(&env.submodels))
            .context("Failed to encode XML")?,
    };
    let report = gateway()?.validate_xml(&xml).await;
    print_schema_report(&report);

    Ok(structural.valid && report.valid)
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let loaded = load(input)?;
    let env = &loaded.decoded.environment;
    let concepts = collect_concept_descriptions(&env.submodels);

    let text = match output.extension().and_then(|e| e.to_str()) {
        Some("xml") => encode_xml(env, &concepts).context("Failed to encode XML")?,
        Some("json") => encode_json(env, &concepts).context("Failed to encode JSON")?,
        Some("aasx") => bail!("AASX output requires validation; use `aas-forge export`"),
        _ => bail!("Unsupported output extension: {}", output.display()),
    };

    std::fs::write(output, text)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!(input = %input.display(), output = %output.display(), "Converted document");
    Ok(())
}

fn concepts(input: &Path) -> Result<()> {
    let loaded = load(input)?;
    let concepts = collect_concept_descriptions(&loaded.decoded.environment.submodels);
    let value = to_json_value(&loaded.decoded.environment, &concepts);
    let listing = serde_json::to_string_pretty(&value["conceptDescriptions"])
        .context("Failed to serialize concept descriptions")?;
    println!("{listing}");
    Ok(())
}

async fn export(input: &Path, output: &Path) -> Result<bool> {
    let loaded = load(input)?;
    let env = &loaded.decoded.environment;

    let mut gate = ExportGate::new();
    let verified = gateway()?
        .verify(env, &mut gate)
        .await
        .context("Failed to encode XML")?;

    for issue in &verified.structural.issues {
        println!("  {}: {}", issue.path_display(), issue.message);
    }
    print_schema_report(&verified.schema);

    match export_aasx(env, &loaded.attachments, &gate) {
        Ok(bytes) => {
            std::fs::write(output, bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {}", output.display());
            Ok(true)
        }
        Err(e) => {
            eprintln!("Not exported: {e}");
            Ok(false)
        }
    }
}

fn print_help() {
    println!(
        r#"AAS-Forge CLI

USAGE:
    aas-forge <COMMAND> [OPTIONS]

COMMANDS:
    validate <input> [--offline]  Check structure and, unless offline, the AAS schema
    convert <input> <output>      Re-encode as AAS 3.1 XML (.xml) or JSON (.json)
    concepts <input>              Print the collected concept descriptions as JSON
    export <input> <output.aasx>  Validate, then package as AASX if clean
    help                          Show this help message

Inputs may be AAS XML (1.0, 3.0, 3.1), AAS JSON or an AASX package.

ENVIRONMENT:
    AAS_FORGE_VALIDATOR_URL   Validation service endpoint
    AAS_FORGE_SCHEMA_URL      AAS XSD location
    AAS_FORGE_SCHEMA_PATH     Local AAS XSD (overrides the URL)
    AAS_FORGE_TIMEOUT_SECS    Validation timeout in seconds
    AAS_FORGE_BEARER_TOKEN    Bearer token for the validation service

EXAMPLES:
    aas-forge validate motor.xml
    aas-forge convert legacy.xml upgraded.json
    aas-forge export motor.json motor.aasx
"#
    );
}
