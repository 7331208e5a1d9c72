//! # AAS-Forge Core
//!
//! In-memory model and pure logic for assembling Asset Administration Shell
//! packages.
//!
//! This crate provides:
//! - The submodel element tree, one enum variant per element kind
//! - Normalization between XSD value types and IEC 61360 data types
//! - Concept description collection keyed by `semanticId`
//! - Structural validation with exact idShort paths
//! - Copy-on-write tree editing and export gating

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod concepts;
pub mod edit;
pub mod gate;
pub mod model;
pub mod types;
pub mod validate;

pub use concepts::{collect_concept_descriptions, hydrate_from_concepts};
pub use gate::{ExportBlocked, ExportGate};
pub use model::{
    AssetKind, Cardinality, ConceptDescription, ElementContent, EntityType, Environment,
    FileData, Key, LangMap, ModelType, ModellingKind, Reference, ReferenceType, ReferenceValue,
    Shell, Submodel, SubmodelElement, Thumbnail,
};
pub use types::{IecDataType, XsdType};
pub use validate::{validate, Issue, IssueKind, ValidationReport};
