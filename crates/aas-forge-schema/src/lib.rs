//! # AAS-Forge Schema Gateway
//!
//! Confirms generated AAS XML against the official XSD through an external
//! validation service, and gates AASX export on a clean verdict.
//!
//! The gateway never reports "valid" when it could not ask: a failed schema
//! fetch, an unreachable service or a timeout all produce an invalid report
//! carrying the failure message. Legacy 1.0 documents are accepted in
//! compatibility mode without a service call.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod gateway;
pub mod hints;
pub mod service;

pub use client::{GatewayError, HttpSchemaService, ValidatorConfig, XsdSource};
pub use gateway::{
    export_aasx, ExportError, SchemaGateway, SchemaIssue, SchemaReport, ValidationMode, Verified,
};
pub use service::{RawError, SchemaService, ServiceVerdict};
