//! Submodel element tree.
//!
//! The tree is a plain value: edits produce new trees (see [`crate::edit`])
//! and codecs map it to and from the serialized AAS encodings.

use crate::types::{IecDataType, XsdType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Language code to text.
pub type LangMap = BTreeMap<String, String>;

/// Multiplicity contract of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Cardinality {
    /// Exactly one, required
    #[default]
    One,
    /// Optional
    ZeroToOne,
    /// Optional, repeatable
    ZeroToMany,
    /// Required, repeatable
    OneToMany,
}

impl Cardinality {
    /// Tag used in both encodings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "One",
            Self::ZeroToOne => "ZeroToOne",
            Self::ZeroToMany => "ZeroToMany",
            Self::OneToMany => "OneToMany",
        }
    }

    /// Whether an element with this cardinality must be filled.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::One | Self::OneToMany)
    }

    /// Whether an element with this cardinality may be removed from its parent.
    #[must_use]
    pub fn is_deletable(self) -> bool {
        matches!(self, Self::ZeroToOne | Self::ZeroToMany)
    }
}

impl FromStr for Cardinality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "One" => Ok(Self::One),
            "ZeroToOne" => Ok(Self::ZeroToOne),
            "ZeroToMany" => Ok(Self::ZeroToMany),
            "OneToMany" => Ok(Self::OneToMany),
            other => Err(format!("unknown cardinality: {other}")),
        }
    }
}

/// Closed set of submodel element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// Typed scalar value
    Property,
    /// Language-tagged text
    MultiLanguageProperty,
    /// Unordered group of elements
    SubmodelElementCollection,
    /// Ordered group of elements
    SubmodelElementList,
    /// Reference to a file
    File,
    /// Reference to another element or external entity
    ReferenceElement,
    /// Value interval
    Range,
    /// Inline binary
    Blob,
    /// Invocable operation
    Operation,
    /// Entity with statements
    Entity,
    /// Event source
    BasicEventElement,
    /// Relationship between two references
    RelationshipElement,
    /// Relationship with annotations
    AnnotatedRelationshipElement,
    /// Capability marker
    Capability,
}

impl ModelType {
    /// Every model type.
    pub const ALL: [Self; 14] = [
        Self::Property,
        Self::MultiLanguageProperty,
        Self::SubmodelElementCollection,
        Self::SubmodelElementList,
        Self::File,
        Self::ReferenceElement,
        Self::Range,
        Self::Blob,
        Self::Operation,
        Self::Entity,
        Self::BasicEventElement,
        Self::RelationshipElement,
        Self::AnnotatedRelationshipElement,
        Self::Capability,
    ];

    /// The `modelType` name used in JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::MultiLanguageProperty => "MultiLanguageProperty",
            Self::SubmodelElementCollection => "SubmodelElementCollection",
            Self::SubmodelElementList => "SubmodelElementList",
            Self::File => "File",
            Self::ReferenceElement => "ReferenceElement",
            Self::Range => "Range",
            Self::Blob => "Blob",
            Self::Operation => "Operation",
            Self::Entity => "Entity",
            Self::BasicEventElement => "BasicEventElement",
            Self::RelationshipElement => "RelationshipElement",
            Self::AnnotatedRelationshipElement => "AnnotatedRelationshipElement",
            Self::Capability => "Capability",
        }
    }

    /// The lower-camel XML element name.
    #[must_use]
    pub fn xml_tag(self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::MultiLanguageProperty => "multiLanguageProperty",
            Self::SubmodelElementCollection => "submodelElementCollection",
            Self::SubmodelElementList => "submodelElementList",
            Self::File => "file",
            Self::ReferenceElement => "referenceElement",
            Self::Range => "range",
            Self::Blob => "blob",
            Self::Operation => "operation",
            Self::Entity => "entity",
            Self::BasicEventElement => "basicEventElement",
            Self::RelationshipElement => "relationshipElement",
            Self::AnnotatedRelationshipElement => "annotatedRelationshipElement",
            Self::Capability => "capability",
        }
    }

    /// Look up a model type by JSON name or XML tag.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name || t.xml_tag() == name)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReferenceType {
    /// Points outside the environment
    #[default]
    ExternalReference,
    /// Points at a model element
    ModelReference,
}

impl ReferenceType {
    /// Serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExternalReference => "ExternalReference",
            Self::ModelReference => "ModelReference",
        }
    }

    /// Parse a serialized name; the legacy spellings map onto the current ones.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "ModelReference" | "ModelRef" => Self::ModelReference,
            _ => Self::ExternalReference,
        }
    }
}

/// One key of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Key type, e.g. `GlobalReference` or `Submodel`
    pub key_type: String,
    /// Key value
    pub value: String,
}

/// A structured reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Reference {
    /// Reference kind
    pub reference_type: ReferenceType,
    /// Ordered keys
    pub keys: Vec<Key>,
}

impl Reference {
    /// An external reference with a single `GlobalReference` key.
    #[must_use]
    pub fn global(value: impl Into<String>) -> Self {
        Self {
            reference_type: ReferenceType::ExternalReference,
            keys: vec![Key {
                key_type: "GlobalReference".to_string(),
                value: value.into(),
            }],
        }
    }

    /// A model reference with a single key.
    #[must_use]
    pub fn model(key_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            reference_type: ReferenceType::ModelReference,
            keys: vec![Key {
                key_type: key_type.into(),
                value: value.into(),
            }],
        }
    }

    /// Value of the first key, if any.
    #[must_use]
    pub fn first_value(&self) -> Option<&str> {
        self.keys.first().map(|k| k.value.as_str())
    }
}

/// Value carried by a `ReferenceElement`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReferenceValue {
    /// Nothing set
    #[default]
    Unset,
    /// Structured key list, encoded as `value`
    Keys(Reference),
    /// Scalar target, encoded as `valueId`
    Scalar(String),
}

/// Entity management kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EntityType {
    /// Co-managed entity
    #[default]
    CoManagedEntity,
    /// Self-managed entity
    SelfManagedEntity,
}

impl EntityType {
    /// Serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoManagedEntity => "CoManagedEntity",
            Self::SelfManagedEntity => "SelfManagedEntity",
        }
    }

    /// Parse a serialized name, defaulting to co-managed.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.trim() == "SelfManagedEntity" {
            Self::SelfManagedEntity
        } else {
            Self::CoManagedEntity
        }
    }
}

/// Inline attachment held by a `File` element until it is packaged.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileData {
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// MIME type
    pub mime_type: String,
    /// Original file name
    pub file_name: String,
}

impl fmt::Debug for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileData")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Kind-specific payload of a submodel element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementContent {
    /// Scalar property
    Property {
        /// Declared value type
        value_type: Option<XsdType>,
        /// Literal value, empty when unset
        value: String,
    },
    /// Language-tagged text
    MultiLanguageProperty {
        /// Language code to text
        value: LangMap,
    },
    /// Unordered group
    Collection {
        /// Child elements
        children: Vec<SubmodelElement>,
    },
    /// Ordered group
    List {
        /// Child elements
        children: Vec<SubmodelElement>,
    },
    /// File reference
    File {
        /// Target path or URL, empty when unset
        value: String,
        /// Declared MIME type
        content_type: Option<String>,
        /// Pending inline attachment
        file_data: Option<FileData>,
    },
    /// Reference element
    ReferenceElement {
        /// Target
        value: ReferenceValue,
    },
    /// Value interval
    Range {
        /// Bound type
        value_type: Option<XsdType>,
        /// Lower bound
        min: Option<String>,
        /// Upper bound
        max: Option<String>,
    },
    /// Inline binary
    Blob {
        /// MIME type
        content_type: Option<String>,
        /// Payload
        value: Vec<u8>,
    },
    /// Capability marker
    Capability,
    /// Entity
    Entity {
        /// Management kind
        entity_type: EntityType,
        /// Global asset identifier
        global_asset_id: Option<String>,
        /// Statements about the entity
        statements: Vec<SubmodelElement>,
    },
    /// Relationship
    Relationship {
        /// Source
        first: Option<Reference>,
        /// Target
        second: Option<Reference>,
    },
    /// Annotated relationship
    AnnotatedRelationship {
        /// Source
        first: Option<Reference>,
        /// Target
        second: Option<Reference>,
        /// Annotations
        annotations: Vec<SubmodelElement>,
    },
    /// Operation
    Operation {
        /// Input variables
        input: Vec<SubmodelElement>,
        /// Output variables
        output: Vec<SubmodelElement>,
        /// In-out variables
        inoutput: Vec<SubmodelElement>,
    },
    /// Event source
    BasicEvent {
        /// Observed element
        observed: Option<Reference>,
        /// `input` or `output`
        direction: Option<String>,
        /// `on` or `off`
        state: Option<String>,
        /// Message topic
        message_topic: Option<String>,
    },
}

/// A node of the submodel element tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmodelElement {
    /// Local identifier, unique among siblings
    pub id_short: String,
    /// Optional category
    pub category: Option<String>,
    /// Preferred-language description
    pub description: Option<String>,
    /// Semantic identifier (IRDI or URI)
    pub semantic_id: Option<String>,
    /// Multiplicity contract
    pub cardinality: Cardinality,
    /// IEC 61360 preferred name
    pub preferred_name: LangMap,
    /// IEC 61360 short name
    pub short_name: LangMap,
    /// IEC 61360 unit
    pub unit: Option<String>,
    /// IEC 61360 data type
    pub data_type: Option<IecDataType>,
    /// Kind-specific payload
    pub content: ElementContent,
}

impl SubmodelElement {
    /// Create an element with no metadata.
    #[must_use]
    pub fn new(id_short: impl Into<String>, content: ElementContent) -> Self {
        Self {
            id_short: id_short.into(),
            category: None,
            description: None,
            semantic_id: None,
            cardinality: Cardinality::default(),
            preferred_name: LangMap::new(),
            short_name: LangMap::new(),
            unit: None,
            data_type: None,
            content,
        }
    }

    /// A property.
    #[must_use]
    pub fn property(
        id_short: impl Into<String>,
        value_type: Option<XsdType>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            id_short,
            ElementContent::Property {
                value_type,
                value: value.into(),
            },
        )
    }

    /// A multi-language property.
    #[must_use]
    pub fn multi_language<I, L, T>(id_short: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        Self::new(
            id_short,
            ElementContent::MultiLanguageProperty {
                value: entries
                    .into_iter()
                    .map(|(l, t)| (l.into(), t.into()))
                    .collect(),
            },
        )
    }

    /// A collection.
    #[must_use]
    pub fn collection(id_short: impl Into<String>, children: Vec<SubmodelElement>) -> Self {
        Self::new(id_short, ElementContent::Collection { children })
    }

    /// A list.
    #[must_use]
    pub fn list(id_short: impl Into<String>, children: Vec<SubmodelElement>) -> Self {
        Self::new(id_short, ElementContent::List { children })
    }

    /// A file element pointing at `value`.
    #[must_use]
    pub fn file(id_short: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            id_short,
            ElementContent::File {
                value: value.into(),
                content_type: None,
                file_data: None,
            },
        )
    }

    /// A reference element.
    #[must_use]
    pub fn reference(id_short: impl Into<String>, value: ReferenceValue) -> Self {
        Self::new(id_short, ElementContent::ReferenceElement { value })
    }

    /// Set the cardinality.
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Set the semantic identifier.
    #[must_use]
    pub fn with_semantic_id(mut self, semantic_id: impl Into<String>) -> Self {
        self.semantic_id = Some(semantic_id.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The element's kind.
    #[must_use]
    pub fn model_type(&self) -> ModelType {
        match &self.content {
            ElementContent::Property { .. } => ModelType::Property,
            ElementContent::MultiLanguageProperty { .. } => ModelType::MultiLanguageProperty,
            ElementContent::Collection { .. } => ModelType::SubmodelElementCollection,
            ElementContent::List { .. } => ModelType::SubmodelElementList,
            ElementContent::File { .. } => ModelType::File,
            ElementContent::ReferenceElement { .. } => ModelType::ReferenceElement,
            ElementContent::Range { .. } => ModelType::Range,
            ElementContent::Blob { .. } => ModelType::Blob,
            ElementContent::Capability => ModelType::Capability,
            ElementContent::Entity { .. } => ModelType::Entity,
            ElementContent::Relationship { .. } => ModelType::RelationshipElement,
            ElementContent::AnnotatedRelationship { .. } => {
                ModelType::AnnotatedRelationshipElement
            }
            ElementContent::Operation { .. } => ModelType::Operation,
            ElementContent::BasicEvent { .. } => ModelType::BasicEventElement,
        }
    }

    /// Children of a collection or list.
    #[must_use]
    pub fn children(&self) -> Option<&[SubmodelElement]> {
        match &self.content {
            ElementContent::Collection { children } | ElementContent::List { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    /// Mutable children of a collection or list.
    pub fn children_mut(&mut self) -> Option<&mut Vec<SubmodelElement>> {
        match &mut self.content {
            ElementContent::Collection { children } | ElementContent::List { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    /// Whether the element is a collection or list with at least one child.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.children().is_some_and(|c| !c.is_empty())
    }

    /// Every nested element group, for tree walks that must reach all
    /// descendants (entity statements, annotations, operation variables).
    #[must_use]
    pub fn nested_groups(&self) -> [&[SubmodelElement]; 3] {
        match &self.content {
            ElementContent::Collection { children } | ElementContent::List { children } => {
                [children.as_slice(), &[], &[]]
            }
            ElementContent::Entity { statements, .. } => [statements.as_slice(), &[], &[]],
            ElementContent::AnnotatedRelationship { annotations, .. } => {
                [annotations.as_slice(), &[], &[]]
            }
            ElementContent::Operation {
                input,
                output,
                inoutput,
            } => [input.as_slice(), output.as_slice(), inoutput.as_slice()],
            _ => [&[], &[], &[]],
        }
    }

    /// Whether any IEC 61360 metadata is present.
    #[must_use]
    pub fn has_iec_metadata(&self) -> bool {
        !self.preferred_name.is_empty()
            || !self.short_name.is_empty()
            || self.unit.as_deref().is_some_and(|u| !u.is_empty())
            || self.data_type.is_some()
            || self.description.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Whether an element with this cardinality must be filled.
#[must_use]
pub fn is_required(cardinality: Cardinality) -> bool {
    cardinality.is_required()
}

/// Whether an element with this cardinality may be removed.
#[must_use]
pub fn is_deletable(cardinality: Cardinality) -> bool {
    cardinality.is_deletable()
}

/// Submodel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModellingKind {
    /// Concrete instance
    #[default]
    Instance,
    /// Template
    Template,
}

impl ModellingKind {
    /// Serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "Instance",
            Self::Template => "Template",
        }
    }

    /// Parse a serialized name, defaulting to `Instance`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("Template") {
            Self::Template
        } else {
            Self::Instance
        }
    }
}

/// A submodel with its element roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Submodel {
    /// Local identifier
    pub id_short: String,
    /// Global identifier (URI)
    pub id: String,
    /// Instance or template
    pub kind: ModellingKind,
    /// Semantic identifier
    pub semantic_id: Option<String>,
    /// Root elements
    pub elements: Vec<SubmodelElement>,
}

impl Submodel {
    /// Create an empty submodel.
    #[must_use]
    pub fn new(id_short: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id_short: id_short.into(),
            id: id.into(),
            kind: ModellingKind::Instance,
            semantic_id: None,
            elements: Vec::new(),
        }
    }

    /// Create an empty submodel with a generated `urn:uuid:` identifier.
    #[must_use]
    pub fn with_generated_id(id_short: impl Into<String>) -> Self {
        Self::new(id_short, format!("urn:uuid:{}", uuid::Uuid::new_v4()))
    }
}

/// Asset kind of a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AssetKind {
    /// Concrete asset
    #[default]
    Instance,
    /// Asset type
    Type,
}

impl AssetKind {
    /// Serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "Instance",
            Self::Type => "Type",
        }
    }

    /// Parse a serialized name, defaulting to `Instance`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("Type") {
            Self::Type
        } else {
            Self::Instance
        }
    }
}

/// Default thumbnail of a shell.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Package path of the image
    pub path: String,
    /// MIME type
    pub content_type: String,
    /// Image bytes, empty when only the path is known
    pub data: Vec<u8>,
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field("data", &self.data.len())
            .finish()
    }
}

/// Asset Administration Shell header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Shell {
    /// Local identifier
    pub id_short: String,
    /// Global identifier
    pub id: String,
    /// Instance or type
    pub asset_kind: AssetKind,
    /// Global asset identifier
    pub global_asset_id: Option<String>,
    /// Default thumbnail
    pub thumbnail: Option<Thumbnail>,
}

impl Shell {
    /// Create a shell header.
    #[must_use]
    pub fn new(id_short: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id_short: id_short.into(),
            id: id.into(),
            ..Self::default()
        }
    }
}

/// A shell with its submodels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Environment {
    /// The shell
    pub shell: Shell,
    /// Submodels in shell order
    pub submodels: Vec<Submodel>,
}

impl Environment {
    /// Create an environment.
    #[must_use]
    pub fn new(shell: Shell, submodels: Vec<Submodel>) -> Self {
        Self { shell, submodels }
    }

    /// Content fingerprint, stable within a process.
    ///
    /// Any edit to the shell or any element changes the fingerprint, so a
    /// recorded validation verdict can be checked for staleness.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Semantic definition derived from element metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConceptDescription {
    /// The semantic identifier it documents
    pub id: String,
    /// idShort of the first element carrying the identifier
    pub id_short: String,
    /// IEC 61360 preferred name
    pub preferred_name: LangMap,
    /// IEC 61360 short name
    pub short_name: LangMap,
    /// Unit
    pub unit: Option<String>,
    /// IEC 61360 data type
    pub data_type: Option<IecDataType>,
    /// Definition text
    pub description: Option<String>,
    /// Value type of the source element
    pub value_type: Option<XsdType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_rules() {
        assert!(is_required(Cardinality::One));
        assert!(is_required(Cardinality::OneToMany));
        assert!(!is_required(Cardinality::ZeroToOne));
        assert!(is_deletable(Cardinality::ZeroToOne));
        assert!(is_deletable(Cardinality::ZeroToMany));
        assert!(!is_deletable(Cardinality::One));
        assert!(!is_deletable(Cardinality::OneToMany));
    }

    #[test]
    fn cardinality_parse() {
        assert_eq!("ZeroToMany".parse(), Ok(Cardinality::ZeroToMany));
        assert!("Many".parse::<Cardinality>().is_err());
    }

    #[test]
    fn model_type_lookup_by_either_spelling() {
        assert_eq!(ModelType::from_name("Property"), Some(ModelType::Property));
        assert_eq!(
            ModelType::from_name("submodelElementCollection"),
            Some(ModelType::SubmodelElementCollection)
        );
        assert_eq!(ModelType::from_name("submodelElement"), None);
    }

    #[test]
    fn has_children_only_for_filled_containers() {
        let empty = SubmodelElement::collection("Empty", vec![]);
        let filled = SubmodelElement::list(
            "Filled",
            vec![SubmodelElement::property("A", None, "")],
        );
        let leaf = SubmodelElement::property("Leaf", Some(XsdType::String), "x");
        assert!(!empty.has_children());
        assert!(filled.has_children());
        assert!(!leaf.has_children());
        assert!(leaf.children().is_none());
    }

    #[test]
    fn nested_groups_cover_operation_variables() {
        let op = SubmodelElement::new(
            "Run",
            ElementContent::Operation {
                input: vec![SubmodelElement::property("In", None, "")],
                output: vec![SubmodelElement::property("Out", None, "")],
                inoutput: vec![],
            },
        );
        let total: usize = op.nested_groups().iter().map(|g| g.len()).sum();
        assert_eq!(total, 2);
        assert_eq!(op.model_type(), ModelType::Operation);
    }

    #[test]
    fn fingerprint_tracks_edits() {
        let mut sm = Submodel::new("Nameplate", "https://ex/sm/1");
        sm.elements
            .push(SubmodelElement::property("SerialNumber", Some(XsdType::String), "SN-1"));
        let env = Environment::new(Shell::new("Motor1", "https://ex/aas/1"), vec![sm]);
        let mut edited = env.clone();
        assert_eq!(env.fingerprint(), edited.fingerprint());

        edited.submodels[0].elements[0].content = ElementContent::Property {
            value_type: Some(XsdType::String),
            value: "SN-2".to_string(),
        };
        assert_ne!(env.fingerprint(), edited.fingerprint());
    }

    #[test]
    fn generated_submodel_ids_are_urns() {
        let sm = Submodel::with_generated_id("TechnicalData");
        assert!(sm.id.starts_with("urn:uuid:"));
    }
}
