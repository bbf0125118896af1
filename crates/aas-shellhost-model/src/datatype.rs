//! The abstract scalar type system and its host mapping.
//!
//! `DataObjectType` enumerates the XSD-like value kinds an element can
//! declare. `HostKind` is the in-process representation each kind maps
//! onto; the forward mapping is total, the inverse is partial (several
//! integer kinds collapse to one host width).

use crate::semantics::Reference;
use serde::{Deserialize, Serialize};

/// XSD-like scalar value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataObjectType {
    /// No declared type
    None,
    /// Any value
    AnyType,
    /// `xs:string`
    String,
    /// A language-tagged string set
    LangString,
    /// `xs:boolean`
    Bool,
    /// `xs:byte`
    Int8,
    /// `xs:short`
    Int16,
    /// `xs:int`
    Int32,
    /// `xs:long`
    Int64,
    /// `xs:unsignedByte`
    UInt8,
    /// `xs:unsignedShort`
    UInt16,
    /// `xs:unsignedInt`
    UInt32,
    /// `xs:unsignedLong`
    UInt64,
    /// `xs:integer` (unbounded)
    Integer,
    /// `xs:nonNegativeInteger`
    NonNegativeInteger,
    /// `xs:positiveInteger`
    PositiveInteger,
    /// `xs:nonPositiveInteger`
    NonPositiveInteger,
    /// `xs:negativeInteger`
    NegativeInteger,
    /// `xs:decimal`
    Decimal,
    /// `xs:double`
    Double,
    /// `xs:float`
    Float,
    /// `xs:dateTime`
    DateTime,
    /// `xs:dateTimeStamp` (timezone required)
    DateTimeStamp,
    /// `xs:duration`
    Duration,
    /// `xs:dayTimeDuration`
    DayTimeDuration,
    /// `xs:yearMonthDuration`
    YearMonthDuration,
    /// `xs:anyURI`
    AnyUri,
    /// `xs:base64Binary`
    Base64Binary,
    /// `xs:hexBinary`
    HexBinary,
}

impl DataObjectType {
    /// The XSD name of this kind (empty for `None`).
    #[must_use]
    pub fn xsd_name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::AnyType => "anyType",
            Self::String => "string",
            Self::LangString => "langString",
            Self::Bool => "boolean",
            Self::Int8 => "byte",
            Self::Int16 => "short",
            Self::Int32 => "int",
            Self::Int64 => "long",
            Self::UInt8 => "unsignedByte",
            Self::UInt16 => "unsignedShort",
            Self::UInt32 => "unsignedInt",
            Self::UInt64 => "unsignedLong",
            Self::Integer => "integer",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Float => "float",
            Self::DateTime => "dateTime",
            Self::DateTimeStamp => "dateTimeStamp",
            Self::Duration => "duration",
            Self::DayTimeDuration => "dayTimeDuration",
            Self::YearMonthDuration => "yearMonthDuration",
            Self::AnyUri => "anyURI",
            Self::Base64Binary => "base64Binary",
            Self::HexBinary => "hexBinary",
        }
    }

    /// Parse a kind from its XSD name.
    #[must_use]
    pub fn from_xsd(name: &str) -> Option<Self> {
        match name {
            "anyType" => Some(Self::AnyType),
            "string" => Some(Self::String),
            "langString" => Some(Self::LangString),
            "boolean" => Some(Self::Bool),
            "byte" => Some(Self::Int8),
            "short" => Some(Self::Int16),
            "int" => Some(Self::Int32),
            "long" => Some(Self::Int64),
            "unsignedByte" => Some(Self::UInt8),
            "unsignedShort" => Some(Self::UInt16),
            "unsignedInt" => Some(Self::UInt32),
            "unsignedLong" => Some(Self::UInt64),
            "integer" => Some(Self::Integer),
            "nonNegativeInteger" => Some(Self::NonNegativeInteger),
            "positiveInteger" => Some(Self::PositiveInteger),
            "nonPositiveInteger" => Some(Self::NonPositiveInteger),
            "negativeInteger" => Some(Self::NegativeInteger),
            "decimal" => Some(Self::Decimal),
            "double" => Some(Self::Double),
            "float" => Some(Self::Float),
            "dateTime" => Some(Self::DateTime),
            "dateTimeStamp" => Some(Self::DateTimeStamp),
            "duration" => Some(Self::Duration),
            "dayTimeDuration" => Some(Self::DayTimeDuration),
            "yearMonthDuration" => Some(Self::YearMonthDuration),
            "anyURI" => Some(Self::AnyUri),
            "base64Binary" => Some(Self::Base64Binary),
            "hexBinary" => Some(Self::HexBinary),
            _ => None,
        }
    }

    /// The host representation this kind maps onto. Total.
    #[must_use]
    pub fn host_kind(self) -> HostKind {
        match self {
            Self::Bool => HostKind::Bool,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Integer
            | Self::NonPositiveInteger | Self::NegativeInteger => HostKind::Int64,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
            | Self::NonNegativeInteger | Self::PositiveInteger => HostKind::UInt64,
            Self::Decimal | Self::Double | Self::Float => HostKind::Double,
            Self::String | Self::AnyUri => HostKind::Utf8,
            Self::Base64Binary | Self::HexBinary => HostKind::Bytes,
            Self::DateTime | Self::DateTimeStamp => HostKind::DateTime,
            Self::Duration | Self::DayTimeDuration | Self::YearMonthDuration => HostKind::Duration,
            Self::None | Self::AnyType | Self::LangString => HostKind::Json,
        }
    }

    /// Signed/unsigned integer range bounds for the bounded kinds, used
    /// for narrowing checks. `None` for non-integer or unbounded kinds.
    #[must_use]
    pub fn integer_bounds(self) -> Option<(i128, i128)> {
        match self {
            Self::Int8 => Some((i128::from(i8::MIN), i128::from(i8::MAX))),
            Self::Int16 => Some((i128::from(i16::MIN), i128::from(i16::MAX))),
            Self::Int32 => Some((i128::from(i32::MIN), i128::from(i32::MAX))),
            Self::Int64 => Some((i128::from(i64::MIN), i128::from(i64::MAX))),
            Self::UInt8 => Some((0, i128::from(u8::MAX))),
            Self::UInt16 => Some((0, i128::from(u16::MAX))),
            Self::UInt32 => Some((0, i128::from(u32::MAX))),
            Self::UInt64 => Some((0, i128::from(u64::MAX))),
            Self::NonNegativeInteger => Some((0, i128::from(u64::MAX))),
            Self::PositiveInteger => Some((1, i128::from(u64::MAX))),
            Self::NonPositiveInteger => Some((i128::from(i64::MIN), 0)),
            Self::NegativeInteger => Some((i128::from(i64::MIN), -1)),
            Self::Integer => Some((i128::from(i64::MIN), i128::from(u64::MAX))),
            _ => None,
        }
    }
}

/// In-process representation classes the scalar kinds map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostKind {
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// IEEE 754 double
    Double,
    /// Boolean
    Bool,
    /// UTF-8 string
    Utf8,
    /// Byte string (carried in its textual encoding)
    Bytes,
    /// RFC 3339 date-time
    DateTime,
    /// ISO 8601 duration
    Duration,
    /// Arbitrary structured value
    Json,
}

impl HostKind {
    /// The canonical scalar kind for this host representation.
    ///
    /// Partial inverse of [`DataObjectType::host_kind`]: several kinds
    /// share one host width, so the canonical one is returned.
    #[must_use]
    pub fn canonical_object_type(self) -> DataObjectType {
        match self {
            Self::Int64 => DataObjectType::Int64,
            Self::UInt64 => DataObjectType::UInt64,
            Self::Double => DataObjectType::Double,
            Self::Bool => DataObjectType::Bool,
            Self::Utf8 => DataObjectType::String,
            Self::Bytes => DataObjectType::Base64Binary,
            Self::DateTime => DataObjectType::DateTime,
            Self::Duration => DataObjectType::Duration,
            Self::Json => DataObjectType::AnyType,
        }
    }
}

/// The declared type of a value: a scalar kind, a collection flag, and
/// optional semantics. Immutable value object; equality considers only
/// `(object_type, is_collection)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataType {
    /// The scalar kind
    pub object_type: DataObjectType,
    /// Whether values are collections of the scalar kind
    pub is_collection: bool,
    /// Reference to the semantic definition of the type
    pub semantic_id: Option<Reference>,
}

impl DataType {
    /// A scalar type.
    #[must_use]
    pub fn new(object_type: DataObjectType) -> Self {
        Self {
            object_type,
            is_collection: false,
            semantic_id: None,
        }
    }

    /// A collection of the given scalar kind.
    #[must_use]
    pub fn collection_of(object_type: DataObjectType) -> Self {
        Self {
            object_type,
            is_collection: true,
            semantic_id: None,
        }
    }

    /// Attach a semantic reference. Does not affect equality.
    #[must_use]
    pub fn with_semantic_id(mut self, semantic_id: Reference) -> Self {
        self.semantic_id = Some(semantic_id);
        self
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.object_type == other.object_type && self.is_collection == other.is_collection
    }
}

impl Eq for DataType {}

impl std::hash::Hash for DataType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.object_type.hash(state);
        self.is_collection.hash(state);
    }
}
