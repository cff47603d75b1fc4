//! Collection layout descriptors used to provision the backing store.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String { size: u32 },
    Enum { elements: &'static [&'static str] },
    Boolean,
    DateTime,
    Float,
    Integer,
}

impl AttributeKind {
    /// Path segment of the attribute-creation endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            AttributeKind::String { .. } => "string",
            AttributeKind::Enum { .. } => "enum",
            AttributeKind::Boolean => "boolean",
            AttributeKind::DateTime => "datetime",
            AttributeKind::Float => "float",
            AttributeKind::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub key: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
    pub array: bool,
}

impl AttributeSpec {
    const fn new(key: &'static str, kind: AttributeKind) -> Self {
        Self { key, kind, required: false, array: false }
    }

    pub const fn string(key: &'static str, size: u32) -> Self { Self::new(key, AttributeKind::String { size }) }
    pub const fn enumeration(key: &'static str, elements: &'static [&'static str]) -> Self {
        Self::new(key, AttributeKind::Enum { elements })
    }
    pub const fn boolean(key: &'static str) -> Self { Self::new(key, AttributeKind::Boolean) }
    pub const fn datetime(key: &'static str) -> Self { Self::new(key, AttributeKind::DateTime) }
    pub const fn float(key: &'static str) -> Self { Self::new(key, AttributeKind::Float) }
    pub const fn integer(key: &'static str) -> Self { Self::new(key, AttributeKind::Integer) }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn array(mut self) -> Self {
        self.array = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Key,
    Unique,
    Fulltext,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Key => "key",
            IndexKind::Unique => "unique",
            IndexKind::Fulltext => "fulltext",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub key: &'static str,
    pub kind: IndexKind,
    pub attributes: &'static [&'static str],
    pub orders: &'static [SortOrder],
}

/// Every listing orders by `createdAt` descending.
pub const CREATED_AT_DESC: IndexSpec = IndexSpec {
    key: "idx_created_at",
    kind: IndexKind::Key,
    attributes: &["createdAt"],
    orders: &[SortOrder::Desc],
};
