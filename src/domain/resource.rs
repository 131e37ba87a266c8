use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

/// Storage type of a queryable field, used to convert raw query-string
/// values before they reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Uuid,
    /// Arrays and embedded documents: selectable, never filtered or sorted.
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub fn is_scalar(&self) -> bool {
        self.kind != FieldKind::Composite
    }
}

/// Static description of a resource as seen by the query layer.
#[derive(Debug)]
pub struct ResourceSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
    /// Fields left out of responses unless explicitly selected.
    pub hidden: &'static [&'static str],
    /// Fields that may repeat in a query string and match any of the values.
    pub multi_value: &'static [&'static str],
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn allows_multiple(&self, name: &str) -> bool {
        self.multi_value.contains(&name)
    }
}

pub trait Resource: Serialize + Clone + Send + Sync + Unpin + 'static {
    type Patch: Validate + Send + Sync + 'static;

    const SCHEMA: &'static ResourceSchema;

    fn id(&self) -> Uuid;
}

/// Resources that can be created through the generic handlers.
pub trait Creatable: Resource {
    type Create: Validate + Send + Sync + 'static;

    fn build(input: Self::Create) -> Self;
}
