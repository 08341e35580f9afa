use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declared type of a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Text,
    Date,
    DateTime,
    Month,
}

/// Role a field plays inside its dataset.
///
/// Roles are declared up front; nothing in the engine infers a role by
/// inspecting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    PrimaryTimestamp,
    Identifier,
    Derived,
    #[default]
    Plain,
}

/// How a primary timestamp is interpreted during mapping and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Date,
    DateTime,
    MonthPeriod,
}

impl Granularity {
    /// Granularity implied by a primary timestamp field's declared type.
    pub fn for_type(field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::Date => Some(Granularity::Date),
            FieldType::DateTime => Some(Granularity::DateTime),
            FieldType::Month => Some(Granularity::MonthPeriod),
            _ => None,
        }
    }
}

/// A single declared field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub role: FieldRole,
}

impl Field {
    pub fn new(name: &str, field_type: FieldType, role: FieldRole) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            role,
        }
    }
}

/// Ordered field declarations for one table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn field_with_role(&self, role: FieldRole) -> Option<&Field> {
        self.fields.iter().find(|field| field.role == role)
    }

    pub fn primary_timestamp(&self) -> Option<&Field> {
        self.field_with_role(FieldRole::PrimaryTimestamp)
    }

    pub fn identifier(&self) -> Option<&Field> {
        self.field_with_role(FieldRole::Identifier)
    }

    /// Granularity of the primary timestamp field, when one is declared.
    pub fn granularity(&self) -> Option<Granularity> {
        self.primary_timestamp()
            .and_then(|field| Granularity::for_type(field.field_type))
    }

    /// Append a derived field the engine introduced, keeping column order.
    pub fn push_derived(&mut self, name: &str, field_type: FieldType) {
        if self.field(name).is_none() {
            self.fields
                .push(Field::new(name, field_type, FieldRole::Derived));
        }
    }
}
