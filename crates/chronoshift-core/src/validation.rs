use crate::error::{Error, Result};
use crate::schema::{FieldRole, FieldType, Granularity, Schema};

/// Validate role cardinality and role/type compatibility.
///
/// At most one `primary_timestamp` and one `identifier` field; the primary
/// timestamp must carry a temporal type, identifiers must be integer so
/// extension can grow them monotonically.
pub fn validate_schema(schema: &Schema) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate field name '{}'",
                field.name
            )));
        }
    }

    let timestamps: Vec<_> = schema
        .fields
        .iter()
        .filter(|field| field.role == FieldRole::PrimaryTimestamp)
        .collect();
    if timestamps.len() > 1 {
        return Err(Error::InvalidSchema(
            "more than one primary_timestamp field declared".to_string(),
        ));
    }
    if let Some(field) = timestamps.first()
        && Granularity::for_type(field.field_type).is_none()
    {
        return Err(Error::InvalidSchema(format!(
            "primary_timestamp field '{}' must be date, datetime or month",
            field.name
        )));
    }

    let identifiers: Vec<_> = schema
        .fields
        .iter()
        .filter(|field| field.role == FieldRole::Identifier)
        .collect();
    if identifiers.len() > 1 {
        return Err(Error::InvalidSchema(
            "more than one identifier field declared".to_string(),
        ));
    }
    if let Some(field) = identifiers.first()
        && field.field_type != FieldType::Int
    {
        return Err(Error::InvalidSchema(format!(
            "identifier field '{}' must be int",
            field.name
        )));
    }

    Ok(())
}
