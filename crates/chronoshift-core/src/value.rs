use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::period::MonthPeriod;
use crate::schema::FieldType;

/// A single field value inside a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Month(MonthPeriod),
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Month(_) => "month",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a raw CSV cell against the declared field type.
    ///
    /// Empty cells are `Null` for every type. Date cells tolerate a trailing
    /// time component and datetime cells a missing one, since upstream demo
    /// files are inconsistent about both.
    pub fn parse(raw: &str, field_type: FieldType) -> Result<Value> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        let invalid = |expected: &'static str| Error::InvalidValue {
            expected,
            raw: raw.to_string(),
        };

        match field_type {
            FieldType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(Value::Bool(true)),
                "false" | "f" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid("bool")),
            },
            FieldType::Int => {
                if let Ok(value) = raw.parse::<i64>() {
                    return Ok(Value::Int(value));
                }
                // Pandas-produced files render integer columns as "42.0"
                // whenever the column ever held a null.
                match raw.parse::<f64>() {
                    Ok(value) if value.fract() == 0.0 => Ok(Value::Int(value as i64)),
                    _ => Err(invalid("int")),
                }
            }
            FieldType::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| invalid("float")),
            FieldType::Text => Ok(Value::Text(raw.to_string())),
            FieldType::Date => {
                if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                    return Ok(Value::Date(date));
                }
                parse_datetime(raw)
                    .map(|dt| Value::Date(dt.date()))
                    .ok_or_else(|| invalid("date"))
            }
            FieldType::DateTime => {
                if let Some(dt) = parse_datetime(raw) {
                    return Ok(Value::DateTime(dt));
                }
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map(|date| Value::DateTime(date.and_time(NaiveTime::MIN)))
                    .map_err(|_| invalid("datetime"))
            }
            FieldType::Month => raw.parse::<MonthPeriod>().map(Value::Month),
        }
    }

    /// Render for CSV output.
    pub fn to_csv(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Text(value) => value.clone(),
            Value::Date(value) => value.format("%Y-%m-%d").to_string(),
            Value::DateTime(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Month(value) => value.to_string(),
        }
    }

    /// Canonical string form used as a grouping/uniqueness key.
    pub fn key(&self) -> String {
        match self {
            Value::Null => "<null>".to_string(),
            Value::DateTime(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
            other => other.to_csv(),
        }
    }

    /// Total order used for timestamp sorting and range observation.
    ///
    /// Nulls sort first; mismatched kinds fall back to kind-name order so
    /// the sort stays total even on dirty data.
    pub fn cmp_value(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Date(a), Value::DateTime(b)) => a.and_time(NaiveTime::MIN).cmp(b),
            (Value::DateTime(a), Value::Date(b)) => a.cmp(&b.and_time(NaiveTime::MIN)),
            (Value::Month(a), Value::Month(b)) => a.cmp(b),
            (a, b) => a.kind().cmp(b.kind()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(value) => Some(*value),
            Value::DateTime(value) => Some(value.date()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(value) => Some(*value),
            Value::Date(value) => Some(value.and_time(NaiveTime::MIN)),
            _ => None,
        }
    }

    pub fn as_month(&self) -> Option<MonthPeriod> {
        match self {
            Value::Month(value) => Some(*value),
            _ => None,
        }
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_cells() {
        assert_eq!(
            Value::parse("42", FieldType::Int).expect("int"),
            Value::Int(42)
        );
        assert_eq!(
            Value::parse("42.0", FieldType::Int).expect("float-form int"),
            Value::Int(42)
        );
        assert_eq!(Value::parse("", FieldType::Float).expect("null"), Value::Null);
        assert_eq!(
            Value::parse("2026-01-15", FieldType::Date).expect("date"),
            Value::Date(NaiveDate::from_ymd_opt(2026, 1, 15).expect("ymd"))
        );
    }

    #[test]
    fn parses_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 15)
            .expect("ymd")
            .and_hms_opt(9, 30, 5)
            .expect("hms");
        for raw in ["2026-01-15 09:30:05", "2026-01-15T09:30:05"] {
            assert_eq!(
                Value::parse(raw, FieldType::DateTime).expect("datetime"),
                Value::DateTime(expected)
            );
        }
    }

    #[test]
    fn csv_round_trip_preserves_time_of_day() {
        let raw = "2026-01-15 23:59:58";
        let value = Value::parse(raw, FieldType::DateTime).expect("datetime");
        assert_eq!(value.to_csv(), raw);
    }

    #[test]
    fn null_sorts_first() {
        let date = Value::parse("2026-01-15", FieldType::Date).expect("date");
        assert_eq!(Value::Null.cmp_value(&date), Ordering::Less);
        assert_eq!(date.cmp_value(&Value::Null), Ordering::Greater);
    }
}
