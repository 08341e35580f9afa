use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use chronoshift_core::{Dataset, Field, FieldRole, FieldType, Record, Schema, Value};
use chronoshift_engine::{DerivedFieldRule, FieldRecalculator};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn invoice_dataset() -> Dataset {
    let schema = Schema::new(vec![
        Field::new("invoice_id", FieldType::Int, FieldRole::Identifier),
        Field::new("invoice_date", FieldType::Date, FieldRole::PrimaryTimestamp),
        Field::new("due_date", FieldType::Date, FieldRole::Derived),
        Field::new("invoice_number", FieldType::Text, FieldRole::Derived),
    ]);
    let mut records = Vec::new();
    for (index, day) in [5, 10, 20].iter().enumerate() {
        let mut record = Record::new();
        record.insert("invoice_id".to_string(), Value::Int(index as i64 + 1));
        record.insert("invoice_date".to_string(), Value::Date(ymd(2026, 1, *day)));
        record.insert("due_date".to_string(), Value::Null);
        record.insert(
            "invoice_number".to_string(),
            Value::Text(format!("INV{:08}", index + 5)),
        );
        records.push(record);
    }
    Dataset::new(schema, records)
}

#[test]
fn scenario_d_fixed_offset_due_date_is_deterministic() {
    let recalc = FieldRecalculator::builtin();
    for _ in 0..2 {
        let mut dataset = invoice_dataset();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        recalc
            .apply("invoice", &mut dataset, &[1], &mut rng)
            .expect("recalculate");
        let due = dataset.records[1]
            .get("due_date")
            .and_then(Value::as_date)
            .expect("due date");
        assert_eq!(due, ymd(2026, 2, 9));
    }
}

#[test]
fn sequence_codes_never_collide_with_existing_ones() {
    let recalc = FieldRecalculator::builtin();
    let mut dataset = invoice_dataset();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    // Renumber the last two records; INV00000007 already exists untouched.
    recalc
        .apply("invoice", &mut dataset, &[1, 2], &mut rng)
        .expect("recalculate");

    let codes: Vec<String> = dataset
        .records
        .iter()
        .map(|record| {
            record
                .get("invoice_number")
                .and_then(Value::as_text)
                .expect("code")
                .to_string()
        })
        .collect();
    assert_eq!(codes[0], "INV00000005");
    assert_eq!(codes[1], "INV00000008");
    assert_eq!(codes[2], "INV00000009");
}

#[test]
fn guarded_rule_only_touches_matching_records() {
    let schema = Schema::new(vec![
        Field::new("ticket_id", FieldType::Int, FieldRole::Identifier),
        Field::new("created_date", FieldType::DateTime, FieldRole::PrimaryTimestamp),
        Field::new("status", FieldType::Text, FieldRole::Plain),
        Field::new("resolved_date", FieldType::DateTime, FieldRole::Derived),
        Field::new("ticket_number", FieldType::Text, FieldRole::Derived),
    ]);
    let mut records = Vec::new();
    for (index, status) in ["Resolved", "Open"].iter().enumerate() {
        let mut record = Record::new();
        record.insert("ticket_id".to_string(), Value::Int(index as i64 + 1));
        record.insert(
            "created_date".to_string(),
            Value::parse("2026-01-15 10:30:00", FieldType::DateTime).expect("datetime"),
        );
        record.insert("status".to_string(), Value::Text(status.to_string()));
        record.insert("resolved_date".to_string(), Value::Null);
        record.insert("ticket_number".to_string(), Value::Text("TKT00000001".to_string()));
        records.push(record);
    }
    let mut dataset = Dataset::new(schema, records);

    let recalc = FieldRecalculator::builtin();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    recalc
        .apply("support_ticket", &mut dataset, &[0, 1], &mut rng)
        .expect("recalculate");

    let resolved = dataset.records[0]
        .get("resolved_date")
        .and_then(Value::as_datetime)
        .expect("resolved datetime");
    let created = dataset.records[0]
        .get("created_date")
        .and_then(Value::as_datetime)
        .expect("created datetime");
    assert!(resolved >= created, "resolution precedes creation");
    assert!(resolved <= created + chrono::Duration::days(5));

    // The open ticket keeps its null resolution.
    assert_eq!(dataset.records[1].get("resolved_date"), Some(&Value::Null));
}

#[test]
fn category_ranges_bound_alarm_clearance() {
    let schema = Schema::new(vec![
        Field::new("alarm_id", FieldType::Int, FieldRole::Identifier),
        Field::new("raised_time", FieldType::DateTime, FieldRole::PrimaryTimestamp),
        Field::new("severity", FieldType::Text, FieldRole::Plain),
        Field::new("acknowledged", FieldType::Bool, FieldRole::Plain),
        Field::new("cleared_time", FieldType::DateTime, FieldRole::Derived),
    ]);
    let mut record = Record::new();
    record.insert("alarm_id".to_string(), Value::Int(1));
    record.insert(
        "raised_time".to_string(),
        Value::parse("2026-02-01 04:20:00", FieldType::DateTime).expect("datetime"),
    );
    record.insert("severity".to_string(), Value::Text("Critical".to_string()));
    record.insert("acknowledged".to_string(), Value::Bool(true));
    record.insert("cleared_time".to_string(), Value::Null);
    let mut dataset = Dataset::new(schema, vec![record]);

    let recalc = FieldRecalculator::builtin();
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    recalc
        .apply("network_alarm", &mut dataset, &[0], &mut rng)
        .expect("recalculate");

    let raised = dataset.records[0]
        .get("raised_time")
        .and_then(Value::as_datetime)
        .expect("raised");
    let cleared = dataset.records[0]
        .get("cleared_time")
        .and_then(Value::as_datetime)
        .expect("cleared");
    let minutes = (cleared - raised).num_minutes();
    assert!((30..=120).contains(&minutes), "critical clearance took {minutes} minutes");
}

#[test]
fn minutes_from_field_uses_the_record_duration() {
    let schema = Schema::new(vec![
        Field::new("incident_id", FieldType::Int, FieldRole::Identifier),
        Field::new("created_date", FieldType::DateTime, FieldRole::PrimaryTimestamp),
        Field::new("status", FieldType::Text, FieldRole::Plain),
        Field::new("resolution_mins", FieldType::Int, FieldRole::Plain),
        Field::new("resolved_date", FieldType::DateTime, FieldRole::Derived),
        Field::new("incident_number", FieldType::Text, FieldRole::Derived),
    ]);
    let mut record = Record::new();
    record.insert("incident_id".to_string(), Value::Int(1));
    record.insert(
        "created_date".to_string(),
        Value::parse("2026-01-20 09:00:00", FieldType::DateTime).expect("datetime"),
    );
    record.insert("status".to_string(), Value::Text("Closed".to_string()));
    record.insert("resolution_mins".to_string(), Value::Int(95));
    record.insert("resolved_date".to_string(), Value::Null);
    record.insert("incident_number".to_string(), Value::Text("INC00000001".to_string()));
    let mut dataset = Dataset::new(schema, vec![record]);

    let recalc = FieldRecalculator::builtin();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    recalc
        .apply("it_incident", &mut dataset, &[0], &mut rng)
        .expect("recalculate");

    let resolved = dataset.records[0]
        .get("resolved_date")
        .and_then(Value::as_datetime)
        .expect("resolved");
    let expected = Value::parse("2026-01-20 10:35:00", FieldType::DateTime)
        .expect("datetime")
        .as_datetime()
        .expect("datetime");
    assert_eq!(resolved, expected);
}

#[test]
fn rules_declared_as_json_apply_like_builtins() {
    // The same wire shape a manifest override carries.
    let raw = r#"[
        {"field": "posted_date", "rule": "day_offset", "source": "invoice_date", "days": 2},
        {"field": "invoice_number", "rule": "sequence_code", "prefix": "INV", "width": 8}
    ]"#;
    let rules: Vec<DerivedFieldRule> = serde_json::from_str(raw).expect("rules parse");
    let mut recalc = FieldRecalculator::new();
    recalc.register("invoice", rules);

    let mut dataset = invoice_dataset();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    recalc
        .apply("invoice", &mut dataset, &[0], &mut rng)
        .expect("recalculate");

    // posted_date did not exist; the rule introduces it as a derived column.
    let posted = dataset.records[0]
        .get("posted_date")
        .and_then(Value::as_date)
        .expect("posted date");
    assert_eq!(posted, ymd(2026, 1, 7));
    assert_eq!(
        dataset.records[0]
            .get("invoice_number")
            .and_then(Value::as_text),
        Some("INV00000008")
    );
}

#[test]
fn unknown_kind_applies_no_rules() {
    let recalc = FieldRecalculator::builtin();
    let mut dataset = invoice_dataset();
    let before = dataset.records.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    let assigned = recalc
        .apply("no_such_kind", &mut dataset, &[0, 1, 2], &mut rng)
        .expect("recalculate");
    assert_eq!(assigned, 0);
    assert_eq!(dataset.records, before);
}
