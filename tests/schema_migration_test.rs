use dib_migrate::core::migrate::{is_legacy_shape, SCHOOL_FIELD, TAKEN_COURSES_FIELD};
use dib_migrate::{migrate, migrate_document, MigratorError};
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_full_legacy_user_document() {
    let legacy = object(json!({
        "Semester": "2024b",
        "Courses": ["03661111", "03661101"],
        "Groups": {"03661111": ["01"], "03661101": ["02", "03"]},
        "Colors": {"03661101": "#fa5252"},
        "Courses 2024a": ["03681118"],
        "Colors 2024a": {"03681118": "#40c057"},
        "Taken Courses (Dib It Serialize)": ["03661000", "03661001"],
        "School (Dib It Serialize)": "הפקולטה למדעים מדויקים",
        "Study Plan (Dib It Serialize)": "תוכנית דו-חוגית במתמטיקה ובמדעי המחשב",
        "Theme": "dark"
    }));

    let migration = migrate_document(&legacy).unwrap();

    assert_eq!(
        Value::Object(migration.document.clone()),
        json!({
            "semester": "2024b",
            "school": "הפקולטה למדעים מדויקים",
            "studyPlan": "תוכנית דו-חוגית במתמטיקה ובמדעי המחשב",
            "courses": {
                "2024a": [{"id": "03681118", "color": "#40c057"}],
                "2024b": [
                    {"id": "03661111", "groups": ["01"]},
                    {"id": "03661101", "groups": ["02", "03"], "color": "#fa5252"}
                ]
            }
        })
    );
    assert_eq!(migration.semesters, vec!["2024a", "2024b"]);
    assert_eq!(migration.course_entries(), 3);
    assert_eq!(migration.unmapped_fields(), vec!["Theme".to_string()]);
    assert!(migration.working_set.contains_key(SCHOOL_FIELD));
    assert!(!migration.working_set.contains_key(TAKEN_COURSES_FIELD));
}

#[test]
fn test_taken_courses_never_survive() {
    for value in [json!(null), json!([]), json!({"x": 1}), json!("CS101")] {
        let legacy = object(json!({"Taken Courses (Dib It Serialize)": value}));

        let output = migrate(&legacy).unwrap();

        assert!(output.is_empty());
    }
}

#[test]
fn test_migrated_output_is_not_migrated_again() {
    let legacy = object(json!({
        "Semester": "F24",
        "Courses": ["CS101"],
        "School (Dib It Serialize)": "Engineering"
    }));

    let migrated = migrate(&legacy).unwrap();

    assert!(is_legacy_shape(&legacy));
    assert!(!is_legacy_shape(&migrated));
    assert!(migrate(&migrated).unwrap().is_empty());
}

#[test]
fn test_missing_semester_message() {
    let legacy = object(json!({"Courses": ["CS101"], "Colors": {}}));

    let err = migrate(&legacy).unwrap_err();

    assert!(matches!(err, MigratorError::MissingSemester { .. }));
    assert_eq!(
        err.to_string(),
        "missing semester for course list (field `Courses`)"
    );
}
