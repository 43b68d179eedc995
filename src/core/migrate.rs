//! Legacy Dib It user document → semester-grouped document.
//!
//! The legacy client stored one flat document per user: the selected
//! `Semester`, that semester's `Courses`/`Groups`/`Colors`, and older
//! semesters under `"<Field> <semester>"` keys. The new client expects a
//! single `courses` mapping from semester to course entries.

use crate::utils::error::{MigratorError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SEMESTER_FIELD: &str = "Semester";
pub const COURSES_FIELD: &str = "Courses";
pub const GROUPS_FIELD: &str = "Groups";
pub const COLORS_FIELD: &str = "Colors";
pub const TAKEN_COURSES_FIELD: &str = "Taken Courses (Dib It Serialize)";
pub const SCHOOL_FIELD: &str = "School (Dib It Serialize)";
pub const STUDY_PLAN_FIELD: &str = "Study Plan (Dib It Serialize)";

const LEGACY_FIELDS: [&str; 7] = [
    SEMESTER_FIELD,
    COURSES_FIELD,
    GROUPS_FIELD,
    COLORS_FIELD,
    TAKEN_COURSES_FIELD,
    SCHOOL_FIELD,
    STUDY_PLAN_FIELD,
];

/// Result of migrating one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    /// The migrated document.
    pub document: Map<String, Value>,
    /// The input after renames and drops, as the course pass saw it.
    pub working_set: Map<String, Value>,
    /// Semesters that produced a `courses` entry, in processing order.
    pub semesters: Vec<String>,
}

impl Migration {
    /// Number of course entries across all semesters.
    pub fn course_entries(&self) -> usize {
        self.document
            .get("courses")
            .and_then(Value::as_object)
            .map(|courses| {
                courses
                    .values()
                    .filter_map(Value::as_array)
                    .map(Vec::len)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Working-set keys that no rule carried into the document.
    pub fn unmapped_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .working_set
            .keys()
            .filter(|key| !self.is_consumed(key))
            .cloned()
            .collect();
        fields.sort();
        fields
    }

    fn is_consumed(&self, key: &str) -> bool {
        if key == SCHOOL_FIELD || key == STUDY_PLAN_FIELD || key.starts_with(COURSES_FIELD) {
            return true;
        }

        [GROUPS_FIELD, COLORS_FIELD].iter().any(|field| {
            self.semesters
                .iter()
                .any(|semester| key == semester_key(field, semester))
        })
    }
}

/// Migrates `data`, returning only the new document.
pub fn migrate(data: &Map<String, Value>) -> Result<Map<String, Value>> {
    migrate_document(data).map(|migration| migration.document)
}

/// Migrates `data` without touching it; the caller keeps the original.
pub fn migrate_document(data: &Map<String, Value>) -> Result<Migration> {
    let mut working = data.clone();
    let mut document = Map::new();

    let semester = match working.remove(SEMESTER_FIELD) {
        Some(value) => {
            let semester = value
                .as_str()
                .ok_or_else(|| MigratorError::UnexpectedShape {
                    field: SEMESTER_FIELD.to_string(),
                    expected: "a string",
                })?
                .to_string();
            document.insert("semester".to_string(), value);
            Some(semester)
        }
        None => None,
    };

    for field in [COURSES_FIELD, GROUPS_FIELD, COLORS_FIELD] {
        if let Some(value) = working.remove(field) {
            let semester = semester
                .as_deref()
                .ok_or_else(|| MigratorError::MissingSemester {
                    field: field.to_string(),
                })?;
            working.insert(semester_key(field, semester), value);
        }
    }

    working.remove(TAKEN_COURSES_FIELD);

    if let Some(school) = working.get(SCHOOL_FIELD) {
        document.insert("school".to_string(), school.clone());
    }
    if let Some(study_plan) = working.get(STUDY_PLAN_FIELD) {
        document.insert("studyPlan".to_string(), study_plan.clone());
    }

    let mut course_keys: Vec<&String> = working
        .keys()
        .filter(|key| key.starts_with(COURSES_FIELD))
        .collect();
    course_keys.sort();

    let mut courses: Option<BTreeMap<String, Vec<Value>>> = None;
    let mut semesters = Vec::new();

    for key in course_keys {
        let semester = semester_token(key)?;
        let course_ids = working[key.as_str()]
            .as_array()
            .ok_or_else(|| MigratorError::UnexpectedShape {
                field: key.clone(),
                expected: "a list of course IDs",
            })?;
        let groups = sibling_mapping(&working, GROUPS_FIELD, semester)?;
        let colors = sibling_mapping(&working, COLORS_FIELD, semester)?;

        let entries = courses
            .get_or_insert_with(BTreeMap::new)
            .entry(semester.to_string())
            .or_insert_with(|| {
                semesters.push(semester.to_string());
                Vec::new()
            });

        for course in course_ids {
            let id = course.as_str().ok_or_else(|| MigratorError::UnexpectedShape {
                field: key.clone(),
                expected: "a list of course IDs",
            })?;

            let mut entry = Map::new();
            entry.insert("id".to_string(), course.clone());
            if let Some(group) = groups.and_then(|groups| groups.get(id)) {
                entry.insert("groups".to_string(), group.clone());
            }
            if let Some(color) = colors.and_then(|colors| colors.get(id)) {
                entry.insert("color".to_string(), color.clone());
            }
            entries.push(Value::Object(entry));
        }
    }

    if let Some(courses) = courses {
        let courses = courses
            .into_iter()
            .map(|(semester, entries)| (semester, Value::Array(entries)))
            .collect();
        document.insert("courses".to_string(), Value::Object(courses));
    }

    Ok(Migration {
        document,
        working_set: working,
        semesters,
    })
}

/// True when `data` still carries any field the legacy client wrote.
pub fn is_legacy_shape(data: &Map<String, Value>) -> bool {
    data.keys().any(|key| {
        LEGACY_FIELDS.contains(&key.as_str())
            || key.starts_with(COURSES_FIELD)
            || key.starts_with("Groups ")
            || key.starts_with("Colors ")
    })
}

/// Keys the current client writes.
pub const MIGRATED_FIELDS: [&str; 4] = ["semester", "courses", "school", "studyPlan"];

/// True when `data` already carries fields of the migrated shape.
pub fn has_migrated_fields(data: &Map<String, Value>) -> bool {
    MIGRATED_FIELDS.iter().any(|field| data.contains_key(*field))
}

fn semester_key(field: &str, semester: &str) -> String {
    format!("{} {}", field, semester)
}

fn semester_token(key: &str) -> Result<&str> {
    key.split_whitespace()
        .nth(1)
        .ok_or_else(|| MigratorError::MalformedCourseKey {
            key: key.to_string(),
        })
}

fn sibling_mapping<'a>(
    working: &'a Map<String, Value>,
    field: &str,
    semester: &str,
) -> Result<Option<&'a Map<String, Value>>> {
    let key = semester_key(field, semester);
    match working.get(&key) {
        None => Ok(None),
        Some(Value::Object(mapping)) => Ok(Some(mapping)),
        Some(_) => Err(MigratorError::UnexpectedShape {
            field: key,
            expected: "a mapping from course ID",
        }),
    }
}
