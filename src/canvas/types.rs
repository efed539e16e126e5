//! Typed course / folder / file records.
//!
//! Canvas JSON is converted here, once, at the API boundary. Everything
//! downstream works with these structs and never touches raw JSON.

use serde_json::Value;

use super::error::MalformedRecordError;
use crate::download::paths;

/// A course and, once loaded, its folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: u64,
    pub name: String,
    pub code: String,
    pub children: Vec<SubContainer>,
}

/// A folder inside a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubContainer {
    pub id: u64,
    /// Canvas `full_name`, e.g. `course files/Unit1`.
    pub raw_path: String,
    pub items: Vec<Item>,
}

/// A downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: u64,
    /// Canvas `modified_at`; compared for equality only.
    pub version_token: String,
    /// `None` for files the user may not download (locked / unpublished).
    pub download_url: Option<String>,
    pub display_name: String,
}

impl Container {
    /// Parse a course record. Returns `Ok(None)` for records without a usable
    /// `name`; Canvas returns such stubs for courses the user can no longer
    /// access.
    pub fn from_record(record: &Value) -> Result<Option<Self>, MalformedRecordError> {
        const KIND: &str = "course";
        let name = match record.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => return Ok(None),
        };
        Ok(Some(Self {
            id: required_id(record, KIND)?,
            name,
            code: required_str(record, KIND, "course_code")?,
            children: Vec::new(),
        }))
    }

    /// Name of the course's directory under the download root: the code
    /// with `/` removed, or the id when nothing usable is left.
    pub fn directory_name(&self) -> String {
        paths::container_directory_name(&self.code, self.id)
    }
}

impl SubContainer {
    pub fn from_record(record: &Value) -> Result<Self, MalformedRecordError> {
        const KIND: &str = "folder";
        Ok(Self {
            id: required_id(record, KIND)?,
            raw_path: required_str(record, KIND, "full_name")?,
            items: Vec::new(),
        })
    }

    /// Folder path relative to the course root, always starting with `/`.
    pub fn relative_path(&self) -> String {
        paths::relative_path(&self.raw_path)
    }
}

impl Item {
    pub fn from_record(record: &Value) -> Result<Self, MalformedRecordError> {
        const KIND: &str = "file";
        let download_url = match record.get("url") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) if url.is_empty() => None,
            Some(Value::String(url)) => Some(url.clone()),
            Some(_) => {
                return Err(MalformedRecordError {
                    kind: KIND,
                    field: "url",
                })
            }
        };
        Ok(Self {
            id: required_id(record, KIND)?,
            version_token: version_token(record, KIND)?,
            download_url,
            display_name: required_str(record, KIND, "display_name")?,
        })
    }
}

/// Canvas ids are JSON numbers, or decimal strings when the instance is
/// configured for string ids.
fn required_id(record: &Value, kind: &'static str) -> Result<u64, MalformedRecordError> {
    let id = record.get("id");
    id.and_then(Value::as_u64)
        .or_else(|| id.and_then(Value::as_str).and_then(|s| s.parse().ok()))
        .ok_or(MalformedRecordError { kind, field: "id" })
}

/// The sync log stores `<id> <version>` per line, so a version must be a
/// single non-empty token.
fn version_token(record: &Value, kind: &'static str) -> Result<String, MalformedRecordError> {
    const FIELD: &str = "modified_at";
    let token = required_str(record, kind, FIELD)?;
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(MalformedRecordError { kind, field: FIELD });
    }
    Ok(token)
}

fn required_str(
    record: &Value,
    kind: &'static str,
    field: &'static str,
) -> Result<String, MalformedRecordError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(MalformedRecordError { kind, field })
}
