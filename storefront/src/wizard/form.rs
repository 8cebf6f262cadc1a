// Form state owned by a single wizard instance.
//
// Values are kept in insertion order so summaries and request bodies list fields the way the
// schema declared them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A staged file attachment (e.g. a vehicle photo). Only the reference is held in the form;
/// the bytes are read by the submitter at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub path: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileRef {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = std::path::Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let mime_type = guess_mime(&file_name).map(str::to_string);
        Self {
            path,
            file_name,
            mime_type,
        }
    }
}

fn guess_mime(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Current value of one form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Choice(String),
    Files(Vec<FileRef>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn choice(s: impl Into<String>) -> Self {
        FieldValue::Choice(s.into())
    }

    /// Blank means "the user has not provided anything": empty/whitespace text, an unset
    /// choice, or no files. Numbers are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => s.trim().is_empty(),
            FieldValue::Number(_) => false,
            FieldValue::Files(files) => files.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view. Text that parses as a number counts (raw terminal input is stored as
    /// text until it parses).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn files(&self) -> &[FileRef] {
        match self {
            FieldValue::Files(files) => files,
            _ => &[],
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => write!(f, "{}", s),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            FieldValue::Files(files) => {
                let names: Vec<&str> = files.iter().map(|x| x.file_name.as_str()).collect();
                write!(f, "{}", names.join(", "))
            }
        }
    }
}

/// Ordered field name -> value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    entries: Vec<(String, FieldValue)>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, keeping its original position when it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> &str {
        self.get(name).and_then(FieldValue::as_str).unwrap_or("")
    }

    /// Missing fields count as blank.
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).map(FieldValue::is_blank).unwrap_or(true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All staged file attachments across file fields, in field order.
    pub fn attachments(&self) -> Vec<FileRef> {
        self.entries
            .iter()
            .flat_map(|(_, v)| v.files().iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_preserves_insertion_order_on_overwrite() {
        let mut form = FormState::new()
            .with("make", FieldValue::text("Toyota"))
            .with("model", FieldValue::text("Corolla"))
            .with("year", FieldValue::Number(2020.0));
        form.set("make", FieldValue::text("Honda"));

        let names: Vec<&str> = form.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["make", "model", "year"]);
        assert_eq!(form.get_str("make"), "Honda");
    }

    #[test]
    fn blank_rules() {
        assert!(FieldValue::text("   ").is_blank());
        assert!(FieldValue::choice("").is_blank());
        assert!(FieldValue::Files(vec![]).is_blank());
        assert!(!FieldValue::Number(0.0).is_blank());

        let form = FormState::new();
        assert!(form.is_blank("missing"), "missing fields count as blank");
    }

    #[test]
    fn text_numbers_parse_for_numeric_rules() {
        assert_eq!(FieldValue::text(" 42 ").as_number(), Some(42.0));
        assert_eq!(FieldValue::text("forty").as_number(), None);
        assert_eq!(FieldValue::text("NaN").as_number(), None);
        assert_eq!(FieldValue::choice("3").as_number(), None);
    }

    #[test]
    fn file_ref_derives_name_and_mime() {
        let f = FileRef::new("/tmp/photos/front.JPG");
        assert_eq!(f.file_name, "front.JPG");
        assert_eq!(f.mime_type.as_deref(), Some("image/jpeg"));

        let form = FormState::new()
            .with("photos", FieldValue::Files(vec![f.clone(), FileRef::new("b.png")]))
            .with("notes", FieldValue::text("x"));
        assert_eq!(form.attachments().len(), 2);
        assert_eq!(form.attachments()[0], f);
    }

    #[test]
    fn display_prints_whole_numbers_without_fraction() {
        assert_eq!(FieldValue::Number(2021.0).to_string(), "2021");
        assert_eq!(FieldValue::Number(19999.5).to_string(), "19999.5");
    }
}
