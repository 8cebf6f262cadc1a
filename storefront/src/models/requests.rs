// API request models
// Wizard forms are sent as flat JSON objects keyed by field name.

use crate::wizard::{FieldValue, FormState};
use serde::Serialize;
use serde_json::{Map, Value};

/// JSON body built from a form. `omit` fields never go out; file fields become a list of
/// file names (the bytes travel as multipart parts).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormPayload(Map<String, Value>);

impl FormPayload {
    /// Body for a create: blank fields are left out.
    pub fn from_form(form: &FormState, omit: &[&str]) -> Self {
        Self::build(form, omit, |_| false)
    }

    /// Body for an update: blank fields go out as empty values so a cleared field is
    /// cleared on the server too. Blank `keep_when_blank` fields are left out instead.
    pub fn for_update(form: &FormState, omit: &[&str], keep_when_blank: &[&str]) -> Self {
        Self::build(form, omit, |name| !keep_when_blank.contains(&name))
    }

    fn build(form: &FormState, omit: &[&str], send_blank: impl Fn(&str) -> bool) -> Self {
        let mut map = Map::new();
        for (name, value) in form.iter() {
            if omit.contains(&name) || (value.is_blank() && !send_blank(name)) {
                continue;
            }
            let json = match value {
                FieldValue::Text(s) | FieldValue::Choice(s) => Value::String(s.trim().to_string()),
                FieldValue::Number(n) => number_value(*n),
                FieldValue::Files(files) => Value::Array(
                    files
                        .iter()
                        .map(|f| Value::String(f.file_name.clone()))
                        .collect(),
                ),
            };
            map.insert(name.to_string(), json);
        }
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Whole numbers go out as integers so the backend can bind them to integer columns.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
