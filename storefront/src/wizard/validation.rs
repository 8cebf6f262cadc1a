// Schema-declarative field validation.
//
// Validation never fails as an operation: every call returns a ValidationResult, and an empty
// error set means the checked fields pass. Blank optional fields skip every rule (including
// cross-field rules), and a field declared `RequiredWhenFilled(dep)` is only evaluated when
// `dep` has a value.

use super::form::{FieldValue, FormState};
use super::step::StepDefinition;
use chrono::NaiveDate;
use regex::Regex;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    /// Text that must never be logged or echoed.
    Password,
    Number,
    Choice(Vec<String>),
    /// ISO calendar date (YYYY-MM-DD).
    Date,
    Files,
}

impl FieldKind {
    pub fn is_secret(&self) -> bool {
        matches!(self, FieldKind::Password)
    }

    /// Turn raw text typed into a field into a form value of the right shape. Text that does
    /// not parse as a number stays text so validation can report it.
    pub fn value_from_input(&self, raw: &str) -> FieldValue {
        match self {
            FieldKind::Number => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => FieldValue::Number(n),
                _ => FieldValue::text(raw),
            },
            FieldKind::Choice(_) => FieldValue::choice(raw),
            _ => FieldValue::text(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Skipped entirely while the named field is blank; required otherwise.
    RequiredWhenFilled(String),
}

#[derive(Debug, Clone)]
pub enum Rule {
    MinLength(usize),
    MaxLength(usize),
    Range { min: f64, max: f64 },
    Pattern { regex: Regex, message: String },
    /// Date must not be earlier than the given day.
    NotBefore(NaiveDate),
    /// Cross-field: value must equal the other field's value. Error attaches to this field.
    EqualsField { other: String, message: String },
    /// Cross-field: value must differ from the other field's value when that one is set.
    DiffersFrom { other: String, message: String },
}

impl Rule {
    pub fn pattern(source: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Rule::Pattern {
            regex: Regex::new(source)?,
            message: message.into(),
        })
    }

    pub fn equals_field(other: &str, message: impl Into<String>) -> Self {
        Rule::EqualsField {
            other: other.to_string(),
            message: message.into(),
        }
    }

    pub fn differs_from(other: &str, message: impl Into<String>) -> Self {
        Rule::DiffersFrom {
            other: other.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub presence: Presence,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            presence: Presence::Required,
            rules: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn required_when_filled(mut self, other: &str) -> Self {
        self.presence = Presence::RequiredWhenFilled(other.to_string());
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    fn check(&self, form: &FormState) -> Option<String> {
        if let Presence::RequiredWhenFilled(dep) = &self.presence {
            if form.is_blank(dep) {
                return None;
            }
        }

        let value = match form.get(&self.name) {
            Some(v) if !v.is_blank() => v,
            _ => {
                return match self.presence {
                    Presence::Optional => None,
                    _ => Some(format!("{} is required.", self.label)),
                }
            }
        };

        if let Some(msg) = self.check_kind(value) {
            return Some(msg);
        }

        self.rules
            .iter()
            .find_map(|rule| self.check_rule(rule, value, form))
    }

    fn check_kind(&self, value: &FieldValue) -> Option<String> {
        match &self.kind {
            FieldKind::Number => {
                if value.as_number().is_none() {
                    return Some(format!("{} must be a number.", self.label));
                }
            }
            FieldKind::Choice(options) => {
                let v = value.as_str().unwrap_or("");
                if !options.iter().any(|o| o == v) {
                    return Some(format!("Select a valid {}.", self.label.to_lowercase()));
                }
            }
            FieldKind::Date => {
                let v = value.as_str().unwrap_or("").trim();
                if NaiveDate::parse_from_str(v, DATE_FORMAT).is_err() {
                    return Some(format!("{} must be a date (YYYY-MM-DD).", self.label));
                }
            }
            FieldKind::Files => {
                if !matches!(value, FieldValue::Files(_)) {
                    return Some(format!("{} must be a list of files.", self.label));
                }
            }
            FieldKind::Text | FieldKind::Password => {}
        }
        None
    }

    fn check_rule(&self, rule: &Rule, value: &FieldValue, form: &FormState) -> Option<String> {
        let text = value.to_string();
        match rule {
            Rule::MinLength(min) => (text.trim().chars().count() < *min)
                .then(|| format!("{} must be at least {} characters.", self.label, min)),
            Rule::MaxLength(max) => (text.chars().count() > *max)
                .then(|| format!("{} must be at most {} characters.", self.label, max)),
            Rule::Range { min, max } => {
                let n = value.as_number()?;
                (n < *min || n > *max).then(|| {
                    format!(
                        "{} must be between {} and {}.",
                        self.label,
                        FieldValue::Number(*min),
                        FieldValue::Number(*max)
                    )
                })
            }
            Rule::Pattern { regex, message } => {
                (!regex.is_match(text.trim())).then(|| message.clone())
            }
            Rule::NotBefore(earliest) => {
                let d = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()?;
                (d < *earliest).then(|| {
                    format!(
                        "{} cannot be earlier than {}.",
                        self.label,
                        earliest.format(DATE_FORMAT)
                    )
                })
            }
            Rule::EqualsField { other, message } => {
                let other_text = form.get(other).map(|v| v.to_string()).unwrap_or_default();
                (text != other_text).then(|| message.clone())
            }
            Rule::DiffersFrom { other, message } => {
                if form.is_blank(other) {
                    return None;
                }
                let other_text = form.get(other).map(|v| v.to_string()).unwrap_or_default();
                (text == other_text).then(|| message.clone())
            }
        }
    }
}

/// Per-field outcome, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    fields: Vec<(String, Option<String>)>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|(_, e)| e.is_none())
    }

    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .and_then(|(_, e)| e.as_deref())
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(k, e)| e.as_deref().map(|msg| (k.as_str(), msg)))
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn checked_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.field(name).map(|f| f.kind.is_secret()).unwrap_or(false)
    }

    /// Whole-form validation (submit gate).
    pub fn validate(&self, form: &FormState) -> ValidationResult {
        ValidationResult {
            fields: self
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.check(form)))
                .collect(),
        }
    }

    /// Validate only the named fields. Names without a spec are ignored.
    pub fn validate_fields(&self, form: &FormState, names: &[String]) -> ValidationResult {
        ValidationResult {
            fields: self
                .fields
                .iter()
                .filter(|f| names.iter().any(|n| *n == f.name))
                .map(|f| (f.name.clone(), f.check(form)))
                .collect(),
        }
    }

    pub fn validate_step(&self, form: &FormState, step: &StepDefinition) -> ValidationResult {
        self.validate_fields(form, &step.fields)
    }

    /// Ordinal of the first step holding an invalid field.
    pub fn first_invalid_step(
        &self,
        form: &FormState,
        steps: &[StepDefinition],
    ) -> Option<usize> {
        steps
            .iter()
            .find(|s| !self.validate_step(form, s).is_valid())
            .map(|s| s.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn password_schema() -> FormSchema {
        FormSchema::new(vec![
            FieldSpec::new("name", "Name", FieldKind::Text).optional(),
            FieldSpec::new("phone", "Phone", FieldKind::Text).optional(),
            FieldSpec::new("oldPassword", "Current password", FieldKind::Password).optional(),
            FieldSpec::new("password", "New password", FieldKind::Password)
                .optional()
                .rule(Rule::MinLength(6))
                .rule(Rule::differs_from(
                    "oldPassword",
                    "New password must differ from the current password.",
                )),
            FieldSpec::new("confirmPassword", "Confirm password", FieldKind::Password)
                .required_when_filled("password")
                .rule(Rule::equals_field("password", "Passwords do not match.")),
        ])
    }

    fn profile_form(old: &str, new: &str, confirm: &str) -> FormState {
        FormState::new()
            .with("name", FieldValue::text(""))
            .with("phone", FieldValue::text(""))
            .with("oldPassword", FieldValue::text(old))
            .with("password", FieldValue::text(new))
            .with("confirmPassword", FieldValue::text(confirm))
    }

    #[test]
    fn mismatched_confirmation_attaches_only_to_confirm_field() {
        let result = password_schema().validate(&profile_form("", "abc123", "abc124"));
        assert_eq!(result.error_count(), 1, "errors: {:?}", result);
        assert_eq!(
            result.error_for("confirmPassword"),
            Some("Passwords do not match.")
        );
        assert_eq!(result.error_for("password"), None);
    }

    #[test]
    fn new_password_equal_to_old_attaches_to_new_field() {
        let result = password_schema().validate(&profile_form("secret1", "secret1", "secret1"));
        assert_eq!(
            result.error_for("password"),
            Some("New password must differ from the current password.")
        );
        assert_eq!(result.error_for("confirmPassword"), None);
        assert_eq!(result.error_for("oldPassword"), None);
    }

    #[test]
    fn blank_optional_password_skips_dependent_checks() {
        let result = password_schema().validate(&profile_form("old-pass", "", "typo"));
        assert!(result.is_valid(), "errors: {:?}", result);
    }

    #[test]
    fn confirm_required_once_password_is_set() {
        let result = password_schema().validate(&profile_form("", "abc123", ""));
        assert_eq!(
            result.error_for("confirmPassword"),
            Some("Confirm password is required.")
        );
    }

    #[test]
    fn kind_checks_and_ranges() {
        let schema = FormSchema::new(vec![
            FieldSpec::new("year", "Year", FieldKind::Number).rule(Rule::Range {
                min: 1900.0,
                max: 2030.0,
            }),
            FieldSpec::new(
                "fuel",
                "Fuel",
                FieldKind::Choice(vec!["Petrol".into(), "Diesel".into()]),
            ),
            FieldSpec::new("date", "Date", FieldKind::Date),
        ]);

        let bad = FormState::new()
            .with("year", FieldValue::text("19x0"))
            .with("fuel", FieldValue::choice("Coal"))
            .with("date", FieldValue::text("31/12/2025"));
        let r = schema.validate(&bad);
        assert_eq!(r.error_for("year"), Some("Year must be a number."));
        assert_eq!(r.error_for("fuel"), Some("Select a valid fuel."));
        assert_eq!(r.error_for("date"), Some("Date must be a date (YYYY-MM-DD)."));

        let out_of_range = FormState::new()
            .with("year", FieldValue::Number(1850.0))
            .with("fuel", FieldValue::choice("Diesel"))
            .with("date", FieldValue::text("2025-12-31"));
        let r = schema.validate(&out_of_range);
        assert_eq!(r.error_for("year"), Some("Year must be between 1900 and 2030."));
        assert_eq!(r.error_count(), 1);
    }

    #[test]
    fn missing_required_field_reports_required() {
        let schema = FormSchema::new(vec![FieldSpec::new("make", "Make", FieldKind::Text)]);
        let r = schema.validate(&FormState::new());
        assert_eq!(r.error_for("make"), Some("Make is required."));
    }

    #[test]
    fn pattern_and_not_before() {
        let schema = FormSchema::new(vec![
            FieldSpec::new("email", "Email", FieldKind::Text)
                .rule(Rule::pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$", "Enter a valid email.").unwrap()),
            FieldSpec::new("date", "Date", FieldKind::Date).rule(Rule::NotBefore(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            )),
        ]);
        let r = schema.validate(
            &FormState::new()
                .with("email", FieldValue::text("nobody"))
                .with("date", FieldValue::text("2025-06-01")),
        );
        assert_eq!(r.error_for("email"), Some("Enter a valid email."));
        assert_eq!(
            r.error_for("date"),
            Some("Date cannot be earlier than 2026-01-01.")
        );
    }

    #[test]
    fn step_validation_only_checks_step_fields() {
        let schema = FormSchema::new(vec![
            FieldSpec::new("a", "A", FieldKind::Text),
            FieldSpec::new("b", "B", FieldKind::Text),
        ]);
        let steps = vec![
            StepDefinition::new(1, "One", &["a"]),
            StepDefinition::new(2, "Two", &["b"]),
        ];
        let form = FormState::new().with("a", FieldValue::text("filled"));
        let r = schema.validate_step(&form, &steps[0]);
        assert!(r.is_valid());
        assert_eq!(r.checked_fields().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(schema.first_invalid_step(&form, &steps), Some(2));
    }

    proptest! {
        #[test]
        fn blank_password_never_triggers_confirm_or_differs_errors(
            old in "[a-z0-9]{0,10}",
            confirm in "[a-z0-9]{0,10}",
        ) {
            let r = password_schema().validate(&profile_form(&old, "", &confirm));
            prop_assert!(r.error_for("confirmPassword").is_none());
            prop_assert!(r.error_for("password").is_none());
        }

        #[test]
        fn equal_non_empty_old_and_new_always_flags_new(pw in "[a-z0-9]{6,12}") {
            let r = password_schema().validate(&profile_form(&pw, &pw, &pw));
            prop_assert!(r.error_for("password").is_some());
        }
    }
}
