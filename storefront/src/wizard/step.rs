/// One panel (tab) of a wizard and the fields it collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub ordinal: usize,
    pub label: String,
    pub fields: Vec<String>,
}

impl StepDefinition {
    pub fn new(ordinal: usize, label: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            ordinal,
            label: label.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn collects(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}
