// Vehicle listing wizard (create and edit).

use super::choices;
use crate::models::responses::Vehicle;
use crate::wizard::{
    FieldKind, FieldSpec, FieldValue, FormSchema, FormState, Rule, StepDefinition,
    SubmissionOptions, Wizard,
};
use anyhow::{Context, Result};
use chrono::Datelike;

pub const TITLE: &str = "List a vehicle";
pub const EDIT_TITLE: &str = "Edit vehicle";

pub const BODY_TYPES: &[&str] = &[
    "Sedan",
    "Hatchback",
    "SUV",
    "Coupe",
    "Convertible",
    "Wagon",
    "Pickup",
    "Van",
];
pub const FUEL_TYPES: &[&str] = &["Petrol", "Diesel", "Hybrid", "Electric", "LPG"];
pub const TRANSMISSIONS: &[&str] = &["Manual", "Automatic"];
pub const CONDITIONS: &[&str] = &["New", "Used", "Certified Pre-Owned"];

pub const MIN_YEAR: i32 = 1900;

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

pub fn steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(1, "Basics", &["make", "model", "year", "bodyType"]),
        StepDefinition::new(2, "Details", &["mileage", "fuel", "transmission", "color"]),
        StepDefinition::new(3, "Pricing", &["price", "condition", "description"]),
        StepDefinition::new(4, "Photos", &["photos"]),
    ]
}

/// `current_year` bounds the model year (up to next year's models).
pub fn schema(current_year: i32) -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("make", "Make", FieldKind::Text).rule(Rule::MaxLength(40)),
        FieldSpec::new("model", "Model", FieldKind::Text).rule(Rule::MaxLength(60)),
        FieldSpec::new("year", "Year", FieldKind::Number).rule(Rule::Range {
            min: MIN_YEAR as f64,
            max: (current_year + 1) as f64,
        }),
        FieldSpec::new("bodyType", "Body type", FieldKind::Choice(choices(BODY_TYPES))),
        FieldSpec::new("mileage", "Mileage", FieldKind::Number).rule(Rule::Range {
            min: 0.0,
            max: 2_000_000.0,
        }),
        FieldSpec::new("fuel", "Fuel", FieldKind::Choice(choices(FUEL_TYPES))),
        FieldSpec::new(
            "transmission",
            "Transmission",
            FieldKind::Choice(choices(TRANSMISSIONS)),
        ),
        FieldSpec::new("color", "Color", FieldKind::Text)
            .optional()
            .rule(Rule::MaxLength(30)),
        FieldSpec::new("price", "Price", FieldKind::Number).rule(Rule::Range {
            min: 1.0,
            max: 10_000_000.0,
        }),
        FieldSpec::new("condition", "Condition", FieldKind::Choice(choices(CONDITIONS))),
        FieldSpec::new("description", "Description", FieldKind::Text)
            .optional()
            .rule(Rule::MaxLength(2000)),
        FieldSpec::new("photos", "Photos", FieldKind::Files).optional(),
    ])
}

/// Create-flow defaults: the year field starts at the current year, everything else empty.
pub fn defaults(current_year: i32) -> FormState {
    FormState::new()
        .with("make", FieldValue::text(""))
        .with("model", FieldValue::text(""))
        .with("year", FieldValue::Number(current_year as f64))
        .with("bodyType", FieldValue::choice(""))
        .with("mileage", FieldValue::text(""))
        .with("fuel", FieldValue::choice(""))
        .with("transmission", FieldValue::choice(""))
        .with("color", FieldValue::text(""))
        .with("price", FieldValue::text(""))
        .with("condition", FieldValue::choice(""))
        .with("description", FieldValue::text(""))
        .with("photos", FieldValue::Files(Vec::new()))
}

pub fn new_listing(options: SubmissionOptions) -> Result<Wizard> {
    let year = current_year();
    Wizard::new(TITLE, steps(), schema(year), defaults(year), options)
        .context("Failed to build vehicle listing wizard")
}

/// Edit flow. Existing photos stay on the server; the photos field only stages new uploads.
pub fn from_vehicle(vehicle: &Vehicle, options: SubmissionOptions) -> Result<Wizard> {
    let initial = FormState::new()
        .with("make", FieldValue::text(&vehicle.make))
        .with("model", FieldValue::text(&vehicle.model))
        .with("year", FieldValue::Number(vehicle.year as f64))
        .with("bodyType", FieldValue::choice(&vehicle.body_type))
        .with("mileage", FieldValue::Number(vehicle.mileage as f64))
        .with("fuel", FieldValue::choice(&vehicle.fuel))
        .with("transmission", FieldValue::choice(&vehicle.transmission))
        .with("color", FieldValue::text(&vehicle.color))
        .with("price", FieldValue::Number(vehicle.price))
        .with("condition", FieldValue::choice(&vehicle.condition))
        .with("description", FieldValue::text(&vehicle.description))
        .with("photos", FieldValue::Files(Vec::new()));
    Wizard::new(EDIT_TITLE, steps(), schema(current_year()), initial, options)
        .with_context(|| format!("Failed to build edit wizard for vehicle {}", vehicle.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::FileRef;

    fn listed() -> Vehicle {
        Vehicle {
            id: "v1".into(),
            make: "Toyota".into(),
            model: "Corolla".into(),
            year: 2015,
            body_type: "Sedan".into(),
            mileage: 98_000,
            fuel: "Hybrid".into(),
            transmission: "Automatic".into(),
            color: "Silver".into(),
            price: 11_500.0,
            condition: "Used".into(),
            description: String::new(),
            photos: vec!["https://cdn.example.com/v1/front.jpg".into()],
            created_at: None,
        }
    }

    #[test]
    fn steps_cover_every_schema_field_once() {
        let schema = schema(2026);
        let mut collected: Vec<String> = steps().into_iter().flat_map(|s| s.fields).collect();
        collected.sort();
        let mut declared: Vec<String> = schema.fields().iter().map(|f| f.name.clone()).collect();
        declared.sort();
        assert_eq!(collected, declared);
    }

    #[test]
    fn create_flow_defaults_year_and_starts_invalid() {
        let w = new_listing(SubmissionOptions::default()).unwrap();
        assert_eq!(w.steps().len(), 4);
        assert_eq!(
            w.form().get("year"),
            Some(&FieldValue::Number(current_year() as f64))
        );
        assert!(w.validation().error_for("year").is_none());
        assert_eq!(w.validation().error_for("make"), Some("Make is required."));
        assert!(!w.can_submit());
    }

    #[test]
    fn year_bounds_allow_next_model_year_only() {
        let schema = schema(2026);
        let mut form = defaults(2026);
        form.set("year", FieldValue::Number(2027.0));
        assert!(schema.validate(&form).error_for("year").is_none());
        form.set("year", FieldValue::Number(2028.0));
        assert_eq!(
            schema.validate(&form).error_for("year"),
            Some("Year must be between 1900 and 2027.")
        );
    }

    #[test]
    fn edit_flow_prefills_and_validates() {
        let mut w = from_vehicle(&listed(), SubmissionOptions::default()).unwrap();
        assert!(w.validation().is_valid(), "{:?}", w.validation());
        assert_eq!(w.form().get_str("make"), "Toyota");
        assert_eq!(w.title(), EDIT_TITLE);

        w.set_value(
            "photos",
            FieldValue::Files(vec![FileRef::new("/tmp/rear.jpg")]),
        );
        assert_eq!(w.form().attachments().len(), 1);
        assert!(w.can_submit());
    }

    #[test]
    fn unknown_choice_is_reported_on_that_field() {
        let mut w = from_vehicle(&listed(), SubmissionOptions::default()).unwrap();
        w.set_value("fuel", FieldValue::choice("Steam"));
        assert_eq!(w.validation().error_count(), 1);
        assert_eq!(w.validation().error_for("fuel"), Some("Select a valid fuel."));
        assert_eq!(w.first_invalid_step(), Some(2));
    }
}
