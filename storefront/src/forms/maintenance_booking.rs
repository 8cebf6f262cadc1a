// Maintenance booking wizard: Service -> Date & Time -> Vehicle -> Contact.

use super::choices;
use crate::models::responses::{MaintenanceAppointment, User};
use crate::wizard::validation::DATE_FORMAT;
use crate::wizard::{
    FieldKind, FieldSpec, FieldValue, FormSchema, FormState, Rule, StepDefinition,
    SubmissionOptions, Wizard,
};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};

pub const TITLE: &str = "Book maintenance";
pub const EDIT_TITLE: &str = "Reschedule appointment";

pub const SERVICE_TYPES: &[&str] = &[
    "Oil Change",
    "Brake Service",
    "Tire Rotation",
    "Engine Diagnostics",
    "Battery Replacement",
    "General Inspection",
];

const OPENING_HOUR: u32 = 8;
const CLOSING_HOUR: u32 = 17;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE_PATTERN: &str = r"^\+?[0-9()\-\s]{7,20}$";

/// Half-hour slots from opening until the last slot before closing.
pub fn time_slots() -> Vec<String> {
    (OPENING_HOUR..CLOSING_HOUR)
        .flat_map(|h| [format!("{:02}:00", h), format!("{:02}:30", h)])
        .collect()
}

pub fn steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(1, "Service", &["serviceType"]),
        StepDefinition::new(2, "Date & Time", &["date", "time"]),
        StepDefinition::new(
            3,
            "Vehicle",
            &["vehicleMake", "vehicleModel", "vehicleYear", "licensePlate"],
        ),
        StepDefinition::new(4, "Contact", &["name", "email", "phone", "notes"]),
    ]
}

/// Appointments cannot be booked before `today`.
pub fn schema(today: NaiveDate) -> Result<FormSchema> {
    Ok(FormSchema::new(vec![
        FieldSpec::new(
            "serviceType",
            "Service",
            FieldKind::Choice(choices(SERVICE_TYPES)),
        ),
        FieldSpec::new("date", "Date", FieldKind::Date).rule(Rule::NotBefore(today)),
        FieldSpec::new("time", "Time", FieldKind::Choice(time_slots())),
        FieldSpec::new("vehicleMake", "Make", FieldKind::Text).rule(Rule::MaxLength(40)),
        FieldSpec::new("vehicleModel", "Model", FieldKind::Text).rule(Rule::MaxLength(60)),
        FieldSpec::new("vehicleYear", "Year", FieldKind::Number).rule(Rule::Range {
            min: 1900.0,
            max: (today.year() + 1) as f64,
        }),
        FieldSpec::new("licensePlate", "License plate", FieldKind::Text)
            .optional()
            .rule(Rule::MaxLength(10)),
        FieldSpec::new("name", "Name", FieldKind::Text).rule(Rule::MinLength(2)),
        FieldSpec::new("email", "Email", FieldKind::Text).rule(
            Rule::pattern(EMAIL_PATTERN, "Enter a valid email address.")
                .context("email pattern")?,
        ),
        FieldSpec::new("phone", "Phone", FieldKind::Text).rule(
            Rule::pattern(PHONE_PATTERN, "Enter a valid phone number.")
                .context("phone pattern")?,
        ),
        FieldSpec::new("notes", "Notes", FieldKind::Text)
            .optional()
            .rule(Rule::MaxLength(500)),
    ]))
}

fn blank_form() -> FormState {
    FormState::new()
        .with("serviceType", FieldValue::choice(""))
        .with("date", FieldValue::text(""))
        .with("time", FieldValue::choice(""))
        .with("vehicleMake", FieldValue::text(""))
        .with("vehicleModel", FieldValue::text(""))
        .with("vehicleYear", FieldValue::text(""))
        .with("licensePlate", FieldValue::text(""))
        .with("name", FieldValue::text(""))
        .with("email", FieldValue::text(""))
        .with("phone", FieldValue::text(""))
        .with("notes", FieldValue::text(""))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// New booking. A signed-in customer's contact details are filled in.
pub fn new_booking(contact: Option<&User>, options: SubmissionOptions) -> Result<Wizard> {
    let mut initial = blank_form();
    if let Some(user) = contact {
        initial.set("name", FieldValue::text(&user.name));
        initial.set("email", FieldValue::text(&user.email));
        initial.set("phone", FieldValue::text(&user.phone));
    }
    Wizard::new(TITLE, steps(), schema(today())?, initial, options)
        .context("Failed to build maintenance booking wizard")
}

pub fn from_appointment(
    appointment: &MaintenanceAppointment,
    options: SubmissionOptions,
) -> Result<Wizard> {
    let initial = FormState::new()
        .with("serviceType", FieldValue::choice(&appointment.service_type))
        .with(
            "date",
            FieldValue::text(appointment.date.format(DATE_FORMAT).to_string()),
        )
        .with("time", FieldValue::choice(&appointment.time))
        .with("vehicleMake", FieldValue::text(&appointment.vehicle_make))
        .with("vehicleModel", FieldValue::text(&appointment.vehicle_model))
        .with(
            "vehicleYear",
            FieldValue::Number(appointment.vehicle_year as f64),
        )
        .with("licensePlate", FieldValue::text(&appointment.license_plate))
        .with("name", FieldValue::text(&appointment.name))
        .with("email", FieldValue::text(&appointment.email))
        .with("phone", FieldValue::text(&appointment.phone))
        .with("notes", FieldValue::text(&appointment.notes));
    Wizard::new(EDIT_TITLE, steps(), schema(today())?, initial, options)
        .with_context(|| format!("Failed to build edit wizard for appointment {}", appointment.id))
}
