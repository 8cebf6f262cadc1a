// Profile edit: a single-step form. Every field is optional on its own; the password trio
// only comes into play once a new password is typed.

use crate::models::responses::User;
use crate::wizard::{
    FieldKind, FieldSpec, FieldValue, FormSchema, FormState, Rule, StepDefinition,
    SubmissionOptions, Wizard,
};
use anyhow::{Context, Result};

pub const TITLE: &str = "Edit profile";
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn steps() -> Vec<StepDefinition> {
    vec![StepDefinition::new(
        1,
        "Profile",
        &["name", "phone", "oldPassword", "password", "confirmPassword"],
    )]
}

pub fn schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("name", "Name", FieldKind::Text)
            .optional()
            .rule(Rule::MinLength(2)),
        FieldSpec::new("phone", "Phone", FieldKind::Text).optional(),
        FieldSpec::new("oldPassword", "Current password", FieldKind::Password).optional(),
        FieldSpec::new("password", "New password", FieldKind::Password)
            .optional()
            .rule(Rule::MinLength(MIN_PASSWORD_LEN))
            .rule(Rule::differs_from(
                "oldPassword",
                "New password must differ from the current one.",
            )),
        FieldSpec::new("confirmPassword", "Confirm password", FieldKind::Password)
            .required_when_filled("password")
            .rule(Rule::equals_field("password", "Passwords do not match.")),
    ])
}

fn form_for(name: &str, phone: &str) -> FormState {
    FormState::new()
        .with("name", FieldValue::text(name))
        .with("phone", FieldValue::text(phone))
        .with("oldPassword", FieldValue::text(""))
        .with("password", FieldValue::text(""))
        .with("confirmPassword", FieldValue::text(""))
}

pub fn from_user(user: &User, options: SubmissionOptions) -> Result<Wizard> {
    Wizard::new(
        TITLE,
        steps(),
        schema(),
        form_for(&user.name, &user.phone),
        options,
    )
    .with_context(|| format!("Failed to build profile wizard for user {}", user.id))
}

/// Profile form with nothing prefilled (no fetched user available).
pub fn blank(options: SubmissionOptions) -> Result<Wizard> {
    Wizard::new(TITLE, steps(), schema(), form_for("", ""), options)
        .context("Failed to build profile wizard")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::responses::Role;
    use proptest::prelude::*;

    #[test]
    fn mismatched_confirmation_is_the_only_error() {
        let form = form_for("", "")
            .with("password", FieldValue::text("abc123"))
            .with("confirmPassword", FieldValue::text("abc124"));
        let result = schema().validate(&form);
        assert_eq!(result.error_count(), 1, "{:?}", result);
        assert_eq!(
            result.error_for("confirmPassword"),
            Some("Passwords do not match.")
        );
        for field in ["name", "phone", "oldPassword", "password"] {
            assert!(result.error_for(field).is_none(), "{} should pass", field);
        }
    }

    #[test]
    fn untouched_profile_is_submittable() {
        let user = User {
            id: "u1".into(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            phone: String::new(),
            role: Role::Customer,
        };
        let w = from_user(&user, SubmissionOptions::default()).unwrap();
        assert_eq!(w.steps().len(), 1);
        assert!(w.is_last_step());
        assert!(w.can_submit());
        assert_eq!(w.form().get_str("name"), "Dana");
    }

    #[test]
    fn confirmation_required_once_password_typed() {
        let mut w = blank(SubmissionOptions::default()).unwrap();
        w.set_value("password", FieldValue::text("longenough"));
        assert_eq!(
            w.validation().error_for("confirmPassword"),
            Some("Confirm password is required.")
        );
        w.set_value("password", FieldValue::text(""));
        assert!(w.validation().is_valid());
    }

    #[test]
    fn new_password_must_differ_and_be_long_enough() {
        let form = form_for("", "")
            .with("oldPassword", FieldValue::text("same-secret"))
            .with("password", FieldValue::text("same-secret"))
            .with("confirmPassword", FieldValue::text("same-secret"));
        let result = schema().validate(&form);
        assert_eq!(
            result.error_for("password"),
            Some("New password must differ from the current one.")
        );

        let short = form.with("password", FieldValue::text("abc"));
        assert_eq!(
            schema().validate(&short).error_for("password"),
            Some("New password must be at least 6 characters.")
        );
    }

    proptest! {
        #[test]
        fn matching_confirmation_never_errors(pw in "[a-zA-Z0-9]{6,24}") {
            let form = form_for("", "")
                .with("password", FieldValue::text(pw.clone()))
                .with("confirmPassword", FieldValue::text(pw));
            prop_assert!(schema().validate(&form).is_valid());
        }
    }
}
