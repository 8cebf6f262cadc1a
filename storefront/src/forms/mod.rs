// Concrete wizards offered by the storefront.
//
// Each builder returns a ready `Wizard`: steps, schema and initial values (schema defaults for
// create flows, fetched entity values for edit flows).

pub mod maintenance_booking;
pub mod profile_edit;
pub mod vehicle_listing;

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardKind {
    VehicleListing,
    MaintenanceBooking,
    ProfileEdit,
}

impl WizardKind {
    pub const ALL: [WizardKind; 3] = [
        WizardKind::VehicleListing,
        WizardKind::MaintenanceBooking,
        WizardKind::ProfileEdit,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            WizardKind::VehicleListing => "vehicle",
            WizardKind::MaintenanceBooking => "booking",
            WizardKind::ProfileEdit => "profile",
        }
    }
}

impl fmt::Display for WizardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for WizardKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vehicle" | "listing" => Ok(WizardKind::VehicleListing),
            "booking" | "maintenance" => Ok(WizardKind::MaintenanceBooking),
            "profile" => Ok(WizardKind::ProfileEdit),
            other => Err(anyhow!(
                "Unknown wizard '{}'. Expected one of: vehicle, booking, profile",
                other
            )),
        }
    }
}

fn choices(options: &[&str]) -> Vec<String> {
    options.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wizard_kind_parses_keys_and_aliases() {
        for kind in WizardKind::ALL {
            assert_eq!(kind.key().parse::<WizardKind>().unwrap(), kind);
        }
        assert_eq!(
            " Maintenance ".parse::<WizardKind>().unwrap(),
            WizardKind::MaintenanceBooking
        );
        assert!("checkout".parse::<WizardKind>().is_err());
    }
}
