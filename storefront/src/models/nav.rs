// Navigation items shown in the storefront header.
//
// Each item is a plain enum variant; its glyph and label come from `nav_entry`, the single
// lookup the views use.

use super::responses::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavItem {
    Home,
    Vehicles,
    Maintenance,
    Dashboard,
    Users,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    House,
    Car,
    Wrench,
    Chart,
    People,
    Person,
}

impl Glyph {
    /// Terminal-safe rendering of the glyph.
    pub fn symbol(&self) -> &'static str {
        match self {
            Glyph::House => "⌂",
            Glyph::Car => "◆",
            Glyph::Wrench => "⚙",
            Glyph::Chart => "▤",
            Glyph::People => "☰",
            Glyph::Person => "●",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEntry {
    pub label: &'static str,
    pub glyph: Glyph,
    pub admin_only: bool,
}

pub const ALL_NAV_ITEMS: [NavItem; 6] = [
    NavItem::Home,
    NavItem::Vehicles,
    NavItem::Maintenance,
    NavItem::Dashboard,
    NavItem::Users,
    NavItem::Profile,
];

pub fn nav_entry(item: NavItem) -> NavEntry {
    let (label, glyph, admin_only) = match item {
        NavItem::Home => ("Home", Glyph::House, false),
        NavItem::Vehicles => ("Vehicles", Glyph::Car, false),
        NavItem::Maintenance => ("Maintenance", Glyph::Wrench, false),
        NavItem::Dashboard => ("Dashboard", Glyph::Chart, true),
        NavItem::Users => ("Users", Glyph::People, true),
        NavItem::Profile => ("Profile", Glyph::Person, false),
    };
    NavEntry {
        label,
        glyph,
        admin_only,
    }
}

/// Items visible for a role; signed-out visitors get the public ones without Profile.
pub fn visible_items(role: Option<Role>) -> Vec<NavItem> {
    ALL_NAV_ITEMS
        .iter()
        .copied()
        .filter(|item| {
            let entry = nav_entry(*item);
            match role {
                Some(Role::Admin) => true,
                Some(Role::Customer) => !entry.admin_only,
                None => !entry.admin_only && *item != NavItem::Profile,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_sees_everything_customer_does_not() {
        assert_eq!(visible_items(Some(Role::Admin)).len(), ALL_NAV_ITEMS.len());
        let customer = visible_items(Some(Role::Customer));
        assert!(!customer.contains(&NavItem::Dashboard));
        assert!(!customer.contains(&NavItem::Users));
        assert!(customer.contains(&NavItem::Profile));
        let visitor = visible_items(None);
        assert_eq!(
            visitor,
            vec![NavItem::Home, NavItem::Vehicles, NavItem::Maintenance]
        );
    }

    #[test]
    fn every_item_has_a_distinct_glyph() {
        let mut symbols: Vec<&str> = ALL_NAV_ITEMS
            .iter()
            .map(|i| nav_entry(*i).glyph.symbol())
            .collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), ALL_NAV_ITEMS.len());
    }
}
