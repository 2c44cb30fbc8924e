//! Fixed vocabularies
//!
//! Process-wide constant tables: measurement units (singular/plural display
//! forms), shopping departments, weekday labels, meal slot labels and the
//! reserved category name. None of these are mutable at runtime.

use crate::Error;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Name of the reserved category that always exists and cannot be deleted ("favorites")
pub const DEFAULT_CATEGORY_NAME: &str = "מועדפים";

/// Department assigned to shopping list items that carry none ("other")
pub const DEFAULT_DEPARTMENT: &str = "אחר";

pub const MILLILITER: &str = "מ\"ל";
pub const LITER: &str = "ליטר";
pub const MILLIGRAM: &str = "מ\"ג";
pub const GRAM: &str = "גרם";
pub const KILOGRAM: &str = "ק\"ג";

/// Display forms of one measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitForms {
    pub singular: &'static str,
    pub plural: &'static str,
}

/// Unit vocabulary offered when entering ingredients
///
/// Abbreviations do not inflect, so their plural is the abbreviation itself.
pub const UNITS: &[UnitForms] = &[
    UnitForms { singular: MILLILITER, plural: MILLILITER },
    UnitForms { singular: LITER, plural: "ליטרים" },
    UnitForms { singular: MILLIGRAM, plural: MILLIGRAM },
    UnitForms { singular: GRAM, plural: GRAM },
    UnitForms { singular: KILOGRAM, plural: KILOGRAM },
    UnitForms { singular: "כוס", plural: "כוסות" },
    UnitForms { singular: "כף", plural: "כפות" },
    UnitForms { singular: "כפית", plural: "כפיות" },
    UnitForms { singular: "יחידה", plural: "יחידות" },
    UnitForms { singular: "קורט", plural: "קורט" },
];

/// Long spellings written by older builds, mapped to their abbreviation
const LEGACY_UNIT_ALIASES: &[(&str, &str)] = &[
    ("מיליליטרים", MILLILITER),
    ("מיליגרם", MILLIGRAM),
    ("קילוגרם", KILOGRAM),
];

static UNIT_INDEX: Lazy<HashMap<&'static str, &'static UnitForms>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for forms in UNITS {
        index.insert(forms.singular, forms);
        index.insert(forms.plural, forms);
    }
    for (alias, canonical) in LEGACY_UNIT_ALIASES {
        if let Some(forms) = UNITS.iter().find(|f| f.singular == *canonical) {
            index.insert(*alias, forms);
        }
    }
    index
});

/// Look up the display forms for any known spelling of a unit
pub fn unit_forms(label: &str) -> Option<&'static UnitForms> {
    UNIT_INDEX.get(label).copied()
}

/// Singular form of a known unit, `None` for units outside the vocabulary
pub fn singular_unit(label: &str) -> Option<&'static str> {
    unit_forms(label).map(|f| f.singular)
}

/// Plural form of a known unit, `None` for units outside the vocabulary
pub fn plural_unit(label: &str) -> Option<&'static str> {
    unit_forms(label).map(|f| f.plural)
}

/// Shopping departments an ingredient can be tagged with
pub const DEPARTMENTS: &[&str] = &[
    "פירות וירקות",
    "בשר ועוף",
    "דגים",
    "תבלינים",
    "מוצרי חלב וביצים",
    "ממרחים",
    "קפה ותה",
    "ממתקים",
    "אלכוהול",
    "שימורים",
    "לחם",
    DEFAULT_DEPARTMENT,
];

pub fn is_department(label: &str) -> bool {
    DEPARTMENTS.contains(&label)
}

/// Day of the weekly meal plan (week starts on Sunday)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Stored label for this day
    pub fn label(self) -> &'static str {
        match self {
            Weekday::Sunday => "יום ראשון",
            Weekday::Monday => "יום שני",
            Weekday::Tuesday => "יום שלישי",
            Weekday::Wednesday => "יום רביעי",
            Weekday::Thursday => "יום חמישי",
            Weekday::Friday => "יום שישי",
            Weekday::Saturday => "יום שבת",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == label)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Weekday {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| Error::InvalidSlot(format!("unknown day '{}'", s)))
    }
}

/// Meal slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MealSlot {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 5] = [
        MealSlot::Breakfast,
        MealSlot::MorningSnack,
        MealSlot::Lunch,
        MealSlot::AfternoonSnack,
        MealSlot::Dinner,
    ];

    /// Stored label for this slot
    pub fn label(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "ארוחת בוקר",
            MealSlot::MorningSnack => "ארוחת עשר",
            MealSlot::Lunch => "ארוחת צהריים",
            MealSlot::AfternoonSnack => "ארוחת ארבע",
            MealSlot::Dinner => "ארוחת ערב",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MealSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| Error::InvalidSlot(format!("unknown meal type '{}'", s)))
    }
}
