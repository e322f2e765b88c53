//! HumanBeing record definitions

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use super::{Key, RecordDraft};
use crate::error::{BeingError, Result};

/// Weapon category, ordered by declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeaponType {
    Hammer,
    Axe,
    Shotgun,
    Rifle,
    Knife,
}

impl WeaponType {
    pub const ALL: [WeaponType; 5] = [
        WeaponType::Hammer,
        WeaponType::Axe,
        WeaponType::Shotgun,
        WeaponType::Rifle,
        WeaponType::Knife,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeaponType::Hammer => "HAMMER",
            WeaponType::Axe => "AXE",
            WeaponType::Shotgun => "SHOTGUN",
            WeaponType::Rifle => "RIFLE",
            WeaponType::Knife => "KNIFE",
        }
    }
}

impl fmt::Display for WeaponType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeaponType {
    type Err = BeingError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        WeaponType::ALL
            .iter()
            .copied()
            .find(|w| w.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = WeaponType::ALL.iter().map(|w| w.as_str()).collect();
                BeingError::Validation(format!(
                    "unknown weapon type '{}' (expected one of {})",
                    wanted,
                    names.join(", ")
                ))
            })
    }
}

/// A 2-D position: `x` is required, `y` may be absent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub x: i64,
    pub y: Option<f32>,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.y {
            Some(y) => write!(f, "({}, {})", self.x, y),
            None => write!(f, "({}, -)", self.x),
        }
    }
}

/// A named car
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Car {
    name: String,
}

impl Car {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BeingError::Validation("car name must not be empty".to_string()));
        }
        storable_text(&name, "car name")?;
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One record of the collection
///
/// Fields are private: the only way to obtain a `HumanBeing` is
/// [`HumanBeing::new`], which validates every field.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanBeing {
    id: Key,
    name: String,
    coordinates: Coordinates,
    creation_date: NaiveDate,
    real_hero: Option<bool>,
    has_toothpick: Option<bool>,
    impact_speed: f32,
    soundtrack_name: String,
    minutes_of_waiting: Option<f64>,
    weapon_type: WeaponType,
    car: Option<Car>,
}

impl HumanBeing {
    /// Build a record from a draft, rejecting missing or out-of-range fields
    pub fn new(id: Key, creation_date: NaiveDate, draft: RecordDraft) -> Result<Self> {
        if id == 0 {
            return Err(BeingError::Validation("id must be a positive integer".to_string()));
        }

        let name = required(draft.name, "name")?;
        if name.trim().is_empty() {
            return Err(BeingError::Validation("name must not be empty".to_string()));
        }
        storable_text(&name, "name")?;

        let x = required(draft.x, "x")?;
        if let Some(y) = draft.y {
            if !y.is_finite() {
                return Err(BeingError::Validation("y must be a finite number".to_string()));
            }
        }

        let impact_speed = required(draft.impact_speed, "impact_speed")?;
        if !impact_speed.is_finite() || impact_speed <= 0.0 {
            return Err(BeingError::Validation(format!(
                "impact_speed must be greater than 0 (got {})",
                impact_speed
            )));
        }

        let soundtrack_name = required(draft.soundtrack_name, "soundtrack_name")?;
        if soundtrack_name.trim().is_empty() {
            return Err(BeingError::Validation(
                "soundtrack_name must not be empty".to_string(),
            ));
        }
        storable_text(&soundtrack_name, "soundtrack_name")?;

        if let Some(minutes) = draft.minutes_of_waiting {
            if !minutes.is_finite() {
                return Err(BeingError::Validation(
                    "minutes_of_waiting must be a finite number".to_string(),
                ));
            }
        }

        let weapon_type = required(draft.weapon_type, "weapon_type")?;
        let car = draft.car.map(Car::new).transpose()?;

        Ok(Self {
            id,
            name,
            coordinates: Coordinates { x, y: draft.y },
            creation_date,
            real_hero: draft.real_hero,
            has_toothpick: draft.has_toothpick,
            impact_speed,
            soundtrack_name,
            minutes_of_waiting: draft.minutes_of_waiting,
            weapon_type,
            car,
        })
    }

    /// Build a record dated today
    pub fn create(id: Key, draft: RecordDraft) -> Result<Self> {
        Self::new(id, chrono::Local::now().date_naive(), draft)
    }

    /// Ordering used by `remove_greater`, `remove_lower` and
    /// `replace_if_greater`: impact speed, then name, then soundtrack name.
    /// Key and creation date are ignored.
    pub fn compare(&self, other: &HumanBeing) -> Ordering {
        self.impact_speed
            .total_cmp(&other.impact_speed)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.soundtrack_name.cmp(&other.soundtrack_name))
    }

    /// Same record, keeping the creation date of the one it replaces
    pub(crate) fn dated(mut self, creation_date: NaiveDate) -> Self {
        self.creation_date = creation_date;
        self
    }

    /// Field values as a draft (inverse of [`HumanBeing::new`])
    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            name: Some(self.name.clone()),
            x: Some(self.coordinates.x),
            y: self.coordinates.y,
            real_hero: self.real_hero,
            has_toothpick: self.has_toothpick,
            impact_speed: Some(self.impact_speed),
            soundtrack_name: Some(self.soundtrack_name.clone()),
            minutes_of_waiting: self.minutes_of_waiting,
            weapon_type: Some(self.weapon_type),
            car: self.car.as_ref().map(|c| c.name.clone()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> Key {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn creation_date(&self) -> NaiveDate {
        self.creation_date
    }

    pub fn real_hero(&self) -> Option<bool> {
        self.real_hero
    }

    pub fn has_toothpick(&self) -> Option<bool> {
        self.has_toothpick
    }

    pub fn impact_speed(&self) -> f32 {
        self.impact_speed
    }

    pub fn soundtrack_name(&self) -> &str {
        &self.soundtrack_name
    }

    pub fn minutes_of_waiting(&self) -> Option<f64> {
        self.minutes_of_waiting
    }

    pub fn weapon_type(&self) -> WeaponType {
        self.weapon_type
    }

    pub fn car(&self) -> Option<&Car> {
        self.car.as_ref()
    }
}

impl fmt::Display for HumanBeing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HumanBeing #{} {{ name: {}, coordinates: {}, created: {}, real_hero: {}, \
             has_toothpick: {}, impact_speed: {}, soundtrack: {}, minutes_of_waiting: {}, \
             weapon: {}, car: {} }}",
            self.id,
            self.name,
            self.coordinates,
            self.creation_date,
            or_dash(self.real_hero),
            or_dash(self.has_toothpick),
            self.impact_speed,
            self.soundtrack_name,
            or_dash(self.minutes_of_waiting),
            self.weapon_type,
            or_dash(self.car.as_ref()),
        )
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| BeingError::Validation(format!("{} is required", field)))
}

/// Reject characters a snapshot cannot hold verbatim: XML 1.0 forbids most
/// control characters and U+FFFE/U+FFFF, and parsers rewrite `\r` as `\n`.
fn storable_text(value: &str, field: &str) -> Result<()> {
    let bad = value.chars().find(|&c| match c {
        '\t' | '\n' => false,
        '\u{FFFE}' | '\u{FFFF}' => true,
        c => (c as u32) < 0x20,
    });
    match bad {
        Some(c) => Err(BeingError::Validation(format!(
            "{} contains unsupported character {:?}",
            field, c
        ))),
        None => Ok(()),
    }
}

fn or_dash<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
