//! Record drafts
//!
//! A draft is an unvalidated bag of record fields. Commands receive records
//! as `field=value` tokens, for example:
//!
//! ```text
//! insert 7 name=Ann x=10 y=2.5 impact_speed=12 soundtrack_name=Theme weapon_type=axe car=Mazda
//! ```
//!
//! An empty value (`y=`) leaves the field absent.

use std::str::FromStr;

use super::WeaponType;
use crate::error::{BeingError, Result};

/// Field names accepted in `field=value` tokens
pub const FIELDS: [&str; 10] = [
    "name",
    "x",
    "y",
    "real_hero",
    "has_toothpick",
    "impact_speed",
    "soundtrack_name",
    "minutes_of_waiting",
    "weapon_type",
    "car",
];

/// Unvalidated record fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub name: Option<String>,
    pub x: Option<i64>,
    pub y: Option<f32>,
    pub real_hero: Option<bool>,
    pub has_toothpick: Option<bool>,
    pub impact_speed: Option<f32>,
    pub soundtrack_name: Option<String>,
    pub minutes_of_waiting: Option<f64>,
    pub weapon_type: Option<WeaponType>,
    pub car: Option<String>,
}

impl RecordDraft {
    /// Parse `field=value` tokens; later tokens override earlier ones
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        if tokens.is_empty() {
            return Err(BeingError::Validation(format!(
                "record fields expected as field=value ({})",
                FIELDS.join(", ")
            )));
        }

        let mut draft = RecordDraft::default();
        for token in tokens {
            let token = token.as_ref();
            let (field, value) = token.split_once('=').ok_or_else(|| {
                BeingError::Validation(format!("expected field=value, got '{}'", token))
            })?;
            draft.set(field.trim(), value.trim())?;
        }
        Ok(draft)
    }

    /// Set one field from its textual value
    pub fn set(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "name" => self.name = text(value),
            "x" => self.x = parse(field, value)?,
            "y" => self.y = parse(field, value)?,
            "real_hero" => self.real_hero = parse(field, value)?,
            "has_toothpick" => self.has_toothpick = parse(field, value)?,
            "impact_speed" => self.impact_speed = parse(field, value)?,
            "soundtrack_name" => self.soundtrack_name = text(value),
            "minutes_of_waiting" => self.minutes_of_waiting = parse(field, value)?,
            "weapon_type" => {
                self.weapon_type = if value.is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            "car" => self.car = text(value),
            other => {
                return Err(BeingError::Validation(format!(
                    "unknown field '{}' (expected one of {})",
                    other,
                    FIELDS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// Render back into `field=value` tokens, skipping absent fields
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut push = |field: &str, value: Option<String>| {
            if let Some(value) = value {
                tokens.push(format!("{}={}", field, value));
            }
        };
        push("name", self.name.clone());
        push("x", self.x.map(|v| v.to_string()));
        push("y", self.y.map(|v| v.to_string()));
        push("real_hero", self.real_hero.map(|v| v.to_string()));
        push("has_toothpick", self.has_toothpick.map(|v| v.to_string()));
        push("impact_speed", self.impact_speed.map(|v| v.to_string()));
        push("soundtrack_name", self.soundtrack_name.clone());
        push("minutes_of_waiting", self.minutes_of_waiting.map(|v| v.to_string()));
        push("weapon_type", self.weapon_type.map(|v| v.to_string()));
        push("car", self.car.clone());
        tokens
    }
}

fn text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse<T: FromStr>(field: &str, value: &str) -> Result<Option<T>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| BeingError::Validation(format!("invalid value '{}' for {}", value, field)))
}
