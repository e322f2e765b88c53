//! Model Module
//!
//! The HumanBeing record and its parts.
//!
//! ## Responsibilities
//! - Validated construction (invalid records never exist)
//! - Ordering used by the `*_greater` / `*_lower` commands
//! - Parsing user input (`field=value` tokens) into a draft
//!
//! ## Record Layout
//! ```text
//! HumanBeing
//! ├── id              u32 > 0, immutable
//! ├── name            non-empty
//! ├── coordinates     { x: i64, y: Option<f32> }
//! ├── creation_date   fixed at first creation
//! ├── real_hero       Option<bool>
//! ├── has_toothpick   Option<bool>
//! ├── impact_speed    f32 > 0
//! ├── soundtrack_name non-empty
//! ├── minutes_of_waiting Option<f64>
//! ├── weapon_type     WeaponType
//! └── car             Option<Car { name }>
//! ```

mod draft;
mod record;

pub use draft::RecordDraft;
pub use record::{Car, Coordinates, HumanBeing, WeaponType};

/// Record key type
pub type Key = u32;
