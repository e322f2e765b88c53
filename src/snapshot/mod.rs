//! Snapshot Module
//!
//! Full images of the record store, as XML.
//!
//! ## Responsibilities
//! - Encode/decode the collection (`codec`)
//! - Persist it to a file and load it back (`manager`)
//! - Carry it over the wire for `save_dump` / `get_dump`
//!
//! ## Document Format
//! ```text
//! <humanBeings>
//!   <humanBeing id="1">
//!     <name/> <coordinates><x/><y/></coordinates> <creationDate/>
//!     <realHero/> <hasToothpick/> <impactSpeed/> <soundtrackName/>
//!     <minutesOfWaiting/> <weaponType/> <car><name/></car>
//!   </humanBeing>
//!   ...
//! </humanBeings>
//! ```

pub mod codec;
mod manager;

pub use codec::{decode, decode_lenient, encode, DecodeReport};
pub use manager::{Reloaded, SnapshotManager};
