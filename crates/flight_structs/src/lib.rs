//! Common structs for flight records shared across crates.

mod carrier;
mod flight_type;
mod record;
mod training;

pub use carrier::*;
pub use flight_type::*;
pub use record::*;
pub use training::*;
