//! Payload validation module.
//!
//! Range-checks every field of a submitted trip, collecting all
//! violations in one pass so the client gets a complete correction list.

pub mod schema;

pub use schema::validate_payload;
