//! Security module.
//!
//! Caller IP addresses are abuse-correlation signals, not user data we
//! want to hold: only a salted hash ever reaches the store.

pub mod hashing;

pub use hashing::hash_ip;
