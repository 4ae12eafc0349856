//! Operation orchestration.
//!
//! The two request-scoped operations the engine exposes:
//! - `submission` - SubmitTrip: schema validation, rate limiting, fraud
//!   checks, tariff bounds with the IQR fallback, persistence
//! - `analysis` - AnalyzeSimilarTrips: zone/distance filtering,
//!   geographic refinement, grouped statistics
//!
//! `context` carries the per-request identity, resolved authorization,
//! and log context threaded through every step.

pub mod analysis;
pub mod context;
pub mod submission;

pub use analysis::{AnalysisQuery, AnalysisResponse};
pub use context::{Authorization, CallerIdentity, RequestContext};
pub use submission::{SubmitResponse, TripPayload};
