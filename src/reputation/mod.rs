//! Rating aggregation and uploader reputation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌─────────────────────┐
//! │ RatingValue  │────►│ ReputationManager │────►│ Store               │
//! │ (1..=5)      │     │ (orchestrator)    │     │ (material, uploader)│
//! └──────────────┘     └───────────────────┘     └─────────────────────┘
//!                               │
//!                               ▼
//!                      ┌──────────────────────┐
//!                      │ ReputationThresholds │
//!                      │ (Expert promotion,   │
//!                      │  upload points)      │
//!                      └──────────────────────┘
//! ```
//!
//! ## Model
//!
//! - One rating per user per material; re-rating overwrites
//! - Average rating is the mean of current values, 0 when unrated
//! - A material with enough high ratings promotes its uploader to Expert
//! - Badges are only ever added
//! - Each upload awards a fixed number of contribution points

mod manager;
mod rating;
mod thresholds;

pub use manager::ReputationManager;
pub use rating::{RatingChange, RatingValue, average_of, upsert_rating};
pub use thresholds::ReputationThresholds;
