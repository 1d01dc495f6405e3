//! Travel provider adapter contract.
//!
//! The core treats the provider as a black box: `search` returns an ordered
//! list of offers, `create_booking` returns a confirmation or a typed error.
//! Authentication, request shaping, and rate-limit compliance live behind
//! this trait.

mod mock;

pub use mock::MockTravelApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Domain Types
// ============================================================================

/// Itinerary component category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Flight,
    Lodging,
    GroundTransport,
}

impl Category {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Flight => "flight",
            Category::Lodging => "lodging",
            Category::GroundTransport => "ground_transport",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A priced, time-bounded option returned by a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Provider-scoped offer reference.
    pub id: String,
    pub category: Category,
    /// Human-readable summary for presentation.
    pub summary: String,
    pub price: f64,
    pub currency: String,
}

/// Traveler identity attached to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traveler {
    pub full_name: String,
    pub email: String,
}

/// A confirmed booking from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Provider booking reference (PNR or equivalent).
    pub reference: String,
    /// Offer references included in the booking.
    pub offer_ids: Vec<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Typed provider-side failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("offer not found: {0}")]
    NotFound(String),

    #[error("offer expired: {0}")]
    Expired(String),

    #[error("booking rejected by provider: {0}")]
    Rejected(String),

    #[error("provider unavailable")]
    Unavailable,
}

// ============================================================================
// Adapter Trait
// ============================================================================

/// Contract with the external travel provider.
#[async_trait]
pub trait TravelApi: Send + Sync {
    /// Search for offers in a category. Criteria are the already-validated
    /// tool arguments for that category's search tool.
    async fn search(
        &self,
        category: Category,
        criteria: &serde_json::Value,
    ) -> Result<Vec<Offer>, ProviderError>;

    /// Create a booking for the selected offers.
    ///
    /// The idempotency key identifies this exact itinerary + traveler; the
    /// provider may use it for its own dedup, the core uses it to
    /// short-circuit repeats before the call is ever made.
    async fn create_booking(
        &self,
        offer_ids: &[String],
        traveler: &Traveler,
        idempotency_key: &str,
    ) -> Result<Confirmation, ProviderError>;
}
