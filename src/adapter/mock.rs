//! In-memory travel provider for local runs and tests.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::{Category, Confirmation, Offer, ProviderError, TravelApi, Traveler};

/// Deterministic mock provider.
///
/// Generates a fixed set of offers per category, seeded from the search
/// criteria so repeated searches return the same references. Bookings always
/// succeed unless an offer id is unknown.
pub struct MockTravelApi {
    /// Offer ids handed out so far, so bookings can be validated.
    known_offers: Mutex<Vec<String>>,
}

impl MockTravelApi {
    #[must_use]
    pub fn new() -> Self {
        Self {
            known_offers: Mutex::new(Vec::new()),
        }
    }

    fn offers_for(category: Category, criteria: &serde_json::Value) -> Vec<Offer> {
        let seed = criteria
            .get(match category {
                Category::Flight => "origin",
                Category::Lodging => "city",
                Category::GroundTransport => "city",
            })
            .and_then(|v| v.as_str())
            .unwrap_or("any")
            .to_ascii_lowercase();

        let (prefix, base_price, unit) = match category {
            Category::Flight => ("FL", 240.0, "nonstop"),
            Category::Lodging => ("HT", 160.0, "per night"),
            Category::GroundTransport => ("CR", 55.0, "per day"),
        };

        (1..=3)
            .map(|n| Offer {
                id: format!("{}-{}-{}", prefix, seed, n),
                category,
                summary: format!("{} option {} ({})", category, n, unit),
                price: base_price * n as f64,
                currency: "USD".to_string(),
            })
            .collect()
    }
}

impl Default for MockTravelApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TravelApi for MockTravelApi {
    async fn search(
        &self,
        category: Category,
        criteria: &serde_json::Value,
    ) -> Result<Vec<Offer>, ProviderError> {
        let offers = Self::offers_for(category, criteria);

        let mut known = self.known_offers.lock().await;
        for offer in &offers {
            if !known.contains(&offer.id) {
                known.push(offer.id.clone());
            }
        }

        info!(category = %category, count = offers.len(), "Mock search");
        Ok(offers)
    }

    async fn create_booking(
        &self,
        offer_ids: &[String],
        traveler: &Traveler,
        idempotency_key: &str,
    ) -> Result<Confirmation, ProviderError> {
        let known = self.known_offers.lock().await;
        for id in offer_ids {
            if !known.contains(id) {
                return Err(ProviderError::NotFound(id.clone()));
            }
        }

        // Reference derived from the key so replays would match.
        let reference = format!("PNR-{}", &idempotency_key[..8.min(idempotency_key.len())]);

        info!(reference = %reference, traveler = %traveler.email, "Mock booking created");
        Ok(Confirmation {
            reference,
            offer_ids: offer_ids.to_vec(),
        })
    }
}
