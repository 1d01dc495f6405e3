//! Per-itinerary booking context.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use crate::adapter::{Category, Offer, Traveler};

use super::state::WorkflowState;

/// Everything the workflow engine tracks for one itinerary.
///
/// Selections are monotonic: a later search stores fresh offers but never
/// touches an existing selection. Only an explicit re-select replaces one.
#[derive(Debug, Clone)]
pub struct BookingContext {
    state: WorkflowState,
    /// Categories the user has searched; each needs a selection before the
    /// itinerary is complete.
    required: BTreeSet<Category>,
    /// Offers from the most recent search per category.
    offers: BTreeMap<Category, Vec<Offer>>,
    /// Selected offer id per category.
    selections: BTreeMap<Category, String>,
    traveler: Option<Traveler>,
}

impl BookingContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: WorkflowState::CollectingRequirements,
            required: BTreeSet::new(),
            offers: BTreeMap::new(),
            selections: BTreeMap::new(),
            traveler: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub(super) fn set_state(&mut self, state: WorkflowState) {
        self.state = state;
    }

    #[must_use]
    pub fn required(&self) -> &BTreeSet<Category> {
        &self.required
    }

    pub(super) fn mark_required(&mut self, category: Category) {
        self.required.insert(category);
    }

    pub(super) fn store_offers(&mut self, category: Category, offers: Vec<Offer>) {
        self.offers.insert(category, offers);
    }

    #[must_use]
    pub fn offer(&self, category: Category, offer_id: &str) -> Option<&Offer> {
        self.offers
            .get(&category)?
            .iter()
            .find(|o| o.id == offer_id)
    }

    pub(super) fn select(&mut self, category: Category, offer_id: String) {
        self.selections.insert(category, offer_id);
    }

    #[must_use]
    pub fn selections(&self) -> &BTreeMap<Category, String> {
        &self.selections
    }

    #[must_use]
    pub fn traveler(&self) -> Option<&Traveler> {
        self.traveler.as_ref()
    }

    pub(super) fn set_traveler(&mut self, traveler: Traveler) {
        self.traveler = Some(traveler);
    }

    /// All required categories have a selection.
    #[must_use]
    pub fn selection_complete(&self) -> bool {
        !self.required.is_empty()
            && self
                .required
                .iter()
                .all(|c| self.selections.contains_key(c))
    }

    /// Deterministic key for the finalized itinerary + traveler.
    ///
    /// Available only once every required selection and the traveler identity
    /// are present; the same selections always hash to the same key, which is
    /// what makes a repeated booking attempt detectable.
    #[must_use]
    pub fn idempotency_key(&self) -> Option<String> {
        if !self.selection_complete() {
            return None;
        }
        let traveler = self.traveler.as_ref()?;

        let mut hasher = Sha256::new();
        hasher.update(traveler.email.as_bytes());
        hasher.update(b"|");
        hasher.update(traveler.full_name.as_bytes());
        // BTreeMap iteration is sorted, so the digest is order-independent.
        for (category, offer_id) in &self.selections {
            hasher.update(b"|");
            hasher.update(category.as_str().as_bytes());
            hasher.update(b"=");
            hasher.update(offer_id.as_bytes());
        }

        Some(format!("{:x}", hasher.finalize()))
    }

    /// Selected offer ids in category order.
    #[must_use]
    pub fn selected_offer_ids(&self) -> Vec<String> {
        self.selections.values().cloned().collect()
    }
}

impl Default for BookingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traveler() -> Traveler {
        Traveler {
            full_name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
        }
    }

    fn offer(category: Category, id: &str) -> Offer {
        Offer {
            id: id.to_string(),
            category,
            summary: format!("{category} {id}"),
            price: 100.0,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn no_key_until_selections_complete() {
        let mut ctx = BookingContext::new();
        assert!(ctx.idempotency_key().is_none());

        ctx.mark_required(Category::Flight);
        ctx.mark_required(Category::Lodging);
        ctx.set_traveler(traveler());
        ctx.select(Category::Flight, "FL-1".to_string());
        assert!(ctx.idempotency_key().is_none(), "lodging still unselected");

        ctx.select(Category::Lodging, "HT-1".to_string());
        assert!(ctx.idempotency_key().is_some());
    }

    #[test]
    fn no_key_without_traveler() {
        let mut ctx = BookingContext::new();
        ctx.mark_required(Category::Flight);
        ctx.select(Category::Flight, "FL-1".to_string());
        assert!(ctx.idempotency_key().is_none());
    }

    #[test]
    fn key_is_deterministic_and_selection_sensitive() {
        let mut a = BookingContext::new();
        a.mark_required(Category::Flight);
        a.set_traveler(traveler());
        a.select(Category::Flight, "FL-1".to_string());

        let mut b = a.clone();
        assert_eq!(a.idempotency_key(), b.idempotency_key());

        b.select(Category::Flight, "FL-2".to_string());
        assert_ne!(a.idempotency_key(), b.idempotency_key());
    }

    #[test]
    fn later_search_does_not_clobber_selection() {
        let mut ctx = BookingContext::new();
        ctx.mark_required(Category::Flight);
        ctx.store_offers(Category::Flight, vec![offer(Category::Flight, "FL-1")]);
        ctx.select(Category::Flight, "FL-1".to_string());

        ctx.store_offers(Category::Flight, vec![offer(Category::Flight, "FL-9")]);

        assert_eq!(
            ctx.selections().get(&Category::Flight),
            Some(&"FL-1".to_string())
        );
    }

    #[test]
    fn offer_lookup() {
        let mut ctx = BookingContext::new();
        ctx.store_offers(Category::Flight, vec![offer(Category::Flight, "FL-1")]);

        assert!(ctx.offer(Category::Flight, "FL-1").is_some());
        assert!(ctx.offer(Category::Flight, "FL-2").is_none());
        assert!(ctx.offer(Category::Lodging, "FL-1").is_none());
    }
}
