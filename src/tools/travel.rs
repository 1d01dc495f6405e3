//! The travel tool set: searches, selection, traveler details, and booking.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::adapter::{Category, Traveler};
use crate::booking::BookingEngine;

use super::error::ToolError;
use super::registry::{ParamKind, ParamSpec, RegistryError, SideEffect, ToolRegistry, ToolSpec};
use super::ToolHandler;

/// Build the full travel tool registry.
pub fn registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    registry.register(ToolSpec {
        name: "search_flights",
        description: "Search for flights between two airports or cities.",
        params: params(&[
            ("origin", ParamSpec::required(ParamKind::String, "Departure airport or city")),
            ("destination", ParamSpec::required(ParamKind::String, "Arrival airport or city")),
            ("departure_date", ParamSpec::required(ParamKind::String, "Departure date, YYYY-MM-DD")),
            ("return_date", ParamSpec::optional(ParamKind::String, "Return date for a round trip, YYYY-MM-DD")),
            ("passengers", ParamSpec::optional(ParamKind::Integer, "Number of travelers, default 1")),
        ]),
        effect: SideEffect::ReadOnly,
        handler: Arc::new(SearchHandler(Category::Flight)),
    })?;

    registry.register(ToolSpec {
        name: "search_hotels",
        description: "Search for hotels in a city for a date range.",
        params: params(&[
            ("city", ParamSpec::required(ParamKind::String, "Destination city")),
            ("check_in", ParamSpec::required(ParamKind::String, "Check-in date, YYYY-MM-DD")),
            ("check_out", ParamSpec::required(ParamKind::String, "Check-out date, YYYY-MM-DD")),
            ("guests", ParamSpec::optional(ParamKind::Integer, "Number of guests, default 1")),
        ]),
        effect: SideEffect::ReadOnly,
        handler: Arc::new(SearchHandler(Category::Lodging)),
    })?;

    registry.register(ToolSpec {
        name: "search_cars",
        description: "Search for rental cars in a city for a date range.",
        params: params(&[
            ("city", ParamSpec::required(ParamKind::String, "Pickup city")),
            ("pickup_date", ParamSpec::required(ParamKind::String, "Pickup date, YYYY-MM-DD")),
            ("dropoff_date", ParamSpec::required(ParamKind::String, "Dropoff date, YYYY-MM-DD")),
        ]),
        effect: SideEffect::ReadOnly,
        handler: Arc::new(SearchHandler(Category::GroundTransport)),
    })?;

    registry.register(ToolSpec {
        name: "select_offer",
        description: "Select one offer from earlier search results, by category and offer id.",
        params: params(&[
            ("category", ParamSpec::required(ParamKind::String, "One of: flight, lodging, ground_transport")),
            ("offer_id", ParamSpec::required(ParamKind::String, "Id of the offer to select")),
        ]),
        effect: SideEffect::ReadOnly,
        handler: Arc::new(SelectOfferHandler),
    })?;

    registry.register(ToolSpec {
        name: "set_traveler",
        description: "Record the traveler's name and email for the booking.",
        params: params(&[
            ("full_name", ParamSpec::required(ParamKind::String, "Traveler's full name")),
            ("email", ParamSpec::required(ParamKind::String, "Traveler's email address")),
        ]),
        effect: SideEffect::ReadOnly,
        handler: Arc::new(SetTravelerHandler),
    })?;

    registry.register(ToolSpec {
        name: "confirm_booking",
        description: "Record the user's explicit confirmation of the presented itinerary. \
                      Call only after the user has clearly agreed to book.",
        params: BTreeMap::new(),
        effect: SideEffect::ReadOnly,
        handler: Arc::new(ConfirmHandler),
    })?;

    registry.register(ToolSpec {
        name: "create_booking",
        description: "Create the confirmed booking with the travel provider. \
                      Requires prior confirmation via confirm_booking.",
        params: BTreeMap::new(),
        effect: SideEffect::Mutating,
        handler: Arc::new(CreateBookingHandler),
    })?;

    Ok(registry)
}

fn params(entries: &[(&'static str, ParamSpec)]) -> BTreeMap<&'static str, ParamSpec> {
    entries.iter().cloned().collect()
}

// ============================================================================
// Handlers
// ============================================================================

/// Search tool for one offer category; the raw arguments double as the
/// provider search criteria.
struct SearchHandler(Category);

#[async_trait]
impl ToolHandler for SearchHandler {
    async fn call(
        &self,
        engine: &BookingEngine,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let offers = engine.search(self.0, &args).await?;
        Ok(serde_json::json!({
            "category": self.0.as_str(),
            "offers": offers,
            "workflow_state": engine.state().await.as_str(),
        }))
    }
}

struct SelectOfferHandler;

#[async_trait]
impl ToolHandler for SelectOfferHandler {
    async fn call(
        &self,
        engine: &BookingEngine,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let category = parse_category(&args)?;
        let offer_id = required_str(&args, "offer_id")?;

        let offer = engine.select_offer(category, offer_id).await?;
        Ok(serde_json::json!({
            "selected": offer,
            "itinerary": engine.summary().await,
        }))
    }
}

struct SetTravelerHandler;

#[async_trait]
impl ToolHandler for SetTravelerHandler {
    async fn call(
        &self,
        engine: &BookingEngine,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let traveler = Traveler {
            full_name: required_str(&args, "full_name")?.to_string(),
            email: required_str(&args, "email")?.to_string(),
        };
        if !traveler.email.contains('@') {
            return Err(ToolError::Validation(
                "email does not look like an email address".to_string(),
            ));
        }

        let state = engine.set_traveler(traveler).await?;
        Ok(serde_json::json!({
            "traveler_set": true,
            "workflow_state": state.as_str(),
        }))
    }
}

struct ConfirmHandler;

#[async_trait]
impl ToolHandler for ConfirmHandler {
    async fn call(
        &self,
        engine: &BookingEngine,
        _args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        engine.confirm().await?;
        Ok(serde_json::json!({
            "confirmed": true,
            "itinerary": engine.summary().await,
        }))
    }
}

struct CreateBookingHandler;

#[async_trait]
impl ToolHandler for CreateBookingHandler {
    async fn call(
        &self,
        engine: &BookingEngine,
        _args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let confirmation = engine.create_booking().await?;
        Ok(serde_json::json!({
            "reference": confirmation.reference,
            "offer_ids": confirmation.offer_ids,
            "workflow_state": engine.state().await.as_str(),
        }))
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

fn required_str<'a>(args: &'a serde_json::Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::Validation(format!("missing required parameter '{name}'")))
}

fn parse_category(args: &serde_json::Value) -> Result<Category, ToolError> {
    let raw = required_str(args, "category")?;
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|_| {
        ToolError::Validation(format!(
            "unknown category '{raw}', expected flight, lodging, or ground_transport"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockTravelApi;
    use crate::booking::EngineConfig;

    fn test_engine() -> BookingEngine {
        BookingEngine::new(Arc::new(MockTravelApi::new()), EngineConfig::default())
    }

    #[test]
    fn registry_has_all_travel_tools() {
        let registry = registry().unwrap();
        for name in [
            "search_flights",
            "search_hotels",
            "search_cars",
            "select_offer",
            "set_traveler",
            "confirm_booking",
            "create_booking",
        ] {
            assert!(registry.lookup(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn only_create_booking_is_mutating() {
        let registry = registry().unwrap();
        for def in registry.definitions() {
            let spec = registry.lookup(&def.function.name).unwrap();
            let expected = if spec.name == "create_booking" {
                SideEffect::Mutating
            } else {
                SideEffect::ReadOnly
            };
            assert_eq!(spec.effect, expected, "{}", spec.name);
        }
    }

    #[tokio::test]
    async fn search_handler_returns_offers_and_state() {
        let engine = test_engine();
        let handler = SearchHandler(Category::Flight);

        let payload = handler
            .call(
                &engine,
                serde_json::json!({"origin": "JFK", "destination": "LAX"}),
            )
            .await
            .unwrap();

        assert_eq!(payload["category"], "flight");
        assert!(!payload["offers"].as_array().unwrap().is_empty());
        assert_eq!(payload["workflow_state"], "presenting_options");
    }

    #[tokio::test]
    async fn select_handler_reports_the_itinerary_so_far() {
        let engine = test_engine();
        SearchHandler(Category::Flight)
            .call(
                &engine,
                serde_json::json!({"origin": "JFK", "destination": "LAX"}),
            )
            .await
            .unwrap();

        let payload = SelectOfferHandler
            .call(
                &engine,
                serde_json::json!({"category": "flight", "offer_id": "FL-jfk-1"}),
            )
            .await
            .unwrap();

        assert_eq!(payload["selected"]["id"], "FL-jfk-1");
        assert_eq!(payload["itinerary"]["workflow_state"], "awaiting_selection");
        assert_eq!(payload["itinerary"]["selections"]["flight"], "FL-jfk-1");
        assert_eq!(payload["itinerary"]["traveler_set"], false);
    }

    #[tokio::test]
    async fn select_handler_rejects_unknown_category() {
        let engine = test_engine();
        let result = SelectOfferHandler
            .call(
                &engine,
                serde_json::json!({"category": "submarine", "offer_id": "SUB-1"}),
            )
            .await;

        assert!(matches!(result, Err(ToolError::Validation(_))));
    }

    #[tokio::test]
    async fn set_traveler_rejects_bad_email() {
        let engine = test_engine();
        let result = SetTravelerHandler
            .call(
                &engine,
                serde_json::json!({"full_name": "Ada Lovelace", "email": "not-an-email"}),
            )
            .await;

        assert!(matches!(result, Err(ToolError::Validation(_))));
    }

    #[tokio::test]
    async fn confirm_before_ready_maps_to_invalid_state() {
        let engine = test_engine();
        let result = ConfirmHandler.call(&engine, serde_json::json!({})).await;

        match result {
            Err(e) => assert_eq!(e.kind(), "invalid_state"),
            Ok(payload) => panic!("expected error, got {payload}"),
        }
    }
}
