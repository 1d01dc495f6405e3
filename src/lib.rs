//! Voyagent - a conversational travel booking agent.
//!
//! A chat server that lets a language model search, select, and book travel
//! through a typed tool surface. The booking workflow is a strict state
//! machine: nothing irreversible happens without explicit user confirmation,
//! and a confirmed booking can never be duplicated thanks to an idempotency
//! key derived from the itinerary itself.

pub mod adapter;
pub mod api;
pub mod booking;
pub mod config;
pub mod handlers;
pub mod llm;
pub mod server;
pub mod session;
pub mod tools;
