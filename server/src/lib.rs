//! Event ticketing service.
//!
//! Organizers publish events with a fixed ticket inventory; buyers purchase
//! and cancel tickets. The inventory core guarantees that remaining counts
//! never go negative and always equal the total minus outstanding purchases.

pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
