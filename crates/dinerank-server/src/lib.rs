//! DineRank HTTP server: configuration, observability and the restaurant
//! ranking API on top of the engine and cache tier.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod observability;
pub mod seed;
pub mod server;
pub mod service;

pub use config::AppConfig;
pub use error::ApiError;
pub use server::{AppState, DineRankServer, ServerBuilder, build_app, router};
pub use service::RestaurantService;
