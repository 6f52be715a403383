//! HTTP API handlers for rmap-admin

pub mod health;
pub mod listings;
pub mod session;
pub mod upload;

pub use health::health_routes;
pub use listings::listing_routes;
pub use upload::upload_routes;
