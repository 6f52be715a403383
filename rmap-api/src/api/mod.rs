//! HTTP API handlers for rmap-api

pub mod health;
pub mod last_update;
pub mod listings;
pub mod meta;
pub mod search;

pub use health::health_routes;
pub use last_update::last_update_routes;
pub use listings::listing_routes;
pub use meta::meta_routes;
pub use search::search_routes;
