//! # rmap Common Library
//!
//! Shared code for the rmap services:
//! - Listing model and versioned listing schema
//! - Region bounds and gazetteer
//! - Listing filter and facet aggregation
//! - Configuration loading
//! - Database initialization and listing tables

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod geo;
pub mod listing;
pub mod schema;

pub use error::{Error, Result};
pub use filter::{filter_listings, AgeGroup, ListingFilter};
pub use geo::{Gazetteer, RegionBounds, RegionDecision};
pub use listing::Listing;
