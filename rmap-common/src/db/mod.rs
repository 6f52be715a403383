//! Database initialization and listing storage

pub mod geocoding;
pub mod init;
pub mod listings;
pub mod meta;
pub mod table_schemas;

pub use geocoding::*;
pub use init::*;
pub use listings::*;
pub use meta::*;
pub use table_schemas::*;
