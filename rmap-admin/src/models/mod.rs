//! Data models for rmap-admin

pub mod upload_session;

pub use upload_session::{SessionStatus, StagingState, StateTransition, UploadSession, UploadStep};
