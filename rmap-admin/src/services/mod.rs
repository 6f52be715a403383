//! External collaborators: geocoding, email, image storage

pub mod geocoder;
pub mod mailer;
pub mod object_store;

pub use geocoder::{GeocodeError, Geocoder};
pub use mailer::{EmailMessage, Mailer, MailerError};
pub use object_store::{LocalObjectStore, ObjectStoreError, MAX_IMAGE_BYTES};
