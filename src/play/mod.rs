//! Google Play edit workflow: credentials, token exchange, the edits API
//! and the publisher that sequences it.

mod api;
mod auth;
mod client;
mod credentials;
mod publisher;

pub use api::{CloseOutcome, CommitResult, EditSession, EditsApi, UploadResult};
pub use auth::ANDROID_PUBLISHER_SCOPE;
pub use client::PlayClient;
pub use credentials::{Credential, DEFAULT_TOKEN_URI, load_credentials};
pub use publisher::Publisher;
