//! Session handling and offline-tolerant sync for the ventas backend.

pub mod api;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod mutation;

pub use api::ApiClient;
pub use controller::{
    ControllerEvent, ListSource, MutationOutcome, Session, SessionState, SyncController,
};
pub use error::{ClientError, ClientResult};
pub use mutation::{ClientEditForm, ClientForm, TaskEditForm, TaskForm};

#[cfg(test)]
#[path = "tests/mock_backend.rs"]
mod test_support;
