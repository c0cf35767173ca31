//! Application state slices.
//!
//! Each slice owns its collections plus a [`RequestStatus`], and exposes async
//! operations that run one store call and reduce the result: pending sets
//! `loading` and clears the last error, fulfilled applies the slice action,
//! rejected records the error message.

use std::future::Future;
use tracing::warn;

use crate::db::StoreError;

pub mod app;
pub mod auth;
pub mod products;
pub mod settings;
pub mod shipments;

pub use app::AppState;
pub use auth::{AuthAction, AuthState};
pub use products::{ProductsAction, ProductsState};
pub use settings::{SettingsAction, SettingsState};
pub use shipments::{ShipmentsAction, ShipmentsState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl RequestStatus {
    pub fn pending(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn fulfilled(&mut self) {
        self.loading = false;
    }

    pub fn rejected(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }
}

pub trait Slice {
    type Action;

    fn reduce(&mut self, action: Self::Action);

    fn status_mut(&mut self) -> &mut RequestStatus;
}

/// Drive one store operation through the pending/fulfilled/rejected cycle.
pub(crate) async fn run_thunk<S, T, Fut>(
    slice: &mut S,
    operation: &'static str,
    call: Fut,
    fulfilled: impl FnOnce(T) -> S::Action,
) -> Result<T, StoreError>
where
    S: Slice,
    T: Clone,
    Fut: Future<Output = Result<T, StoreError>>,
{
    slice.status_mut().pending();
    match call.await {
        Ok(value) => {
            slice.reduce(fulfilled(value.clone()));
            slice.status_mut().fulfilled();
            Ok(value)
        }
        Err(err) => {
            warn!(operation, %err, "store operation rejected");
            slice.status_mut().rejected(err.to_string());
            Err(err)
        }
    }
}

/// Replace the element with the same id, if present.
pub(crate) fn replace_by_id<T>(items: &mut [T], updated: T, id_of: impl Fn(&T) -> uuid::Uuid) {
    let id = id_of(&updated);
    if let Some(slot) = items.iter_mut().find(|item| id_of(item) == id) {
        *slot = updated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions() {
        let mut status = RequestStatus::default();
        status.rejected("boom");
        status.pending();
        assert!(status.loading);
        assert!(status.error.is_none());
        status.rejected("boom");
        assert!(!status.loading);
        assert_eq!(status.error.as_deref(), Some("boom"));
        status.pending();
        status.fulfilled();
        assert_eq!(status, RequestStatus::default());
    }
}
