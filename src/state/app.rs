use tracing::info;
use uuid::Uuid;

use super::{AuthState, ProductsState, SettingsState, ShipmentsState};
use crate::db::{Pool, StoreError};

/// Top-level aggregate of the independent slices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub auth: AuthState,
    pub products: ProductsState,
    pub shipments: ShipmentsState,
    pub settings: SettingsState,
}

impl AppState {
    pub fn user_id(&self) -> Option<Uuid> {
        self.auth.user_id()
    }

    /// Fill every slice for `user_id`. Stops at the first failing slice; that
    /// slice carries the error message.
    pub async fn load_workspace(&mut self, pool: &Pool, user_id: Uuid) -> Result<(), StoreError> {
        self.auth.fetch_credentials(pool, user_id).await?;
        self.products.fetch_products(pool, user_id).await?;
        self.products.fetch_bundles(pool, user_id).await?;
        self.shipments.fetch_shipments(pool, user_id).await?;
        self.shipments.fetch_plans(pool, user_id).await?;
        self.settings.fetch_settings(pool, user_id).await?;
        self.settings.fetch_addresses(pool, user_id).await?;
        info!(
            %user_id,
            products = self.products.products.len(),
            shipments = self.shipments.shipments.len(),
            "workspace loaded"
        );
        Ok(())
    }

    /// Signing out drops every slice back to its initial state.
    pub fn sign_out(&mut self) {
        *self = Self::default();
    }
}
