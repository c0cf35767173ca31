use uuid::Uuid;

use super::{replace_by_id, run_thunk, RequestStatus, Slice};
use crate::db::{addresses, settings, Pool, StoreError};
use crate::model::{Address, AddressInput, AddressUpdate, GlobalSettings, GlobalSettingsInput};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsState {
    /// `None` until the user saves settings for the first time.
    pub settings: Option<GlobalSettings>,
    pub addresses: Vec<Address>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    SettingsLoaded(Option<GlobalSettings>),
    SettingsSaved(GlobalSettings),
    AddressesLoaded(Vec<Address>),
    AddressCreated(Address),
    AddressUpdated(Address),
    AddressDeleted(Uuid),
}

impl Slice for SettingsState {
    type Action = SettingsAction;

    fn reduce(&mut self, action: SettingsAction) {
        match action {
            SettingsAction::SettingsLoaded(settings) => self.settings = settings,
            SettingsAction::SettingsSaved(settings) => self.settings = Some(settings),
            SettingsAction::AddressesLoaded(addresses) => self.addresses = addresses,
            SettingsAction::AddressCreated(address) => {
                if address.is_default {
                    self.clear_default();
                }
                self.addresses.push(address);
            }
            SettingsAction::AddressUpdated(address) => {
                if address.is_default {
                    self.clear_default();
                }
                replace_by_id(&mut self.addresses, address, |a| a.id);
            }
            SettingsAction::AddressDeleted(id) => self.addresses.retain(|a| a.id != id),
        }
    }

    fn status_mut(&mut self) -> &mut RequestStatus {
        &mut self.status
    }
}

impl SettingsState {
    fn clear_default(&mut self) {
        for address in &mut self.addresses {
            address.is_default = false;
        }
    }

    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default)
    }

    pub async fn fetch_settings(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Option<GlobalSettings>, StoreError> {
        run_thunk(
            self,
            "fetch_settings",
            settings::get_settings(pool, user_id),
            SettingsAction::SettingsLoaded,
        )
        .await
    }

    pub async fn save_settings(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        input: &GlobalSettingsInput,
    ) -> Result<GlobalSettings, StoreError> {
        run_thunk(
            self,
            "save_settings",
            settings::upsert_settings(pool, user_id, input),
            SettingsAction::SettingsSaved,
        )
        .await
    }

    pub async fn fetch_addresses(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Vec<Address>, StoreError> {
        run_thunk(
            self,
            "fetch_addresses",
            addresses::list_addresses(pool, user_id),
            SettingsAction::AddressesLoaded,
        )
        .await
    }

    pub async fn create_address(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        input: &AddressInput,
    ) -> Result<Address, StoreError> {
        run_thunk(
            self,
            "create_address",
            addresses::insert_address(pool, user_id, input),
            SettingsAction::AddressCreated,
        )
        .await
    }

    pub async fn update_address(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
        update: &AddressUpdate,
    ) -> Result<Address, StoreError> {
        run_thunk(
            self,
            "update_address",
            addresses::update_address(pool, user_id, id, update),
            SettingsAction::AddressUpdated,
        )
        .await
    }

    pub async fn delete_address(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<(), StoreError> {
        run_thunk(
            self,
            "delete_address",
            addresses::delete_address(pool, user_id, id),
            move |()| SettingsAction::AddressDeleted(id),
        )
        .await
    }
}
