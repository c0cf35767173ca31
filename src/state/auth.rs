use uuid::Uuid;

use super::{run_thunk, RequestStatus, Slice};
use crate::db::{credentials, users, Pool, StoreError};
use crate::model::{AmazonCredentials, AmazonCredentialsInput, User};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub credentials: Option<AmazonCredentials>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    SignedIn(User),
    SignedOut,
    CredentialsLoaded(Option<AmazonCredentials>),
    CredentialsSaved(AmazonCredentials),
    CredentialsDeleted,
}

impl Slice for AuthState {
    type Action = AuthAction;

    fn reduce(&mut self, action: AuthAction) {
        match action {
            AuthAction::SignedIn(user) => {
                if self.user.as_ref().map(|u| u.id) != Some(user.id) {
                    self.credentials = None;
                }
                self.user = Some(user);
            }
            AuthAction::SignedOut => {
                self.user = None;
                self.credentials = None;
            }
            AuthAction::CredentialsLoaded(creds) => self.credentials = creds,
            AuthAction::CredentialsSaved(creds) => self.credentials = Some(creds),
            AuthAction::CredentialsDeleted => self.credentials = None,
        }
    }

    fn status_mut(&mut self) -> &mut RequestStatus {
        &mut self.status
    }
}

impl AuthState {
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Resolve the account for `email`, registering it on first sign-in.
    pub async fn sign_in(
        &mut self,
        pool: &Pool,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        run_thunk(
            self,
            "sign_in",
            users::get_or_create_user(pool, email, display_name),
            AuthAction::SignedIn,
        )
        .await
    }

    /// Sign in without registering. An unknown email yields `Ok(None)` and
    /// leaves the slice signed out.
    pub async fn sign_in_existing(
        &mut self,
        pool: &Pool,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        run_thunk(
            self,
            "sign_in_existing",
            users::find_user_by_email(pool, email),
            |found| match found {
                Some(user) => AuthAction::SignedIn(user),
                None => AuthAction::SignedOut,
            },
        )
        .await
    }

    pub fn sign_out(&mut self) {
        self.reduce(AuthAction::SignedOut);
        self.status = RequestStatus::default();
    }

    pub async fn fetch_credentials(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Option<AmazonCredentials>, StoreError> {
        run_thunk(
            self,
            "fetch_credentials",
            credentials::get_credentials(pool, user_id),
            AuthAction::CredentialsLoaded,
        )
        .await
    }

    pub async fn save_credentials(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        input: &AmazonCredentialsInput,
    ) -> Result<AmazonCredentials, StoreError> {
        run_thunk(
            self,
            "save_credentials",
            credentials::upsert_credentials(pool, user_id, input),
            AuthAction::CredentialsSaved,
        )
        .await
    }

    pub async fn delete_credentials(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        run_thunk(
            self,
            "delete_credentials",
            credentials::delete_credentials(pool, user_id),
            |_| AuthAction::CredentialsDeleted,
        )
        .await
    }
}
