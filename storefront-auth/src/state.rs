//! Shared application state

use std::sync::Arc;

use storefront_auth_core::{generate_token, hash_password};

use crate::config::AuthSettings;
use crate::email::EmailSender;
use crate::store::AuthStore;

/// State shared by every request handler
pub struct AppState<S, E> {
    /// The only writer of accounts, sessions and tokens is the handler layer
    pub store: Arc<S>,
    pub email_sender: Arc<E>,
    pub settings: AuthSettings,
    /// Verified against when a login names no account
    pub(crate) login_decoy: String,
}

impl<S, E> AppState<S, E>
where
    S: AuthStore,
    E: EmailSender,
{
    pub fn new(store: Arc<S>, email_sender: E, settings: AuthSettings) -> Self {
        let login_decoy = match hash_password(&generate_token(), settings.bcrypt_cost) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(error = %e, "Could not compute login decoy hash");
                String::new()
            }
        };

        Self {
            store,
            email_sender: Arc::new(email_sender),
            settings,
            login_decoy,
        }
    }
}
