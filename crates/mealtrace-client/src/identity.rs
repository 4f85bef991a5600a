//! Device and account identity.
//!
//! A random device id of the shape `user_<millis>_<random>` is generated
//! on first run and persisted forever; logging out clears the account and
//! token but never the device id, so an anonymous session continues from
//! the same local history and can be re-linked later.

use chrono::Utc;
use mealtrace_shared::constants::DEVICE_ID_PREFIX;
use mealtrace_shared::Identity;
use mealtrace_store::{RecordStore, StoreError};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, warn};

use crate::error::Result;

/// Generate a fresh anonymous device id.
fn generate_device_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!(
        "{DEVICE_ID_PREFIX}_{}_{suffix}",
        Utc::now().timestamp_millis()
    )
}

/// Resolves and owns the current identity.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    identity: Identity,
    /// True when the identity could not be persisted and lives only in
    /// memory. Such a session is local-only forever: sync must never be
    /// attempted for it.
    ephemeral: bool,
}

impl IdentityResolver {
    /// Load the persisted identity, creating and persisting a device id
    /// on first run. Idempotent: repeated calls against the same store
    /// return the same device id.
    ///
    /// If the identity cannot be persisted the resolver degrades to an
    /// ephemeral in-memory id rather than failing the session.
    pub fn load(store: &mut RecordStore) -> Result<Self> {
        match store.identity() {
            Ok(Some(identity)) => Ok(Self {
                identity,
                ephemeral: false,
            }),
            Ok(None) => {
                let identity = Identity::anonymous(generate_device_id());
                match store.set_identity(&identity) {
                    Ok(()) => {
                        info!(device_id = %identity.device_id, "created device identity");
                        Ok(Self {
                            identity,
                            ephemeral: false,
                        })
                    }
                    Err(StoreError::Unavailable(msg)) => {
                        warn!(%msg, "identity persistence unavailable, using ephemeral id");
                        Ok(Self::ephemeral())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(StoreError::Unavailable(msg)) => {
                warn!(%msg, "identity persistence unavailable, using ephemeral id");
                Ok(Self::ephemeral())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// An in-memory identity for sessions without usable storage.
    pub fn ephemeral() -> Self {
        Self {
            identity: Identity::anonymous(generate_device_id()),
            ephemeral: true,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Record a successful login. Persists the account id and token; the
    /// device id is left untouched.
    pub fn set_logged_in(
        &mut self,
        store: &mut RecordStore,
        account_id: &str,
        token: &str,
    ) -> Result<()> {
        self.identity.account_id = Some(account_id.to_string());
        self.identity.auth_token = Some(token.to_string());
        if !self.ephemeral {
            store.set_identity(&self.identity)?;
        }
        info!(account_id, "logged in");
        Ok(())
    }

    /// Clear the account and token, keeping the device id so the local
    /// history remains attributable and re-linkable.
    pub fn set_logged_out(&mut self, store: &mut RecordStore) -> Result<()> {
        self.identity.account_id = None;
        self.identity.auth_token = None;
        if !self.ephemeral {
            store.set_identity(&self.identity)?;
        }
        info!("logged out, device id retained");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealtrace_store::MemoryKv;

    fn memory_store() -> RecordStore {
        RecordStore::new(Box::new(MemoryKv::new(None))).unwrap()
    }

    #[test]
    fn device_id_shape() {
        let id = generate_device_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts[0], "user");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn load_is_idempotent_across_resolvers() {
        let mut store = memory_store();
        let first = IdentityResolver::load(&mut store).unwrap();
        let second = IdentityResolver::load(&mut store).unwrap();
        assert_eq!(
            first.identity().device_id,
            second.identity().device_id
        );
        assert!(!first.is_ephemeral());
    }

    #[test]
    fn logout_retains_device_id() {
        let mut store = memory_store();
        let mut resolver = IdentityResolver::load(&mut store).unwrap();
        let device_id = resolver.identity().device_id.clone();

        resolver
            .set_logged_in(&mut store, "acct-9", "tok-abc")
            .unwrap();
        assert!(resolver.identity().is_authenticated());

        resolver.set_logged_out(&mut store).unwrap();
        assert!(!resolver.identity().is_authenticated());
        assert_eq!(resolver.identity().device_id, device_id);

        // The persisted copy agrees.
        let persisted = store.identity().unwrap().unwrap();
        assert_eq!(persisted.device_id, device_id);
        assert!(persisted.account_id.is_none());
    }
}
