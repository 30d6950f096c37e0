use tracing::debug;

use super::{CredentialError, CredentialSource, SecretBackend};

/// macOS login keychain, one generic-password item per account.
///
/// Talks to the Security framework directly, so secrets never travel
/// through a child process's argument list.
#[derive(Debug, Clone)]
pub struct KeychainBackend {
    service: String,
}

impl KeychainBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, account).map_err(keychain_error)
    }
}

fn keychain_error(err: keyring::Error) -> CredentialError {
    CredentialError::SecureStore(err.to_string())
}

impl SecretBackend for KeychainBackend {
    fn source(&self) -> CredentialSource {
        CredentialSource::SecureStore
    }

    fn location(&self) -> String {
        format!("Keychain (service {})", self.service)
    }

    fn read(&self, account: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(account)?.get_password() {
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(keychain_error(err)),
        }
    }

    fn write(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        // Replace rather than update so repeated writes converge on one item.
        self.remove(account)?;
        self.entry(account)?
            .set_password(value)
            .map_err(keychain_error)?;
        debug!("stored keychain item service={} account={}", self.service, account);
        Ok(())
    }

    fn remove(&self, account: &str) -> Result<bool, CredentialError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(keychain_error(err)),
        }
    }
}
