//! In-memory account directory for the Echo variant.
//!
//! Accounts live for the lifetime of the process. There is no hashing: the
//! directory only simulates a login so each user gets their own stored profile.

use crate::profile::StyleProfile;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Account {
    password: String,
    pub profile: StyleProfile,
}

/// Username -> account.
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    accounts: HashMap<String, Account>,
}

impl Default for AccountDirectory {
    /// The directory seeded with the demo account `user1` / `password`.
    fn default() -> Self {
        let mut directory = Self::empty();
        directory.insert(
            "user1",
            "password",
            StyleProfile::new(
                "User exhibits a slightly sarcastic, brief tone, with an affinity for the 😅 emoji.",
            ),
        );
        directory
    }
}

impl AccountDirectory {
    pub fn empty() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        profile: StyleProfile,
    ) {
        self.accounts.insert(
            username.into(),
            Account {
                password: password.into(),
                profile,
            },
        );
    }

    /// Check credentials and return the stored profile on success.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&StyleProfile> {
        self.accounts
            .get(username)
            .filter(|account| account.password == password)
            .map(|account| &account.profile)
    }

    /// Write a profile back to an existing account. Unknown users are ignored.
    pub fn store_profile(&mut self, username: &str, profile: &StyleProfile) {
        if let Some(account) = self.accounts.get_mut(username) {
            debug!(username, "stored style profile");
            account.profile = profile.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_account() {
        let directory = AccountDirectory::default();
        let profile = directory.authenticate("user1", "password").unwrap();
        assert!(profile.as_str().contains("😅"));
        assert!(directory.authenticate("user1", "hunter2").is_none());
        assert!(directory.authenticate("nobody", "password").is_none());
    }

    #[test]
    fn test_store_profile_round_trip() {
        let mut directory = AccountDirectory::default();
        directory.store_profile("user1", &StyleProfile::new("Formal and long-winded."));
        assert_eq!(
            directory.authenticate("user1", "password").unwrap().as_str(),
            "Formal and long-winded."
        );

        // Unknown users are not created on the fly.
        directory.store_profile("ghost", &StyleProfile::new("x"));
        assert!(directory.authenticate("ghost", "password").is_none());
    }
}
