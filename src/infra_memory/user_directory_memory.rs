use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

/// Users and credentials seeded in-process.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<UserId, CredentialRecord>,
    authorities: DashMap<UserId, BTreeSet<String>>,
    usernames: DashMap<String, UserId>,
    last_id: AtomicI64,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&self, record: CredentialRecord, authorities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let user_id = record.user_id;
        self.last_id.fetch_max(user_id.0, Ordering::SeqCst);
        self.usernames.insert(record.username.clone(), user_id);
        self.users.insert(user_id, record);
        self.authorities
            .insert(user_id, authorities.into_iter().map(Into::into).collect());
    }

    pub fn set_status(&self, user_id: UserId, status: AccountStatus) {
        if let Some(mut record) = self.users.get_mut(&user_id) {
            record.account_status = status;
        }
    }

    pub fn set_authorities<I, S>(&self, user_id: UserId, authorities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities
            .insert(user_id, authorities.into_iter().map(Into::into).collect());
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn load_by_id(&self, user_id: UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
        let Some(record) = self.users.get(&user_id).map(|r| r.clone()) else {
            return Ok(None);
        };
        let authorities = self
            .authorities
            .get(&user_id)
            .map(|a| a.clone())
            .unwrap_or_default();
        Ok(Some(DirectoryUser {
            user_id,
            username: record.username,
            authorities,
            account_status: record.account_status,
        }))
    }
}

#[async_trait::async_trait]
impl CredentialRepo for MemoryUserDirectory {
    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, DirectoryError> {
        let Some(user_id) = self.usernames.get(username).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|r| r.clone()))
    }

    async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserId, DirectoryError> {
        let user_id = match self.usernames.entry(username.to_string()) {
            Entry::Occupied(_) => {
                return Err(DirectoryError::UsernameTaken)
            }
            Entry::Vacant(slot) => {
                let user_id = UserId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
                slot.insert(user_id);
                user_id
            }
        };
        self.users.insert(
            user_id,
            CredentialRecord {
                user_id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                account_status: AccountStatus::Active,
            },
        );
        self.authorities
            .insert(user_id, BTreeSet::from([ROLE_USER.to_string()]));
        Ok(user_id)
    }
}
