//! Provider preference store: which AI backend the user selected.
//!
//! Persisted in `user_preferences` under a fixed key so the choice
//! survives restarts. The core never reads this implicitly; callers
//! pass the resolved `ProviderId` into the router.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::ProviderId;

/// Storage key of the selected provider.
pub const PROVIDER_PREFERENCE_KEY: &str = "iaProvider";

pub struct ProviderPreferences {
    conn: Mutex<Connection>,
}

impl ProviderPreferences {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Selected provider, `Hosted` when unset or unreadable.
    pub fn get(&self) -> Result<ProviderId, DatabaseError> {
        let conn = self.lock()?;
        let stored = db::get_user_preference(&conn, PROVIDER_PREFERENCE_KEY)?;
        Ok(match stored {
            None => ProviderId::default(),
            Some(raw) => ProviderId::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable provider preference");
                ProviderId::default()
            }),
        })
    }

    pub fn set(&self, provider: ProviderId) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        db::set_user_preference(&conn, PROVIDER_PREFERENCE_KEY, provider.as_str())?;
        tracing::info!(provider = %provider, "AI provider preference updated");
        Ok(())
    }
}
