//! Registry of user connection contexts
//!
//! Each registered user gets its own `UserSessionManager` behind its own
//! mutex, so at most one operation runs against a given user at a time while
//! different users proceed in parallel. The map lock is never held while a
//! user's operation runs.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::LinkwatchConfig;
use crate::errors::{LinkwatchError, Result};
use crate::manager::{ConnectOutcome, UserConnectionState, UserSessionManager};
use crate::probe::{AttemptProbe, RandomProbe};
use crate::types::{SessionId, TimeSource, UserId};

/// Builds the probe for a newly registered user
pub type ProbeFactory = Arc<dyn Fn(&UserId) -> Box<dyn AttemptProbe> + Send + Sync>;

/// Shared handle to one user's context
pub type SharedContext<T> = Arc<Mutex<UserSessionManager<T>>>;

// ----------------------------------------------------------------------------
// Session Registry
// ----------------------------------------------------------------------------

/// Concurrent map from user identity to connection context
pub struct SessionRegistry<T: TimeSource + Clone> {
    users: DashMap<UserId, SharedContext<T>>,
    config: LinkwatchConfig,
    time_source: T,
    probe_factory: ProbeFactory,
}

impl<T: TimeSource + Clone> SessionRegistry<T> {
    /// Create a registry whose users dial through a `RandomProbe`
    pub fn new(config: LinkwatchConfig, time_source: T) -> Result<Self> {
        let evaluator_config = config.evaluator.clone();
        let factory: ProbeFactory = Arc::new(move |_: &UserId| {
            Box::new(RandomProbe::from_entropy(&evaluator_config)) as Box<dyn AttemptProbe>
        });
        Self::with_probe_factory(config, time_source, factory)
    }

    /// Create a registry with a custom probe factory
    pub fn with_probe_factory(
        config: LinkwatchConfig,
        time_source: T,
        probe_factory: ProbeFactory,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            users: DashMap::new(),
            config,
            time_source,
            probe_factory,
        })
    }

    pub fn config(&self) -> &LinkwatchConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register a user with a probe from the factory
    pub fn register(&self, user_id: UserId, username: impl Into<String>) -> Result<()> {
        let probe = (self.probe_factory)(&user_id);
        self.register_with_probe(user_id, username, probe)
    }

    /// Register a user with an explicit probe
    pub fn register_with_probe(
        &self,
        user_id: UserId,
        username: impl Into<String>,
        probe: Box<dyn AttemptProbe>,
    ) -> Result<()> {
        match self.users.entry(user_id) {
            Entry::Occupied(entry) => Err(LinkwatchError::UserAlreadyExists {
                user_id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                let manager = UserSessionManager::with_config(
                    &self.config,
                    entry.key().clone(),
                    username,
                    probe,
                    self.time_source.clone(),
                );
                info!("Registered user {}", entry.key());
                entry.insert(Arc::new(Mutex::new(manager)));
                Ok(())
            }
        }
    }

    /// Context for `user_id`, registering it first if needed
    pub fn get_or_register(&self, user_id: &UserId, username: &str) -> SharedContext<T> {
        if let Some(context) = self.lookup(user_id) {
            return context;
        }

        let entry = self.users.entry(user_id.clone()).or_insert_with(|| {
            let probe = (self.probe_factory)(user_id);
            debug!("Registering user {} on first use", user_id);
            Arc::new(Mutex::new(UserSessionManager::with_config(
                &self.config,
                user_id.clone(),
                username,
                probe,
                self.time_source.clone(),
            )))
        });
        Arc::clone(entry.value())
    }

    /// Shared handle to a registered user's context
    pub fn context(&self, user_id: &UserId) -> Result<SharedContext<T>> {
        self.lookup(user_id)
            .ok_or_else(|| LinkwatchError::user_not_found(user_id))
    }

    /// Run `f` with exclusive access to the user's context
    pub fn with_user<R>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&mut UserSessionManager<T>) -> R,
    ) -> Result<R> {
        let context = self.context(user_id)?;
        let mut manager = context.lock();
        Ok(f(&mut manager))
    }

    /// Drop a user's context; returns whether it existed
    pub fn remove(&self, user_id: &UserId) -> bool {
        let removed = self.users.remove(user_id).is_some();
        if removed {
            info!("Removed user {}", user_id);
        }
        removed
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Registered user identities, sorted
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    // ------------------------------------------------------------------------
    // Per-user operations
    // ------------------------------------------------------------------------

    pub fn connect(
        &self,
        user_id: &UserId,
        ip_address: &str,
        device_info: &str,
    ) -> Result<ConnectOutcome> {
        self.with_user(user_id, |manager| manager.connect(ip_address, device_info))
    }

    pub fn update_session_activity(&self, user_id: &UserId, session_id: &SessionId) -> Result<bool> {
        self.with_user(user_id, |manager| manager.update_session_activity(session_id))
    }

    pub fn clean_expired_sessions(&self, user_id: &UserId) -> Result<Vec<SessionId>> {
        self.with_user(user_id, |manager| manager.clean_expired_sessions())
    }

    pub fn disconnect_session(&self, user_id: &UserId, session_id: &SessionId) -> Result<bool> {
        self.with_user(user_id, |manager| manager.disconnect_session(session_id))
    }

    pub fn reset_security_status(&self, user_id: &UserId) -> Result<()> {
        self.with_user(user_id, |manager| manager.reset_security_status())
    }

    pub fn connection_state(&self, user_id: &UserId) -> Result<UserConnectionState> {
        self.with_user(user_id, |manager| manager.connection_state())
    }

    pub fn active_session_count(&self, user_id: &UserId) -> Result<usize> {
        self.with_user(user_id, |manager| manager.active_session_count())
    }

    pub fn connection_logs(&self, user_id: &UserId) -> Result<Vec<String>> {
        self.with_user(user_id, |manager| manager.connection_logs())
    }

    pub fn connection_info(&self, user_id: &UserId) -> Result<String> {
        self.with_user(user_id, |manager| manager.connection_info())
    }

    /// Sweep expired sessions of every registered user
    ///
    /// Returns the number of sessions removed.
    pub fn sweep_all(&self) -> usize {
        let contexts: Vec<SharedContext<T>> = self
            .users
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let removed: usize = contexts
            .iter()
            .map(|context| context.lock().clean_expired_sessions().len())
            .sum();

        if removed > 0 {
            info!("Expiry sweep removed {} session(s)", removed);
        }
        removed
    }

    fn lookup(&self, user_id: &UserId) -> Option<SharedContext<T>> {
        self.users.get(user_id).map(|entry| Arc::clone(entry.value()))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
