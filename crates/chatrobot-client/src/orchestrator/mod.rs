//! Conversation orchestration.
//!
//! The [`Orchestrator`] owns the active-session pointer and sequences every
//! user action: persist the user's message, pick a gateway capability, call
//! it, persist the reply (or the failure), mirror to the relay and kick off
//! title regeneration.
//!
//! Store access is always a short synchronous critical section; the database
//! lock is never held across an `.await`.  Mirrors and title regeneration run
//! as tasks in a [`JoinSet`] owned by the orchestrator, so dropping it aborts
//! whatever is still in flight.

mod completion;
mod conversations;
mod image_gen;
mod intent;
mod title;
mod vision;


use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};

use chatrobot_shared::relay::{ConversationPayload, MessagePayload};
use chatrobot_shared::MessageStatus;
use chatrobot_store::{
    lock, Config, Database, LiveQuery, Message, NewMessage, SharedDatabase, User,
};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gateway::AiGateway;
use crate::relay::Relay;

pub use intent::Route;

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct Orchestrator {
    user_id: i64,
    db: SharedDatabase,
    gateway: Arc<dyn AiGateway>,
    relay: Arc<dyn Relay>,
    default_relay_url: String,
    relay_url: RwLock<String>,
    config: RwLock<Config>,
    session_tx: watch::Sender<Option<i64>>,
    loading_tx: watch::Sender<bool>,
    tasks: Mutex<JoinSet<()>>,
}

impl Orchestrator {
    pub fn new(
        user_id: i64,
        db: SharedDatabase,
        gateway: Arc<dyn AiGateway>,
        relay: Arc<dyn Relay>,
        client_config: &ClientConfig,
    ) -> Self {
        let (session_tx, _) = watch::channel(None);
        let (loading_tx, _) = watch::channel(false);
        Self {
            user_id,
            db,
            gateway,
            relay,
            default_relay_url: client_config.relay_url.clone(),
            relay_url: RwLock::new(client_config.relay_url.clone()),
            config: RwLock::new(Config::defaults_for(user_id)),
            session_tx,
            loading_tx,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Load the config and adopt a session.  Call once after construction.
    pub async fn bootstrap(&self) -> Result<i64> {
        self.ensure_config()?;
        self.ensure_session().await
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    // ------------------------------------------------------------------
    // Config and profile
    // ------------------------------------------------------------------

    /// Create the default config row if needed and adopt it.
    pub fn ensure_config(&self) -> Result<Config> {
        let config = self.with_db(|db| db.ensure_config(self.user_id))?;
        self.adopt_config(config.clone());
        Ok(config)
    }

    /// Persist edited settings and adopt them, relay URL included.
    pub fn update_config(&self, mut config: Config) -> Result<Config> {
        config.user_id = self.user_id;
        let stored = self.with_db(|db| {
            db.ensure_config(config.user_id)?;
            db.update_config(&config)?;
            db.ensure_config(config.user_id)
        })?;
        tracing::info!(user_id = self.user_id, "config updated");
        self.adopt_config(stored.clone());
        Ok(stored)
    }

    /// Latest config snapshot.
    pub fn config(&self) -> Config {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Relay base URL currently in effect.
    pub fn relay_url(&self) -> String {
        match self.relay_url.read() {
            Ok(url) => url.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn adopt_config(&self, config: Config) {
        let url = config
            .custom_backend_url()
            .unwrap_or(self.default_relay_url.as_str())
            .trim_end_matches('/')
            .to_string();
        match self.relay_url.write() {
            Ok(mut current) => *current = url,
            Err(poisoned) => *poisoned.into_inner() = url,
        }
        match self.config.write() {
            Ok(mut current) => *current = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }

    pub fn profile(&self) -> Result<User> {
        self.with_db(|db| db.get_user(self.user_id))
    }

    pub fn profile_live(&self) -> Result<LiveQuery<User>> {
        Ok(LiveQuery::user_profile(self.db.clone(), self.user_id)?)
    }

    pub fn update_profile(
        &self,
        name: &str,
        description: &str,
        avatar_uri: Option<&str>,
    ) -> Result<User> {
        self.with_db(|db| {
            let mut user = db.get_user(self.user_id)?;
            user.name = name.to_string();
            user.description = description.to_string();
            user.avatar_uri = avatar_uri.map(str::to_string);
            db.update_user(&user)?;
            Ok(user)
        })
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    pub fn active_session(&self) -> Option<i64> {
        *self.session_tx.borrow()
    }

    pub fn session_updates(&self) -> watch::Receiver<Option<i64>> {
        self.session_tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading_tx.borrow()
    }

    pub fn loading_updates(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }

    /// Live message list of the active session, adopting one first if needed.
    pub async fn active_messages(&self) -> Result<LiveQuery<Vec<Message>>> {
        let session_id = self.ensure_session().await?;
        Ok(LiveQuery::session_messages(self.db.clone(), session_id)?)
    }

    /// Wait for every background mirror and title task to finish.
    pub async fn settle(&self) {
        loop {
            let mut set = match self.tasks.lock() {
                Ok(mut tasks) => std::mem::take(&mut *tasks),
                Err(_) => return,
            };
            if set.is_empty() {
                return;
            }
            while set.join_next().await.is_some() {}
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> chatrobot_store::Result<T>,
    {
        let db = lock(&self.db)?;
        Ok(f(&db)?)
    }

    fn adopt_session(&self, session_id: Option<i64>) {
        self.session_tx.send_replace(session_id);
    }

    fn start_loading(&self) -> LoadingGuard<'_> {
        self.loading_tx.send_replace(true);
        LoadingGuard {
            tx: &self.loading_tx,
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.tasks.lock() {
            Ok(mut tasks) => {
                while tasks.try_join_next().is_some() {}
                tasks.spawn(task);
            }
            Err(_) => tracing::error!("task set poisoned, dropping background task"),
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Insert a message into `session_id` and mirror it.
    fn record(
        &self,
        session_id: i64,
        is_self: bool,
        content: &str,
        image_uri: Option<String>,
        status: MessageStatus,
    ) -> Result<Message> {
        let name = if is_self {
            self.profile()?.name
        } else {
            self.config().robot_name
        };
        let message = self.with_db(|db| {
            db.insert_message(&NewMessage {
                name,
                time: Self::now(),
                content: content.to_string(),
                user_id: self.user_id,
                is_self,
                session_id,
                image_uri,
                status,
            })
        })?;
        tracing::debug!(
            session = session_id,
            id = message.id,
            is_self,
            status = %message.status,
            "message recorded"
        );
        Ok(message)
    }

    fn mirror_message(&self, message: &Message) {
        let relay = self.relay.clone();
        let base_url = self.relay_url();
        let payload = MessagePayload {
            name: message.name.clone(),
            time: message.time,
            content: message.content.clone(),
            user_id: message.user_id,
            is_self: message.is_self,
            session_id: message.session_id,
            image_uri: message.image_uri.clone(),
            status: message.status.as_str().to_string(),
        };
        self.spawn(async move {
            if let Err(e) = relay.post_message(&base_url, &payload).await {
                tracing::debug!(error = %e, session = payload.session_id, "message mirror failed");
            }
        });
    }

    fn mirror_conversation(&self, title: &str) {
        let relay = self.relay.clone();
        let base_url = self.relay_url();
        let payload = ConversationPayload {
            user_id: self.user_id,
            title: title.to_string(),
        };
        self.spawn(async move {
            match relay.post_conversation(&base_url, &payload).await {
                Ok(remote_id) => tracing::debug!(remote_id, "conversation mirrored"),
                Err(e) => tracing::debug!(error = %e, "conversation mirror failed"),
            }
        });
    }
}

/// Clears `isLoading` when the request that raised it ends, however it ends.
struct LoadingGuard<'a> {
    tx: &'a watch::Sender<bool>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}
