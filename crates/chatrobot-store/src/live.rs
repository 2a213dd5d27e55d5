//! Observable queries over the local store.
//!
//! Every write made through [`Database`] publishes a [`Change`].  A
//! [`LiveQuery`] keeps the latest result of one query and re-runs it whenever
//! a change that could affect that result arrives.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::database::{lock, Database, SharedDatabase};
use crate::error::{Result, StoreError};
use crate::models::{Conversation, Message, User};

/// What a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    User { user_id: i64 },
    Conversations { user_id: i64 },
    Messages { session_id: i64 },
    Config { user_id: i64 },
}

type Affects = Box<dyn Fn(&Change) -> bool + Send + Sync>;
type Fetch<T> = Box<dyn Fn(&Database) -> Result<T> + Send + Sync>;

pub struct LiveQuery<T> {
    db: SharedDatabase,
    rx: broadcast::Receiver<Change>,
    affects: Affects,
    fetch: Fetch<T>,
}

impl<T> LiveQuery<T> {
    /// Subscribe before the first fetch so no write can slip in between.
    pub fn new<A, F>(db: SharedDatabase, affects: A, fetch: F) -> Result<Self>
    where
        A: Fn(&Change) -> bool + Send + Sync + 'static,
        F: Fn(&Database) -> Result<T> + Send + Sync + 'static,
    {
        let rx = lock(&db)?.subscribe();
        Ok(Self {
            db,
            rx,
            affects: Box::new(affects),
            fetch: Box::new(fetch),
        })
    }

    /// Run the query now.
    pub fn current(&self) -> Result<T> {
        let db = lock(&self.db)?;
        (self.fetch)(&db)
    }

    /// Wait for the next relevant change and return the fresh result.
    pub async fn changed(&mut self) -> Result<T> {
        loop {
            match self.rx.recv().await {
                Ok(change) if (self.affects)(&change) => return self.current(),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live query lagged, refetching");
                    return self.current();
                }
                Err(RecvError::Closed) => return Err(StoreError::FeedClosed),
            }
        }
    }
}

impl LiveQuery<Vec<Message>> {
    /// All messages of one conversation, oldest first.
    pub fn session_messages(db: SharedDatabase, session_id: i64) -> Result<Self> {
        Self::new(
            db,
            move |change| matches!(change, Change::Messages { session_id: s } if *s == session_id),
            move |db| db.messages_for_session(session_id),
        )
    }
}

impl LiveQuery<Vec<Conversation>> {
    pub fn user_conversations(db: SharedDatabase, user_id: i64) -> Result<Self> {
        Self::new(
            db,
            move |change| matches!(change, Change::Conversations { user_id: u } if *u == user_id),
            move |db| db.list_conversations(user_id),
        )
    }
}

impl LiveQuery<User> {
    pub fn user_profile(db: SharedDatabase, user_id: i64) -> Result<Self> {
        Self::new(
            db,
            move |change| matches!(change, Change::User { user_id: u } if *u == user_id),
            move |db| db.get_user(user_id),
        )
    }
}
