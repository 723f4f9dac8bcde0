//! Change subscriptions over a collection, backed by the database watcher.

use crate::error::Result;
use crate::models::Document;
use crate::store::Store;
use native_db::watch::Event;
use std::marker::PhantomData;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// A committed change to one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<D> {
    Inserted(D),
    Updated { old: D, new: D },
    Deleted(D),
}

/// Outcome of waiting on a subscription.
#[derive(Debug)]
pub enum Next<D> {
    Change(Result<Change<D>>),
    /// Nothing arrived before the timeout.
    Idle,
    /// The database dropped the watcher.
    Closed,
}

/// Live feed of changes to one collection.
///
/// Changes are delivered after commit, in commit order. Call
/// [`Store::unsubscribe`] with [`Subscription::id`] to stop the feed.
pub struct Subscription<D: Document> {
    receiver: Receiver<Event>,
    watcher_id: u64,
    _marker: PhantomData<D>,
}

impl<D: Document> Subscription<D> {
    pub fn id(&self) -> u64 {
        self.watcher_id
    }

    /// Block until the next change or until `timeout` elapses.
    pub fn next_timeout(&self, timeout: Duration) -> Next<D> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Next::Change(decode_event(event)),
            Err(RecvTimeoutError::Timeout) => Next::Idle,
            Err(RecvTimeoutError::Disconnected) => Next::Closed,
        }
    }

    /// Take a pending change without blocking.
    pub fn try_next(&self) -> Option<Result<Change<D>>> {
        self.receiver.try_recv().ok().map(decode_event)
    }
}

fn decode_event<D: Document>(event: Event) -> Result<Change<D>> {
    let change = match event {
        Event::Insert(insert) => Change::Inserted(D::from_stored(&insert.inner::<D::Stored>()?)?),
        Event::Update(update) => Change::Updated {
            old: D::from_stored(&update.inner_old::<D::Stored>()?)?,
            new: D::from_stored(&update.inner_new::<D::Stored>()?)?,
        },
        Event::Delete(delete) => Change::Deleted(D::from_stored(&delete.inner::<D::Stored>()?)?),
    };
    Ok(change)
}

impl Store {
    /// Watch every document of a collection.
    pub fn subscribe<D: Document>(&self) -> Result<Subscription<D>> {
        let (receiver, watcher_id) = self.db.watch().scan().primary().all::<D::Stored>()?;
        Ok(Subscription {
            receiver,
            watcher_id,
            _marker: PhantomData,
        })
    }

    /// Stop a subscription created by [`Store::subscribe`].
    pub fn unsubscribe(&self, watcher_id: u64) -> Result<()> {
        self.db.unwatch(watcher_id)?;
        Ok(())
    }
}
