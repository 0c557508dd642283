use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiError;
use crate::models::Notification;
use crate::services::NotificationService;

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFeedView {
    pub items: Vec<Notification>,
    pub unread_count: usize,
}

/// Feeds kept at most; the oldest stored feed goes first past this.
pub const MAX_CACHED_FEEDS: usize = 4096;

struct CachedFeed {
    items: Vec<Notification>,
    expires_at: Option<DateTime<Utc>>,
    stored_at: DateTime<Utc>,
}

/// Last notification list seen per session, so a read mark can be shown
/// before the backend confirms it. Feeds of expired sessions are dropped on
/// the next store.
#[derive(Clone)]
pub struct NotificationFeeds {
    feeds: Arc<Mutex<HashMap<String, CachedFeed>>>,
    capacity: usize,
}

impl Default for NotificationFeeds {
    fn default() -> Self {
        Self::with_capacity(MAX_CACHED_FEEDS)
    }
}

impl NotificationFeeds {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            feeds: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedFeed>> {
        self.feeds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn replace(&self, session: &str, expires_at: Option<DateTime<Utc>>, items: Vec<Notification>) {
        self.replace_at(session, expires_at, items, Utc::now());
    }

    fn replace_at(
        &self,
        session: &str,
        expires_at: Option<DateTime<Utc>>,
        items: Vec<Notification>,
        now: DateTime<Utc>,
    ) {
        let mut feeds = self.lock();
        let before = feeds.len();
        feeds.retain(|_, feed| feed.expires_at.is_none_or(|at| at > now));
        if feeds.len() < before {
            tracing::debug!(evicted = before - feeds.len(), "dropped feeds of expired sessions");
        }

        if !feeds.contains_key(session) {
            while feeds.len() >= self.capacity {
                let Some(oldest) = feeds
                    .iter()
                    .min_by_key(|(_, feed)| feed.stored_at)
                    .map(|(key, _)| key.clone())
                else {
                    break;
                };
                feeds.remove(&oldest);
            }
        }

        feeds.insert(
            session.to_string(),
            CachedFeed {
                items,
                expires_at,
                stored_at: now,
            },
        );
    }

    pub fn cached_sessions(&self) -> usize {
        self.lock().len()
    }

    pub fn view(&self, session: &str) -> NotificationFeedView {
        let items = self
            .lock()
            .get(session)
            .map(|feed| feed.items.clone())
            .unwrap_or_default();
        let unread_count = items.iter().filter(|n| !n.is_read).count();
        NotificationFeedView {
            items,
            unread_count,
        }
    }

    /// Marks the notification read locally; returns its previous flag, or
    /// `None` when the session has not seen it yet.
    pub fn mark_read_local(&self, session: &str, id: i64) -> Option<bool> {
        let mut feeds = self.lock();
        let item = feeds
            .get_mut(session)?
            .items
            .iter_mut()
            .find(|n| n.id == id)?;
        let previous = item.is_read;
        item.is_read = true;
        Some(previous)
    }

    pub fn restore(&self, session: &str, id: i64, was_read: bool) {
        if let Some(item) = self
            .lock()
            .get_mut(session)
            .and_then(|feed| feed.items.iter_mut().find(|n| n.id == id))
        {
            item.is_read = was_read;
        }
    }

    pub fn forget(&self, session: &str) {
        self.lock().remove(session);
    }
}

pub async fn refresh(
    feeds: &NotificationFeeds,
    service: &NotificationService,
    session: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<NotificationFeedView, ApiError> {
    let items = service.mine().await?;
    feeds.replace(session, expires_at, items);
    Ok(feeds.view(session))
}

/// Optimistic read mark: flip locally, tell the backend, undo on failure.
pub async fn mark_read(
    feeds: &NotificationFeeds,
    service: &NotificationService,
    session: &str,
    id: i64,
) -> Result<NotificationFeedView, ApiError> {
    let previous = feeds.mark_read_local(session, id);
    if previous == Some(true) {
        return Ok(feeds.view(session));
    }

    if let Err(err) = service.mark_read(id).await {
        if let Some(was_read) = previous {
            tracing::warn!(session, notification_id = id, "read mark failed, rolling back");
            feeds.restore(session, id, was_read);
        }
        return Err(err.into());
    }
    Ok(feeds.view(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeTransport;
    use crate::models::NotificationKind;
    use axum::http::Method;
    use chrono::Duration;
    use serde_json::Value;

    fn note(id: i64, is_read: bool) -> Notification {
        Notification {
            id,
            title: format!("n{id}"),
            message: "appointment update".into(),
            kind: NotificationKind::Info,
            is_read,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mark_read_success_updates_count() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::PATCH, "/notifications/1/read", Value::Null);
        let service = NotificationService::new(fake.clone(), None);
        let feeds = NotificationFeeds::default();
        feeds.replace("s", None, vec![note(1, false), note(2, false)]);

        let view = mark_read(&feeds, &service, "s", 1).await.unwrap();
        assert_eq!(view.unread_count, 1);
        assert!(view.items[0].is_read);
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_rolls_back_on_failure() {
        let fake = Arc::new(FakeTransport::new());
        fake.fail(Method::PATCH, "/notifications/2/read", 500, "db down");
        let service = NotificationService::new(fake, None);
        let feeds = NotificationFeeds::default();
        feeds.replace("s", None, vec![note(1, true), note(2, false)]);

        let err = mark_read(&feeds, &service, "s", 2).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(..)));

        let view = feeds.view("s");
        assert!(!view.items[1].is_read);
        assert_eq!(view.unread_count, 1);
    }

    #[tokio::test]
    async fn test_already_read_skips_backend() {
        let fake = Arc::new(FakeTransport::new());
        let service = NotificationService::new(fake.clone(), None);
        let feeds = NotificationFeeds::default();
        feeds.replace("s", None, vec![note(1, true)]);

        let view = mark_read(&feeds, &service, "s", 1).await.unwrap();
        assert_eq!(view.unread_count, 0);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unseen_notification_still_marked_on_backend() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::PATCH, "/notifications/9/read", Value::Null);
        let service = NotificationService::new(fake.clone(), None);
        let feeds = NotificationFeeds::default();

        let view = mark_read(&feeds, &service, "s", 9).await.unwrap();
        assert!(view.items.is_empty());
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_and_forget() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(
            Method::GET,
            "/notifications",
            serde_json::json!([{
                "id": 3, "title": "Reminder", "message": "Tomorrow 08:00", "type": "WARNING",
                "isRead": false, "createdAt": "2026-05-01T08:00:00Z"
            }]),
        );
        let service = NotificationService::new(fake, None);
        let feeds = NotificationFeeds::default();

        let view = refresh(&feeds, &service, "s", None).await.unwrap();
        assert_eq!(view.unread_count, 1);

        feeds.forget("s");
        assert!(feeds.view("s").items.is_empty());
    }

    #[test]
    fn test_expired_session_feeds_are_dropped() {
        let now = Utc::now();
        let feeds = NotificationFeeds::default();
        feeds.replace_at("gone", Some(now - Duration::minutes(1)), vec![note(1, false)], now);
        feeds.replace_at("kept", Some(now + Duration::hours(1)), vec![note(2, false)], now);
        feeds.replace_at("open", None, vec![note(3, false)], now);
        assert_eq!(feeds.cached_sessions(), 2);
        assert!(feeds.view("gone").items.is_empty());

        let later = now + Duration::hours(2);
        feeds.replace_at("next", None, vec![note(4, false)], later);
        assert_eq!(feeds.cached_sessions(), 2);
        assert!(feeds.view("kept").items.is_empty());
        assert_eq!(feeds.view("open").unread_count, 1);
    }

    #[test]
    fn test_feed_cache_is_bounded() {
        let now = Utc::now();
        let feeds = NotificationFeeds::with_capacity(3);
        for i in 0..10 {
            let key = format!("s{i}");
            feeds.replace_at(&key, None, vec![note(i, false)], now + Duration::seconds(i));
        }
        assert_eq!(feeds.cached_sessions(), 3);
        assert!(feeds.view("s0").items.is_empty());
        assert_eq!(feeds.view("s9").unread_count, 1);

        // Refreshing a cached session does not evict anyone.
        feeds.replace_at("s7", None, vec![], now + Duration::seconds(20));
        assert_eq!(feeds.cached_sessions(), 3);
        assert_eq!(feeds.view("s8").unread_count, 1);
    }
}
