//! Authorization decisions: backend first, whitelist and cache offline.
//!
//! While the backend answers, it is the single authority and successful
//! lookups feed a small most-recently-used cache. While it is unreachable,
//! the compiled-in whitelist is consulted first and the cache second. An
//! explicit "checked and invalid" answer from the backend is an
//! authoritative denial and never falls back to the offline sources.

use std::collections::VecDeque;

use fabomatic_backend::{BackendClient, PubSubTransport};
use fabomatic_core::constants::{CACHE_LEN, WHITELIST_LEN};
use fabomatic_core::{CardUid, FabUser, UserLevel};
use fabomatic_storage::CachedCard;
use tracing::{debug, info, warn};

/// One compiled-in always-authorized card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhiteListEntry {
    pub uid: CardUid,
    pub level: UserLevel,
    pub name: &'static str,
}

/// Decides whether a card holder may use the machine.
pub struct AuthProvider {
    /// Bounded to [`WHITELIST_LEN`]; entries past it are ignored.
    whitelist: &'static [WhiteListEntry],
    /// Most recent first, bounded to [`CACHE_LEN`].
    cache: VecDeque<CachedCard>,
    cache_dirty: bool,
}

impl AuthProvider {
    pub fn new(mut whitelist: &'static [WhiteListEntry]) -> Self {
        if whitelist.len() > WHITELIST_LEN {
            warn!(
                len = whitelist.len(),
                max = WHITELIST_LEN,
                "whitelist too long, ignoring extra entries"
            );
            whitelist = &whitelist[..WHITELIST_LEN];
        }
        Self {
            whitelist,
            cache: VecDeque::new(),
            cache_dirty: false,
        }
    }

    /// Authorize a card, online when possible, offline otherwise.
    ///
    /// Returns `None` when no source recognizes the card or the backend
    /// explicitly denied it.
    pub async fn try_login<T: PubSubTransport>(
        &mut self,
        uid: CardUid,
        backend: &mut BackendClient<T>,
    ) -> Option<FabUser> {
        match backend.check_card(uid).await {
            Ok(resp) if resp.request_ok => {
                if !resp.is_valid {
                    // Authoritative denial: the backend knows better than
                    // any offline source.
                    info!(%uid, "card denied by backend");
                    return None;
                }
                let user = FabUser {
                    card_uid: uid,
                    name: resp.name.clone(),
                    authenticated: true,
                    level: resp.user_level(),
                };
                self.cache_add(&user);
                Some(user)
            }
            Ok(_) => self.offline_lookup(uid),
            Err(err) => {
                warn!(%err, "card check failed locally");
                self.offline_lookup(uid)
            }
        }
    }

    /// Whitelist first, then the runtime cache.
    fn offline_lookup(&self, uid: CardUid) -> Option<FabUser> {
        if let Some(entry) = self.whitelist.iter().find(|e| e.uid == uid) {
            debug!(%uid, "card found in whitelist");
            return Some(FabUser {
                card_uid: uid,
                name: entry.name.to_string(),
                authenticated: true,
                level: entry.level,
            });
        }
        if let Some(cached) = self.cache.iter().find(|c| c.uid == uid) {
            debug!(%uid, "card found in cache");
            return Some(FabUser {
                card_uid: uid,
                name: cached.name.clone(),
                authenticated: true,
                level: cached.level,
            });
        }
        debug!(%uid, "card unknown offline");
        None
    }

    /// Remember a successful online lookup, most recent first.
    fn cache_add(&mut self, user: &FabUser) {
        self.cache.retain(|c| c.uid != user.card_uid);
        self.cache.push_front(CachedCard {
            uid: user.card_uid,
            level: user.level,
            name: user.name.clone(),
        });
        self.cache.truncate(CACHE_LEN);
        self.cache_dirty = true;
    }

    /// Whether the cache changed since the last snapshot.
    #[must_use]
    pub fn cache_dirty(&self) -> bool {
        self.cache_dirty
    }

    /// Snapshot the cache for persistence and mark it clean.
    #[must_use]
    pub fn cache_snapshot(&mut self) -> Vec<CachedCard> {
        self.cache_dirty = false;
        self.cache.iter().cloned().collect()
    }

    /// Restore a persisted cache, most recent first.
    pub fn load_cache(&mut self, cards: Vec<CachedCard>) {
        self.cache = cards.into_iter().take(CACHE_LEN).collect();
        self.cache_dirty = false;
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabomatic_backend::{BackendConfig, MockBroker, MockBrokerHandle};

    const WHITELIST: &[WhiteListEntry] = &[
        WhiteListEntry {
            uid: CardUid::new(0xAABBCCD1),
            level: UserLevel::Admin,
            name: "ABCDEFG",
        },
        WhiteListEntry {
            uid: CardUid::new(0x11112222),
            level: UserLevel::User,
            name: "Member",
        },
    ];

    fn backend() -> (BackendClient<MockBroker>, MockBrokerHandle) {
        let (broker, handle) = MockBroker::new();
        let mut client = BackendClient::new(broker);
        client.configure(BackendConfig {
            broker_host: "broker.local".into(),
            machine_name: "laser1".into(),
        });
        (client, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_whitelist_hit() {
        let (mut backend, handle) = backend();
        handle.set_reachable(false).await;
        let mut auth = AuthProvider::new(WHITELIST);

        let user = auth
            .try_login(CardUid::new(0xAABBCCD1), &mut backend)
            .await
            .expect("whitelisted card");
        assert!(user.authenticated);
        assert_eq!(user.name, "ABCDEFG");
        assert_eq!(user.level, UserLevel::Admin);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_unknown_card_rejected() {
        let (mut backend, handle) = backend();
        handle.set_reachable(false).await;
        let mut auth = AuthProvider::new(WHITELIST);
        assert!(auth.try_login(CardUid::new(0xDEAD), &mut backend).await.is_none());
    }

    #[tokio::test]
    async fn test_online_success_populates_cache() {
        let (mut backend, handle) = backend();
        handle
            .set_responder(|_t, _p| {
                Some(r#"{"request_ok":true,"is_valid":true,"level":2,"name":"Ada"}"#.to_string())
            })
            .await;
        backend.connect().await.unwrap();

        let mut auth = AuthProvider::new(WHITELIST);
        let uid = CardUid::new(0x5555);
        let user = auth.try_login(uid, &mut backend).await.expect("valid card");
        assert_eq!(user.level, UserLevel::Staff);
        assert_eq!(auth.cache_len(), 1);
        assert!(auth.cache_dirty());

        // The cached card now works offline.
        handle.set_reachable(false).await;
        tokio::time::pause();
        let user = auth.try_login(uid, &mut backend).await.expect("cached card");
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_denial_does_not_fall_back() {
        let (mut backend, handle) = backend();
        handle
            .set_responder(|_t, _p| Some(r#"{"request_ok":true,"is_valid":false}"#.to_string()))
            .await;
        backend.connect().await.unwrap();

        // Whitelisted card, but the backend says no: no fallback.
        let mut auth = AuthProvider::new(WHITELIST);
        assert!(
            auth.try_login(CardUid::new(0xAABBCCD1), &mut backend)
                .await
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitelist_is_bounded() {
        const fn entry(uid: u64) -> WhiteListEntry {
            WhiteListEntry {
                uid: CardUid::new(uid),
                level: UserLevel::User,
                name: "Member",
            }
        }
        static OVERLONG: [WhiteListEntry; WHITELIST_LEN + 1] = {
            let mut entries = [entry(0); WHITELIST_LEN + 1];
            let mut i = 0;
            while i < entries.len() {
                entries[i] = entry(0x2000 + i as u64);
                i += 1;
            }
            entries
        };

        let (mut backend, handle) = backend();
        handle.set_reachable(false).await;
        let mut auth = AuthProvider::new(&OVERLONG);

        let last_kept = CardUid::new(0x2000 + WHITELIST_LEN as u64 - 1);
        assert!(auth.try_login(last_kept, &mut backend).await.is_some());
        let first_ignored = CardUid::new(0x2000 + WHITELIST_LEN as u64);
        assert!(auth.try_login(first_ignored, &mut backend).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_is_bounded_and_mru() {
        let (mut backend, handle) = backend();
        handle
            .set_responder(|_t, payload| {
                let v: serde_json::Value = serde_json::from_str(payload).ok()?;
                let uid = v["uid"].as_str()?.to_string();
                Some(format!(
                    r#"{{"request_ok":true,"is_valid":true,"level":1,"name":"{uid}"}}"#
                ))
            })
            .await;
        backend.connect().await.unwrap();

        let mut auth = AuthProvider::new(&[]);
        for n in 0..CACHE_LEN as u64 + 3 {
            auth.try_login(CardUid::new(0x1000 + n), &mut backend).await.unwrap();
        }
        assert_eq!(auth.cache_len(), CACHE_LEN);

        // The oldest entries were evicted.
        let snapshot = auth.cache_snapshot();
        assert!(snapshot.iter().all(|c| c.uid != CardUid::new(0x1000)));
        assert_eq!(snapshot[0].uid, CardUid::new(0x1000 + CACHE_LEN as u64 + 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_snapshot_restores_offline_access() {
        let (mut backend, handle) = backend();
        handle.set_reachable(false).await;

        let mut auth = AuthProvider::new(&[]);
        auth.load_cache(vec![CachedCard {
            uid: CardUid::new(0x7777),
            level: UserLevel::User,
            name: "Restored".into(),
        }]);
        assert!(!auth.cache_dirty());

        let user = auth
            .try_login(CardUid::new(0x7777), &mut backend)
            .await
            .expect("restored card");
        assert_eq!(user.name, "Restored");
    }
}
