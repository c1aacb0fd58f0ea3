//! Behaviour every [`MappingStore`] must share, run against each backend.

use std::sync::Arc;
use tinylink_core::{
    InsertOutcome, MappingStore, OwnerId, Resolved, ShortCode, ShortMapping, StorageError,
    StoreStats,
};

pub(crate) fn code(s: &str) -> ShortCode {
    ShortCode::new_unchecked(s)
}

pub(crate) fn mapping(short_code: &str, url: &str, owner: &str) -> ShortMapping {
    ShortMapping::new(code(short_code), url, OwnerId::new(owner))
}

pub(crate) async fn insert_and_resolve<S: MappingStore>(store: &S) {
    let outcome = store
        .insert(mapping("abc12345", "https://example.com", "u1"))
        .await
        .unwrap();
    assert_eq!(outcome, InsertOutcome::Inserted);

    let resolved = store.resolve(&code("abc12345")).await.unwrap();
    assert_eq!(
        resolved,
        Some(Resolved {
            original_url: "https://example.com".to_string(),
            deleted: false,
        })
    );
}

pub(crate) async fn resolve_unknown_code<S: MappingStore>(store: &S) {
    assert!(store.resolve(&code("missing0")).await.unwrap().is_none());
}

pub(crate) async fn duplicate_url_returns_existing_code<S: MappingStore>(store: &S) {
    store
        .insert(mapping("first000", "https://example.com", "u1"))
        .await
        .unwrap();

    let outcome = store
        .insert(mapping("second00", "https://example.com", "u2"))
        .await
        .unwrap();

    assert_eq!(outcome, InsertOutcome::AlreadyExists(code("first000")));
    assert!(store.resolve(&code("second00")).await.unwrap().is_none());
}

pub(crate) async fn code_collision_is_an_error<S: MappingStore>(store: &S) {
    store
        .insert(mapping("taken000", "https://one.example", "u1"))
        .await
        .unwrap();

    let err = store
        .insert(mapping("taken000", "https://two.example", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::CodeCollision(_)));
}

pub(crate) async fn mark_deleted_by_owner<S: MappingStore>(store: &S) {
    let owner = OwnerId::new("u1");
    store
        .insert(mapping("delete00", "https://example.com", "u1"))
        .await
        .unwrap();

    assert!(store.mark_deleted(&code("delete00"), &owner).await.unwrap());
    let resolved = store.resolve(&code("delete00")).await.unwrap().unwrap();
    assert!(resolved.deleted);
    assert_eq!(resolved.original_url, "https://example.com");

    // Second delete leaves the state unchanged.
    assert!(!store.mark_deleted(&code("delete00"), &owner).await.unwrap());
    assert!(store.resolve(&code("delete00")).await.unwrap().unwrap().deleted);
}

pub(crate) async fn mark_deleted_by_other_owner_is_noop<S: MappingStore>(store: &S) {
    store
        .insert(mapping("keep0000", "https://example.com", "u1"))
        .await
        .unwrap();

    assert!(!store
        .mark_deleted(&code("keep0000"), &OwnerId::new("u2"))
        .await
        .unwrap());
    assert!(!store
        .mark_deleted(&code("missing0"), &OwnerId::new("u1"))
        .await
        .unwrap());
    assert!(!store.resolve(&code("keep0000")).await.unwrap().unwrap().deleted);
}

pub(crate) async fn list_by_owner_includes_tombstones<S: MappingStore>(store: &S) {
    let owner = OwnerId::new("u1");
    store
        .insert(mapping("own00001", "https://a.example", "u1"))
        .await
        .unwrap();
    store
        .insert(mapping("own00002", "https://b.example", "u1"))
        .await
        .unwrap();
    store
        .insert(mapping("other001", "https://c.example", "u2"))
        .await
        .unwrap();
    store.mark_deleted(&code("own00002"), &owner).await.unwrap();

    let owned = store.list_by_owner(&owner).await.unwrap();
    let mut codes: Vec<&str> = owned.iter().map(|m| m.short_code.as_str()).collect();
    codes.sort_unstable();
    assert_eq!(codes, vec!["own00001", "own00002"]);
    assert!(owned.iter().any(|m| m.deleted));

    assert!(store
        .list_by_owner(&OwnerId::new("nobody"))
        .await
        .unwrap()
        .is_empty());
}

pub(crate) async fn stats_and_health<S: MappingStore>(store: &S) {
    store.health_check().await.unwrap();
    assert_eq!(store.stats().await.unwrap(), StoreStats::default());

    store
        .insert(mapping("stat0001", "https://a.example", "u1"))
        .await
        .unwrap();
    store
        .insert(mapping("stat0002", "https://b.example", ""))
        .await
        .unwrap();

    assert_eq!(store.stats().await.unwrap(), StoreStats { urls: 2, users: 1 });
}

/// Many writers racing on one URL: exactly one wins, all agree on the code.
pub(crate) async fn concurrent_inserts_dedup<S: MappingStore>(store: Arc<S>) {
    let mut handles = vec![];

    for i in 0..32u32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let candidate = mapping(&format!("race{:04}", i), "https://race.example", "u1");
            let candidate_code = candidate.short_code.clone();
            match store.insert(candidate).await.unwrap() {
                InsertOutcome::Inserted => (true, candidate_code),
                InsertOutcome::AlreadyExists(existing) => (false, existing),
            }
        }));
    }

    let mut winners = 0;
    let mut codes = std::collections::HashSet::new();
    for handle in handles {
        let (inserted, code) = handle.await.unwrap();
        if inserted {
            winners += 1;
        }
        codes.insert(code);
    }

    assert_eq!(winners, 1);
    assert_eq!(codes.len(), 1);
    assert_eq!(store.stats().await.unwrap().urls, 1);
}
