//! Runs against a throwaway MySQL container; needs a local Docker daemon.
//! `cargo test -p tinylink-storage -- --ignored` to include them.

use std::sync::Arc;
use tinylink_core::{OwnerId, ShortCode};
use tinylink_storage::{
    InsertOutcome, MappingStore, MySqlStore, ReadStore, ShortMapping, StorageError, StoreStats,
};
use tinylink_test_infra::mysql::{MySqlServer, MysqlConfig};

struct Fixture {
    _mysql: MySqlServer,
    store: MySqlStore,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let pool = mysql.pool().await.expect("connect mysql");

        let store = MySqlStore::new(pool);
        store.ensure_schema().await.expect("create schema");

        Self {
            _mysql: mysql,
            store,
        }
    }
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn mapping(short_code: &str, url: &str, owner: &str) -> ShortMapping {
    ShortMapping::new(code(short_code), url, OwnerId::new(owner))
}

#[tokio::test]
#[ignore = "requires docker"]
async fn insert_and_resolve() {
    let fixture = Fixture::start().await;

    let outcome = fixture
        .store
        .insert(mapping("abc12345", "https://example.com", "u1"))
        .await
        .unwrap();
    assert_eq!(outcome, InsertOutcome::Inserted);

    let got = fixture.store.resolve(&code("abc12345")).await.unwrap().unwrap();
    assert_eq!(got.original_url, "https://example.com");
    assert!(!got.deleted);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn same_url_returns_canonical_code() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .insert(mapping("first000", "https://example.com", "u1"))
        .await
        .unwrap();
    let outcome = fixture
        .store
        .insert(mapping("second00", "https://example.com", "u2"))
        .await
        .unwrap();

    assert_eq!(outcome, InsertOutcome::AlreadyExists(code("first000")));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn reused_code_is_a_collision() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .insert(mapping("taken000", "https://one.example", "u1"))
        .await
        .unwrap();
    let err = fixture
        .store
        .insert(mapping("taken000", "https://two.example", "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::CodeCollision(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn soft_delete_is_owner_gated_and_kept_in_listing() {
    let fixture = Fixture::start().await;
    let owner = OwnerId::new("u1");

    fixture
        .store
        .insert(mapping("delete00", "https://example.com", "u1"))
        .await
        .unwrap();

    assert!(!fixture
        .store
        .mark_deleted(&code("delete00"), &OwnerId::new("u2"))
        .await
        .unwrap());
    assert!(fixture.store.mark_deleted(&code("delete00"), &owner).await.unwrap());
    assert!(!fixture.store.mark_deleted(&code("delete00"), &owner).await.unwrap());

    let got = fixture.store.resolve(&code("delete00")).await.unwrap().unwrap();
    assert!(got.deleted);

    let listed = fixture.store.list_by_owner(&owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].deleted);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn stats_count_urls_and_named_owners() {
    let fixture = Fixture::start().await;
    fixture.store.health_check().await.unwrap();

    fixture
        .store
        .insert(mapping("stat0001", "https://a.example", "u1"))
        .await
        .unwrap();
    fixture
        .store
        .insert(mapping("stat0002", "https://b.example", ""))
        .await
        .unwrap();

    assert_eq!(
        fixture.store.stats().await.unwrap(),
        StoreStats { urls: 2, users: 1 }
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn long_urls_are_stored_and_deduplicated() {
    let fixture = Fixture::start().await;
    let url = format!("https://example.com/{}", "a".repeat(4_000));

    let outcome = fixture.store.insert(mapping("long0000", &url, "u1")).await.unwrap();
    assert_eq!(outcome, InsertOutcome::Inserted);

    let got = fixture.store.resolve(&code("long0000")).await.unwrap().unwrap();
    assert_eq!(got.original_url, url);

    let again = fixture.store.insert(mapping("long0001", &url, "u2")).await.unwrap();
    assert_eq!(again, InsertOutcome::AlreadyExists(code("long0000")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires docker"]
async fn concurrent_inserts_of_one_url_agree() {
    let fixture = Fixture::start().await;
    let store = Arc::new(fixture.store.clone());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .insert(mapping(&format!("race{i:04}"), "https://race.example", "u1"))
                    .await
            })
        })
        .collect();

    let mut inserted = 0;
    let mut existing = Vec::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            InsertOutcome::Inserted => inserted += 1,
            InsertOutcome::AlreadyExists(code) => existing.push(code),
        }
    }

    assert_eq!(inserted, 1);
    let listed = fixture.store.list_by_owner(&OwnerId::new("u1")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(existing.iter().all(|code| *code == listed[0].short_code));
    assert_eq!(fixture.store.stats().await.unwrap().urls, 1);
}
