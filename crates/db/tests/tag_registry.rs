//! Integration tests for tag insert/update and the replace-or-insert protocol.

use assert_matches::assert_matches;
use dockyard_core::error::CoreError;
use dockyard_core::tag_key::TagKey;
use dockyard_db::models::repository_tag::{CreateRepositoryTag, UpdateRepositoryTag};
use dockyard_db::repositories::RepositoryTagRepo;
use dockyard_db::services::TagService;
use dockyard_db::{DbError, Storage};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_tag(namespace: &str, repository: &str, tag_name: &str, tag_json: &str) -> CreateRepositoryTag {
    CreateRepositoryTag {
        namespace: namespace.to_string(),
        repository: repository.to_string(),
        tag_name: tag_name.to_string(),
        tag_json: tag_json.to_string(),
        ..CreateRepositoryTag::default()
    }
}

async fn rows_for_key(pool: &PgPool, namespace: &str, repository: &str, tag_name: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT tag_json FROM repository_tags \
         WHERE namespace = $1 AND repository = $2 AND tag_name = $3",
    )
    .bind(namespace)
    .bind(repository)
    .bind(tag_name)
    .fetch_all(pool)
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_key_rejected_on_insert(pool: PgPool) {
    let storage = Storage::from_pool(pool);
    let tags = TagService::new(&storage);

    tags.insert_tag(new_tag("ns1", "r1", "v1", "{a}")).await.unwrap();
    let result = tags.insert_tag(new_tag("ns1", "r1", "v1", "{b}")).await;
    assert_matches!(
        result,
        Err(DbError::UniquenessViolation { ref constraint }) if constraint == "uq_repository_tags_key"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_namespace_alone_is_not_unique(pool: PgPool) {
    let storage = Storage::from_pool(pool);
    let tags = TagService::new(&storage);

    tags.insert_tag(new_tag("ns1", "r1", "v1", "{a}")).await.unwrap();
    tags.insert_tag(new_tag("ns1", "r2", "v1", "{b}")).await.unwrap();
    tags.insert_tag(new_tag("ns1", "r1", "v2", "{c}")).await.unwrap();

    let listed = tags.list_tags("ns1", "r1").await.unwrap();
    let names: Vec<&str> = listed.iter().map(|t| t.tag_name.as_str()).collect();
    assert_eq!(names, vec!["v1", "v2"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_rejects_invalid_key(pool: PgPool) {
    let storage = Storage::from_pool(pool);
    let tags = TagService::new(&storage);

    let result = tags.insert_tag(new_tag("NS", "r1", "v1", "{a}")).await;
    assert_matches!(result, Err(DbError::Core(CoreError::Validation(_))));
}

// ---------------------------------------------------------------------------
// Put (replace-or-insert)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_put_replaces_inserted_tag(pool: PgPool) {
    let storage = Storage::from_pool(pool.clone());
    let tags = TagService::new(&storage);

    let old = tags.insert_tag(new_tag("ns1", "r1", "v1", "{old}")).await.unwrap();
    let new = tags.put_tag(new_tag("ns1", "r1", "v1", "{new}")).await.unwrap();

    assert_eq!(rows_for_key(&pool, "ns1", "r1", "v1").await, vec!["{new}"]);
    assert_ne!(new.id, old.id, "replacement should be a fresh row");
    assert_eq!(new.version, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_put_on_absent_key_inserts(pool: PgPool) {
    let storage = Storage::from_pool(pool);
    let tags = TagService::new(&storage);

    let put = tags.put_tag(new_tag("ns1", "r1", "latest", "{m}")).await.unwrap();
    let found = tags
        .find_tag(&TagKey::new("ns1", "r1", "latest"))
        .await
        .unwrap();
    assert_eq!(found, Some(put));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_put_twice_keeps_last_payload(pool: PgPool) {
    let storage = Storage::from_pool(pool.clone());
    let tags = TagService::new(&storage);

    tags.put_tag(new_tag("ns1", "r1", "v1", "{first}")).await.unwrap();
    tags.put_tag(new_tag("ns1", "r1", "v1", "{second}")).await.unwrap();

    assert_eq!(rows_for_key(&pool, "ns1", "r1", "v1").await, vec!["{second}"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_put_leaves_other_keys_alone(pool: PgPool) {
    let storage = Storage::from_pool(pool.clone());
    let tags = TagService::new(&storage);

    tags.put_tag(new_tag("ns1", "r1", "v1", "{a}")).await.unwrap();
    tags.put_tag(new_tag("ns1", "r1", "v2", "{b}")).await.unwrap();
    tags.put_tag(new_tag("ns1", "r1", "v1", "{c}")).await.unwrap();

    assert_eq!(rows_for_key(&pool, "ns1", "r1", "v2").await, vec!["{b}"]);
    assert_eq!(rows_for_key(&pool, "ns1", "r1", "v1").await, vec!["{c}"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_puts_leave_exactly_one_row(pool: PgPool) {
    let storage = Storage::from_pool(pool.clone());
    let payloads: Vec<String> = (0..8).map(|i| format!("{{payload-{i}}}")).collect();

    let puts = payloads.iter().map(|payload| {
        let storage = storage.clone();
        let input = new_tag("ns1", "r1", "v1", payload);
        async move { TagService::new(&storage).put_tag(input).await }
    });
    let results = futures::future::join_all(puts).await;
    for result in &results {
        assert!(result.is_ok(), "put failed: {result:?}");
    }

    let rows = rows_for_key(&pool, "ns1", "r1", "v1").await;
    assert_eq!(rows.len(), 1, "expected one surviving row, got {rows:?}");
    assert!(payloads.contains(&rows[0]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_put_waits_for_in_flight_insert(pool: PgPool) {
    let storage = Storage::from_pool(pool.clone());
    let pending = new_tag("ns1", "r1", "v1", "{inserted}");

    // Same steps insert_tag takes, held open across the put.
    let mut tx = pool.begin().await.unwrap();
    RepositoryTagRepo::lock_key(&mut *tx, &pending.key()).await.unwrap();
    RepositoryTagRepo::create(&mut *tx, &pending).await.unwrap();

    let put = tokio::spawn({
        let storage = storage.clone();
        async move {
            TagService::new(&storage)
                .put_tag(new_tag("ns1", "r1", "v1", "{put}"))
                .await
        }
    });
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!put.is_finished(), "put should queue behind the open insert");

    tx.commit().await.unwrap();
    let result = put.await.unwrap();
    assert!(result.is_ok(), "put failed: {result:?}");

    assert_eq!(rows_for_key(&pool, "ns1", "r1", "v1").await, vec!["{put}"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_puts_never_fail_against_concurrent_inserts(pool: PgPool) {
    let storage = Storage::from_pool(pool.clone());

    let calls = (0..8).map(|i| {
        let storage = storage.clone();
        let input = new_tag("ns1", "r1", "v1", &format!("{{call-{i}}}"));
        async move {
            let tags = TagService::new(&storage);
            if i % 2 == 0 {
                (true, tags.put_tag(input).await)
            } else {
                (false, tags.insert_tag(input).await)
            }
        }
    });
    for (is_put, result) in futures::future::join_all(calls).await {
        if is_put {
            assert!(result.is_ok(), "put failed: {result:?}");
        } else if let Err(err) = result {
            assert_matches!(err, DbError::UniquenessViolation { .. });
        }
    }

    assert_eq!(rows_for_key(&pool, "ns1", "r1", "v1").await.len(), 1);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_in_place(pool: PgPool) {
    let storage = Storage::from_pool(pool);
    let tags = TagService::new(&storage);
    let tag = tags.insert_tag(new_tag("ns1", "r1", "v1", "{old}")).await.unwrap();

    let update = UpdateRepositoryTag {
        version: tag.version,
        description: Some("release build".into()),
        tag_json: Some("{new}".into()),
        ..UpdateRepositoryTag::default()
    };
    let updated = tags.update_tag(tag.id, &update).await.unwrap();

    assert_eq!(updated.id, tag.id);
    assert_eq!(updated.tag_json, "{new}");
    assert_eq!(updated.description, "release build");
    assert_eq!(updated.key(), tag.key());
    assert_eq!(updated.version, tag.version + 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_with_stale_version_conflicts(pool: PgPool) {
    let storage = Storage::from_pool(pool);
    let tags = TagService::new(&storage);
    let tag = tags.insert_tag(new_tag("ns1", "r1", "v1", "{old}")).await.unwrap();

    let first = UpdateRepositoryTag {
        version: tag.version,
        tag_json: Some("{one}".into()),
        ..UpdateRepositoryTag::default()
    };
    tags.update_tag(tag.id, &first).await.unwrap();

    let second = UpdateRepositoryTag {
        version: tag.version,
        tag_json: Some("{two}".into()),
        ..UpdateRepositoryTag::default()
    };
    let result = tags.update_tag(tag.id, &second).await;
    assert_matches!(result, Err(DbError::Core(CoreError::Conflict(_))));

    let current = tags.find_tag(&tag.key()).await.unwrap().unwrap();
    assert_eq!(current.tag_json, "{one}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_missing_tag_is_not_found(pool: PgPool) {
    let storage = Storage::from_pool(pool);
    let tags = TagService::new(&storage);

    let update = UpdateRepositoryTag {
        version: 1,
        ..UpdateRepositoryTag::default()
    };
    let result = tags.update_tag(404, &update).await;
    assert_matches!(result, Err(e) if e.is_not_found());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_can_move_tag_to_free_key_only(pool: PgPool) {
    let storage = Storage::from_pool(pool.clone());
    let tags = TagService::new(&storage);
    let tag = tags.insert_tag(new_tag("ns1", "r1", "v1", "{a}")).await.unwrap();
    tags.insert_tag(new_tag("ns1", "r1", "v2", "{b}")).await.unwrap();

    let onto_taken = UpdateRepositoryTag {
        version: tag.version,
        tag_name: Some("v2".into()),
        ..UpdateRepositoryTag::default()
    };
    let result = tags.update_tag(tag.id, &onto_taken).await;
    assert_matches!(result, Err(DbError::UniquenessViolation { .. }));

    let onto_free = UpdateRepositoryTag {
        version: tag.version,
        tag_name: Some("v3".into()),
        ..UpdateRepositoryTag::default()
    };
    let moved = tags.update_tag(tag.id, &onto_free).await.unwrap();
    assert_eq!(moved.id, tag.id);
    assert_eq!(moved.key(), TagKey::new("ns1", "r1", "v3"));
    assert!(rows_for_key(&pool, "ns1", "r1", "v1").await.is_empty());
}
