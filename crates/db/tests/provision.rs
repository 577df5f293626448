//! Provisioning integration tests against a real PostgreSQL server.

mod common;

use assert_matches::assert_matches;
use dbarena_db::{DbError, EphemeralDb};

#[tokio::test]
#[ignore = "requires a running PostgreSQL server"]
async fn create_exists_destroy_round_trip() {
    let mut db = EphemeralDb::new("arena_it", common::provisioner().await).unwrap();
    assert!(db.name().starts_with("arena_it_"));

    assert!(!db.exists().await.unwrap());
    db.create().await.unwrap();
    assert!(db.exists().await.unwrap());

    db.destroy().await.unwrap();
    assert!(!db.exists().await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL server"]
async fn same_basename_never_collides() {
    let mut first = EphemeralDb::new("arena_it", common::provisioner().await).unwrap();
    let mut second = EphemeralDb::new("arena_it", common::provisioner().await).unwrap();
    assert_ne!(first.name(), second.name());

    first.create().await.unwrap();
    second.create().await.unwrap();

    first.destroy().await.unwrap();
    second.destroy().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL server"]
async fn taken_name_fails_with_already_exists() {
    let mut original = EphemeralDb::new("arena_it", common::provisioner().await).unwrap();
    original.create().await.unwrap();

    let mut duplicate = EphemeralDb::attach(original.name(), common::provisioner().await);
    let err = duplicate.create().await.unwrap_err();
    assert_matches!(err, DbError::AlreadyExists { name } if name == original.name());

    original.destroy().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL server"]
async fn schema_applies_once_and_connection_stays_usable() {
    let mut db = common::provisioned_db("arena_it").await;

    // The multi-statement script was fully drained, so the pool must be
    // usable immediately.
    let pool = db.backend().pool().unwrap().clone();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM updateResultTest")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    assert_matches!(
        db.set_schema("").await,
        Err(DbError::SchemaAlreadySet)
    );

    db.destroy().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL server"]
async fn update_reports_matched_rows() {
    let mut db = common::provisioned_db("arena_it").await;
    let pool = db.backend().pool().unwrap().clone();

    let matched = sqlx::query("UPDATE updateResultTest SET txt = 'updated' WHERE id = $1")
        .bind(1_i64)
        .execute(&pool)
        .await
        .unwrap()
        .rows_affected();
    assert_eq!(matched, 1);

    let matched = sqlx::query("UPDATE updateResultTest SET txt = 'updated' WHERE id = $1")
        .bind(2_i64)
        .execute(&pool)
        .await
        .unwrap()
        .rows_affected();
    assert_eq!(matched, 0);

    db.destroy().await.unwrap();
}
