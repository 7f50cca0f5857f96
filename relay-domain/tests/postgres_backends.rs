//! Postgres 账本与锁表的集成测试
//!
//! 共享一个 TestContainers 容器，每个测试建独立数据库，互不干扰。
//! 运行：`cargo test -p relay-domain --features infra-sqlx -- --ignored`
#![cfg(feature = "infra-sqlx")]

mod common;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use common::OrderEvent;
use futures_util::TryStreamExt;
use relay_domain::clock::{ManualClock, SharedClock};
use relay_domain::error::DomainError;
use relay_domain::persist::postgres::{PgLedger, PgLockStore, migrate};
use relay_domain::persist::{
    GuardedOutcome, LedgerTransaction, LockHold, LockStore, LockStoreExt, PublicationId,
    PublicationLedger, PublicationRecord,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

struct PostgresTestContext {
    _container: ContainerAsync<Postgres>,
    host: String,
    port: u16,
}

impl PostgresTestContext {
    fn url(&self, database: &str) -> String {
        format!(
            "postgres://postgres:postgres@{}:{}/{}",
            self.host, self.port, database
        )
    }
}

static POSTGRES_CONTEXT: OnceCell<PostgresTestContext> = OnceCell::const_new();

async fn postgres_context() -> &'static PostgresTestContext {
    POSTGRES_CONTEXT
        .get_or_init(|| async {
            let container = Postgres::default()
                .with_tag("16-alpine")
                .start()
                .await
                .expect("Failed to start Postgres container");
            let host = container
                .get_host()
                .await
                .expect("Failed to get host")
                .to_string();
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("Failed to get port");

            PostgresTestContext {
                _container: container,
                host,
                port,
            }
        })
        .await
}

/// 新建数据库并执行建表
async fn fresh_pool() -> PgPool {
    let ctx = postgres_context().await;
    let admin = PgPool::connect(&ctx.url("postgres"))
        .await
        .expect("Failed to connect to Postgres");
    let database = format!("relay_{}", Uuid::new_v4().simple());
    sqlx::query(&format!("CREATE DATABASE {database}"))
        .execute(&admin)
        .await
        .expect("Failed to create database");
    admin.close().await;

    let pool = PgPoolOptions::new()
        .max_connections(12)
        .connect(&ctx.url(&database))
        .await
        .expect("Failed to connect to test database");
    migrate(&pool).await.expect("Failed to run migrations");
    pool
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

async fn record_at(ledger: &PgLedger, order_id: i64, published_at: DateTime<Utc>) -> PublicationId {
    let record = PublicationRecord::for_listener(
        &OrderEvent::OrderPlaced { order_id },
        "orders",
        published_at,
    )
    .unwrap();
    let mut tx = ledger.begin().await.unwrap();
    tx.record(&record).await.unwrap();
    tx.commit().await.unwrap();
    record.id()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires Docker with PostgreSQL"]
async fn concurrent_guarded_runs_execute_exactly_once() {
    let pool = fresh_pool().await;
    let locks = Arc::new(PgLockStore::new(pool.clone()));
    let clock = Arc::new(ManualClock::new(noon()));
    let runs = Arc::new(AtomicUsize::new(0));

    let mut joins = Vec::new();
    for _ in 0..8 {
        let locks = locks.clone();
        let clock = clock.clone();
        let runs = runs.clone();
        joins.push(tokio::spawn(async move {
            locks
                .run_exclusively(
                    clock.as_ref(),
                    "cleanup",
                    Duration::from_secs(23 * 3600),
                    || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, DomainError>(())
                    },
                )
                .await
                .unwrap()
        }));
    }

    let mut executed = 0;
    for j in joins {
        if j.await.unwrap().is_executed() {
            executed += 1;
        }
    }

    assert_eq!(executed, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let last_run: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT last_run FROM locks WHERE name = 'cleanup'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(last_run, Some(noon()));
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn last_run_never_moves_back() {
    let locks = PgLockStore::new(fresh_pool().await);

    let mut hold = locks.acquire("resubmit").await.unwrap();
    hold.update_last_run(noon()).await.unwrap();
    hold.release().await.unwrap();

    let mut hold = locks.acquire("resubmit").await.unwrap();
    hold.update_last_run(noon() - TimeDelta::hours(3)).await.unwrap();
    assert_eq!(hold.last_run(), Some(noon()));
    hold.release().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn unknown_lock_is_skipped() {
    let locks = PgLockStore::new(fresh_pool().await);
    let clock = ManualClock::new(noon());

    let outcome: GuardedOutcome<()> = locks
        .run_exclusively(&clock, "nightly", Duration::from_secs(60), || async {
            Ok::<_, DomainError>(())
        })
        .await
        .unwrap();

    assert_eq!(outcome, GuardedOutcome::Skipped { last_run: None });
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn stale_scan_pages_in_order_and_excludes_the_boundary() {
    let clock = ManualClock::new(noon());
    let shared: SharedClock = Arc::new(clock.clone());
    let ledger = PgLedger::new(fresh_pool().await, shared).with_page_size(2);

    let mut expected = Vec::new();
    for (order_id, minutes) in [(1, 300), (2, 240), (3, 180), (4, 120)] {
        expected.push(record_at(&ledger, order_id, noon() - TimeDelta::minutes(minutes)).await);
    }
    let done = record_at(&ledger, 5, noon() - TimeDelta::minutes(270)).await;
    assert!(ledger.mark_complete(done).await.unwrap());
    // 恰好一小时前：不算陈旧
    record_at(&ledger, 6, noon() - TimeDelta::hours(1)).await;
    record_at(&ledger, 7, noon() - TimeDelta::minutes(30)).await;

    let stale: Vec<PublicationRecord> = ledger
        .find_incomplete_older_than(Duration::from_secs(3600))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(stale.iter().map(|r| r.id()).collect::<Vec<_>>(), expected);
    assert_eq!(ledger.count_incomplete().await.unwrap(), 6);
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn retention_never_touches_incomplete_rows() {
    let clock = ManualClock::new(noon());
    let shared: SharedClock = Arc::new(clock.clone());
    let ledger = PgLedger::new(fresh_pool().await, shared);

    let old_done = record_at(&ledger, 1, noon() - TimeDelta::days(10)).await;
    let old_pending = record_at(&ledger, 2, noon() - TimeDelta::days(10)).await;
    let recent_done = record_at(&ledger, 3, noon() - TimeDelta::hours(2)).await;

    clock.set(noon() - TimeDelta::days(5));
    ledger.mark_complete(old_done).await.unwrap();
    clock.set(noon() - TimeDelta::hours(1));
    ledger.mark_complete(recent_done).await.unwrap();
    clock.set(noon());

    let retention = Duration::from_secs(24 * 3600);
    let expired = ledger.find_completed_older_than(retention).await.unwrap();
    assert_eq!(expired.iter().map(|r| r.id()).collect::<Vec<_>>(), vec![old_done]);

    assert_eq!(ledger.delete_completed_older_than(retention).await.unwrap(), 1);
    assert!(ledger.find(old_done).await.unwrap().is_none());
    assert!(!ledger.find(old_pending).await.unwrap().unwrap().is_completed());
    assert!(ledger.find(recent_done).await.unwrap().unwrap().is_completed());
}
