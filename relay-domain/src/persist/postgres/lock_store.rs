use crate::error::{DomainError, DomainResult};
use crate::persist::lock_store::{LockHold, LockStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

/// 基于 `locks` 表的行级锁：`SELECT ... FOR UPDATE` 持有到事务结束
#[derive(Clone)]
pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgLockHold {
    name: String,
    exists: bool,
    last_run: Option<DateTime<Utc>>,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LockHold for PgLockHold {
    fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    async fn update_last_run(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.exists {
            return Err(DomainError::lock(&self.name, "lock row does not exist"));
        }
        let last_run: Option<DateTime<Utc>> = sqlx::query_scalar(
            "UPDATE locks SET last_run = GREATEST(COALESCE(last_run, $2), $2)
             WHERE name = $1
             RETURNING last_run",
        )
        .bind(&self.name)
        .bind(at)
        .fetch_one(&mut *self.tx)
        .await?;
        self.last_run = last_run;
        Ok(())
    }

    async fn release(self) -> DomainResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| DomainError::lock(self.name, err.to_string()))
    }
}

#[async_trait]
impl LockStore for PgLockStore {
    type Hold = PgLockHold;

    async fn acquire(&self, lock_name: &str) -> DomainResult<Self::Hold> {
        let mut tx = self.pool.begin().await?;
        let row: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT last_run FROM locks WHERE name = $1 FOR UPDATE")
                .bind(lock_name)
                .fetch_optional(&mut *tx)
                .await?;

        Ok(PgLockHold {
            name: lock_name.to_string(),
            exists: row.is_some(),
            last_run: row.flatten(),
            tx,
        })
    }
}
