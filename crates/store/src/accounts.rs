use models::{Account, AccountConfig, Id};
use sqlx::types::Json as SqlJson;

use crate::{Error, Result, Store};

impl Store {
    pub async fn get_account(&self, id: Id) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            select id, name, api_key_hash, config, created_at
            from accounts where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_account(
        &self,
        id: Id,
        name: &str,
        api_key_hash: &str,
        config: &AccountConfig,
    ) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            insert into accounts (id, name, api_key_hash, config)
            values ($1, $2, $3, $4)
            returning id, name, api_key_hash, config, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(api_key_hash)
        .bind(SqlJson(config))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// require_account fetches an account or returns an [`Error::Invariant`]
    /// — callers hold an account id only because a repo or scan row
    /// referenced it, so a miss here means the schema's foreign keys were
    /// bypassed somehow.
    pub async fn require_account(&self, id: Id) -> Result<Account> {
        self.get_account(id)
            .await?
            .ok_or_else(|| Error::Invariant(format!("account {id:?} does not exist")))
    }
}
