use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::collections::BTreeSet;

/// Reads users, their roles and the permissions granted through those roles.
///
/// Roles surface as `ROLE_<name>` authorities, permissions under their own name.
pub struct MySqlUserDirectory {
    pool: MySqlPool,
}

impl MySqlUserDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserDirectory { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<CredentialRecord, DirectoryError> {
        let user_id: UserId = row
            .try_get("id")
            .map_err(|e| DirectoryError::Store(e.to_string()))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| DirectoryError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| DirectoryError::Store(e.to_string()))?;
        let account_status: AccountStatus = row
            .try_get("account_status")
            .map_err(|e| DirectoryError::Store(e.to_string()))?;

        Ok(CredentialRecord {
            user_id,
            username,
            password_hash,
            account_status,
        })
    }

    async fn authorities(&self, user_id: UserId) -> Result<BTreeSet<String>, DirectoryError> {
        let rows = sqlx::query(
            r#"
SELECT CONCAT('ROLE_', r.name) AS authority
FROM user_roles ur
JOIN roles r ON r.id = ur.role_id
WHERE ur.user_id = ?
UNION
SELECT p.name AS authority
FROM user_roles ur
JOIN role_permissions rp ON rp.role_id = ur.role_id
JOIN permissions p ON p.id = rp.permission_id
WHERE ur.user_id = ?
"#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DirectoryError::Store(format!("query authorities: {e}")))?;

        rows.iter()
            .map(|r| {
                r.try_get::<String, _>("authority")
                    .map_err(|e| DirectoryError::Store(e.to_string()))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl UserDirectory for MySqlUserDirectory {
    async fn load_by_id(&self, user_id: UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, username, password_hash, account_status
FROM users
WHERE id = ?
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DirectoryError::Store(format!("query user: {e}")))?;

        let Some(record) = row_opt.map(Self::row_to_record).transpose()? else {
            return Ok(None);
        };
        let authorities = self.authorities(user_id).await?;

        Ok(Some(DirectoryUser {
            user_id: record.user_id,
            username: record.username,
            authorities,
            account_status: record.account_status,
        }))
    }
}

#[async_trait::async_trait]
impl CredentialRepo for MySqlUserDirectory {
    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, DirectoryError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, username, password_hash, account_status
FROM users
WHERE username = ?
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DirectoryError::Store(format!("query credentials: {e}")))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserId, DirectoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DirectoryError::Store(format!("begin: {e}")))?;

        let inserted = sqlx::query(
            r#"
INSERT INTO users (username, password_hash, account_status)
VALUES (?, ?, ?)
"#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(AccountStatus::Active.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => DirectoryError::UsernameTaken,
            e => DirectoryError::Store(format!("insert user: {e}")),
        })?;
        let user_id = UserId(inserted.last_insert_id() as i64);

        sqlx::query(
            r#"
INSERT INTO user_roles (user_id, role_id)
SELECT ?, id FROM roles WHERE name = 'USER'
"#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DirectoryError::Store(format!("grant user role: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| DirectoryError::Store(format!("commit: {e}")))?;
        Ok(user_id)
    }
}
