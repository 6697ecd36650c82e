use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use taskmint_core::domain::user::{ContactAlias, User, UserId};

use super::{NewUser, RepositoryError, UserRepository};
use crate::DbPool;

const USER_COLUMNS: &str = "id,
                name,
                email,
                password_hash,
                contacts_json,
                created_at";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let user = User {
            id: UserId(Uuid::new_v4().to_string()),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            contacts: new_user.contacts,
            created_at: Utc::now(),
        };

        let contacts_json = serde_json::to_string(&user.contacts)
            .map_err(|error| RepositoryError::Decode(format!("contacts encode: {error}")))?;

        sqlx::query(
            "INSERT INTO users (
                id,
                name,
                email,
                password_hash,
                contacts_json,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&contacts_json)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}
             FROM users
             WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}
             FROM users
             WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    let contacts_json = row.try_get::<String, _>("contacts_json")?;
    let contacts: Vec<ContactAlias> = serde_json::from_str(&contacts_json)
        .map_err(|error| RepositoryError::Decode(format!("contacts decode: {error}")))?;

    Ok(User {
        id: UserId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        contacts,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

#[cfg(test)]
mod tests {
    use taskmint_core::domain::user::ContactAlias;

    use super::SqlUserRepository;
    use crate::migrations;
    use crate::repositories::{NewUser, UserRepository};
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Alex Chen".to_string(),
            email: email.to_string(),
            password_hash: "pbkdf2-sha256$1$00$00".to_string(),
            contacts: vec![ContactAlias {
                short_name: "ravi".to_string(),
                full_name: "Ravi Kumar".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trips_contacts() {
        let pool = setup_pool().await;
        let repo = SqlUserRepository::new(pool);

        let created = repo.create(new_user("alex@example.com")).await.expect("create");

        let by_email = repo
            .find_by_email("alex@example.com")
            .await
            .expect("find by email")
            .expect("exists");
        assert_eq!(by_email, created);
        assert_eq!(by_email.contacts[0].full_name, "Ravi Kumar");

        let by_id = repo.find_by_id(&created.id).await.expect("find by id").expect("exists");
        assert_eq!(by_id, created);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let pool = setup_pool().await;
        let repo = SqlUserRepository::new(pool);

        repo.create(new_user("alex@example.com")).await.expect("first create");
        let error = repo
            .create(new_user("alex@example.com"))
            .await
            .expect_err("duplicate email must fail");

        assert!(error.is_unique_violation());
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let pool = setup_pool().await;
        let repo = SqlUserRepository::new(pool);

        let found = repo.find_by_email("nobody@example.com").await.expect("find");
        assert!(found.is_none());
    }
}
