use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Error;

static EMAIL_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    id: Option<i64>,
    name: String,
    email: String,
    register_date: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    register_date: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: Some(row.id),
            name: row.name,
            email: row.email,
            register_date: Some(row.register_date.format(super::DATE_FORMAT).to_string()),
        }
    }
}

impl User {
    /// Validates name and email the same way `create` does.
    pub fn new(name: &str, email: &str) -> Result<Self, String> {
        User::default().set_name(name)?.set_email(email)
    }

    #[inline]
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[inline]
    pub fn register_date(&self) -> Option<&str> {
        self.register_date.as_deref()
    }

    /// Length is measured on the trimmed name; the name is stored as given.
    pub fn set_name(mut self, name: &str) -> Result<Self, String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Name is required".into());
        }
        let len = trimmed.chars().count();
        if len < NAME_MIN {
            return Err(format!("Name must be at least {NAME_MIN} characters"));
        }
        if len > NAME_MAX {
            return Err(format!("Name cannot exceed {NAME_MAX} characters"));
        }
        self.name = name.to_string();
        Ok(self)
    }

    fn validate_email(email: &str) -> bool {
        EMAIL_REGEX
            .get_or_init(|| {
                regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
            })
            .is_match(email)
    }

    pub fn set_email(mut self, email: &str) -> Result<Self, String> {
        if email.trim().is_empty() {
            return Err("Email is required".into());
        }
        if !Self::validate_email(email) {
            return Err("Invalid email format".into());
        }
        self.email = email.to_string();
        Ok(self)
    }

    /// Validates, inserts and returns the stored user.
    #[tracing::instrument(skip(pool))]
    pub async fn create(pool: &SqlitePool, name: &str, email: &str) -> Result<Self, Error> {
        let mut user = User::new(name, email)?;
        let user_id = user.insert(pool).await?;
        tracing::info!(user_id, email = %user.email, "User created");

        Self::get(pool, user_id)
            .await?
            .ok_or(Error::NotFound("User"))
    }

    #[tracing::instrument(skip(self, pool), fields(email = %self.email))]
    pub async fn insert(&mut self, pool: &SqlitePool) -> Result<i64, Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query("INSERT INTO users (name, email, register_date) VALUES (?, ?, ?)")
            .bind(&self.name)
            .bind(&self.email)
            .bind(chrono::Utc::now().naive_utc())
            .execute(&mut *tx)
            .await;

        match result {
            Ok(done) => {
                tx.commit().await?;
                let id = done.last_insert_rowid();
                self.id = Some(id);
                Ok(id)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tx.rollback().await?;
                Err(Error::DuplicateEmail)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err.into())
            }
        }
    }

    #[tracing::instrument(skip(pool))]
    pub async fn get(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, register_date FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Self::from))
    }

    #[tracing::instrument(skip(pool))]
    pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, register_date FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Self::from))
    }

    /// All users, newest first.
    #[tracing::instrument(skip(pool))]
    pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Self>, Error> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, register_date FROM users ORDER BY register_date DESC, id DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Self::from).collect())
    }

    /// Returns `false` when no user had this id.
    #[tracing::instrument(skip(pool))]
    pub async fn delete(pool: &SqlitePool, user_id: i64) -> Result<bool, Error> {
        let mut tx = pool.begin().await?;

        match sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
        {
            Ok(done) => {
                tx.commit().await?;
                let deleted = done.rows_affected() > 0;
                if deleted {
                    tracing::info!(user_id, "User deleted");
                }
                Ok(deleted)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    #[test]
    fn test_name_validation() {
        assert!(User::default().set_name("A").is_err());
        assert!(User::default().set_name("   ").is_err());
        assert!(User::default().set_name(&"x".repeat(101)).is_err());
        assert_eq!(User::default().set_name("  Ana ").unwrap().name(), "  Ana ");
        assert!(User::default().set_name(" A ").is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(User::default().set_email("ana@example.com").is_ok());
        assert!(User::default().set_email("first.last+tag@mail.example.org").is_ok());
        assert!(User::default().set_email("not-an-email").is_err());
        assert!(User::default().set_email("ana@example").is_err());
        assert!(User::default().set_email("").is_err());
        assert!(User::default().set_email(" ana@example.com").is_err());
        assert!(User::default().set_email("ana@example.com ").is_err());
    }

    #[tokio::test]
    async fn test_create_then_fetch_round_trips() {
        let pool = test_pool().await;
        let created = User::create(&pool, "Ana Lopez", "ana@example.com").await.unwrap();
        let id = created.id().unwrap();

        let fetched = User::get(&pool, id).await.unwrap().unwrap();
        assert_eq!(fetched.name(), "Ana Lopez");
        assert_eq!(fetched.email(), "ana@example.com");
        assert!(fetched.register_date().is_some());

        let by_email = User::get_by_email(&pool, "ana@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id(), Some(id));
    }

    #[tokio::test]
    async fn test_padded_name_is_stored_as_given() {
        let pool = test_pool().await;
        let created = User::create(&pool, " Ana Lopez ", "ana@example.com").await.unwrap();

        let fetched = User::get(&pool, created.id().unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.name(), " Ana Lopez ");
        assert_eq!(fetched.email(), "ana@example.com");

        let err = User::create(&pool, "Ana Lopez", " ana@example.com").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_without_insert() {
        let pool = test_pool().await;
        User::create(&pool, "Ana", "ana@example.com").await.unwrap();

        let err = User::create(&pool, "Other Ana", "ana@example.com").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
        assert_eq!(User::get_all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_is_a_validation_error() {
        let pool = test_pool().await;
        let err = User::create(&pool, "Ana", "broken").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(User::get_all(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_is_newest_first() {
        let pool = test_pool().await;
        User::create(&pool, "First", "first@example.com").await.unwrap();
        User::create(&pool, "Second", "second@example.com").await.unwrap();

        let users = User::get_all(&pool).await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_user() {
        let pool = test_pool().await;
        let user = User::create(&pool, "Ana", "ana@example.com").await.unwrap();

        assert!(User::delete(&pool, user.id().unwrap()).await.unwrap());
        assert!(!User::delete(&pool, user.id().unwrap()).await.unwrap());
        assert!(!User::delete(&pool, 9999).await.unwrap());
    }
}
