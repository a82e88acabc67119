use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use super::{to_percent, Sentiment};
use crate::config::TextLimits;
use crate::error::Error;
use crate::validators::validate_text_length;

/// Stored comment. Confidence is kept as a [0, 1] fraction and rendered as a
/// percentage.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub sentiment: Option<Sentiment>,
    #[serde(serialize_with = "percent_opt")]
    pub confidence: Option<f64>,
    pub analysis_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CommentAuthor>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CommentAuthor {
    pub name: String,
    pub email: String,
}

/// A comment ready to be stored together with its analysis result.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub user_id: i64,
    pub text: String,
    pub sentiment: Option<Sentiment>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SentimentStats {
    pub total: i64,
    #[serde(serialize_with = "percent_opt")]
    pub confidence_mean: Option<f64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Statistics {
    pub total_comments: i64,
    pub by_sentiment: BTreeMap<String, SentimentStats>,
    #[serde(serialize_with = "percent")]
    pub average_confidence: f64,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    user_id: i64,
    text: String,
    sentiment: Option<String>,
    confidence: Option<f64>,
    analysis_date: NaiveDateTime,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl From<CommentRow> for Comment {
    fn from(x: CommentRow) -> Self {
        let user = match (x.user_name, x.user_email) {
            (Some(name), Some(email)) => Some(CommentAuthor { name, email }),
            _ => None,
        };
        Self {
            id: x.id,
            user_id: x.user_id,
            text: x.text,
            sentiment: x.sentiment.and_then(|s| s.parse().ok()),
            confidence: x.confidence,
            analysis_date: x.analysis_date.format(super::DATE_FORMAT).to_string(),
            user,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    sentiment: String,
    total: i64,
    confidence_mean: Option<f64>,
}

fn percent<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(to_percent(*value))
}

fn percent_opt<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_some(&to_percent(*v)),
        None => serializer.serialize_none(),
    }
}

const SELECT_COMMENT: &str = "
    SELECT c.id, c.user_id, c.text, c.sentiment, c.confidence, c.analysis_date,
        NULL AS user_name, NULL AS user_email
    FROM comments AS c";

impl Comment {
    /// Stores a comment after checking its text and owner. The owner check and
    /// the insert share one transaction.
    #[tracing::instrument(skip(pool, new), fields(user_id = new.user_id))]
    pub async fn create(
        pool: &SqlitePool,
        new: NewComment,
        limits: &TextLimits,
    ) -> Result<Self, Error> {
        validate_text_length(&new.text, limits)?;
        if let Some(confidence) = new.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(Error::Validation(format!(
                    "Confidence must be between 0 and 1, got {confidence}"
                )));
            }
        }

        let mut tx = pool.begin().await?;

        let owner: Option<(i64,)> = match sqlx::query_as("SELECT id FROM users WHERE id = ?")
            .bind(new.user_id)
            .fetch_optional(&mut *tx)
            .await
        {
            Ok(owner) => owner,
            Err(err) => {
                tx.rollback().await?;
                return Err(err.into());
            }
        };
        if owner.is_none() {
            tx.rollback().await?;
            return Err(Error::UnknownUser);
        }

        let result = sqlx::query(
            "INSERT INTO comments (user_id, text, sentiment, confidence, analysis_date)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new.user_id)
        .bind(&new.text)
        .bind(new.sentiment.map(|s| s.as_str()))
        .bind(new.confidence)
        .bind(chrono::Utc::now().naive_utc())
        .execute(&mut *tx)
        .await;

        let comment_id = match result {
            Ok(done) => {
                tx.commit().await?;
                done.last_insert_rowid()
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                tx.rollback().await?;
                return Err(Error::UnknownUser);
            }
            Err(err) => {
                tx.rollback().await?;
                return Err(err.into());
            }
        };

        tracing::info!(
            comment_id,
            sentiment = ?new.sentiment,
            "Comment created"
        );

        Self::get(pool, comment_id)
            .await?
            .ok_or(Error::NotFound("Comment"))
    }

    #[tracing::instrument(skip(pool))]
    pub async fn get(pool: &SqlitePool, comment_id: i64) -> Result<Option<Self>, Error> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
            .bind(comment_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Self::from))
    }

    /// All comments with their owner's name and email, newest first.
    #[tracing::instrument(skip(pool))]
    pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Self>, Error> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "
            SELECT c.id, c.user_id, c.text, c.sentiment, c.confidence, c.analysis_date,
                u.name AS user_name, u.email AS user_email
            FROM comments AS c
                JOIN users AS u ON u.id = c.user_id
            ORDER BY c.analysis_date DESC, c.id DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Self::from).collect())
    }

    #[tracing::instrument(skip(pool))]
    pub async fn get_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, Error> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{SELECT_COMMENT} WHERE c.user_id = ? ORDER BY c.analysis_date DESC, c.id DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Self::from).collect())
    }

    #[tracing::instrument(skip(pool))]
    pub async fn get_by_sentiment(pool: &SqlitePool, sentiment: &str) -> Result<Vec<Self>, Error> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{SELECT_COMMENT} WHERE c.sentiment = ? ORDER BY c.analysis_date DESC, c.id DESC"
        ))
        .bind(sentiment.trim().to_lowercase())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Self::from).collect())
    }

    /// Per-label counts and mean confidence, plus the count-weighted average
    /// confidence over every analyzed comment.
    #[tracing::instrument(skip(pool))]
    pub async fn get_statistics(pool: &SqlitePool) -> Result<Statistics, Error> {
        let rows = sqlx::query_as::<_, StatsRow>(
            "
            SELECT sentiment, COUNT(*) AS total, AVG(confidence) AS confidence_mean
            FROM comments
            WHERE sentiment IS NOT NULL
            GROUP BY sentiment",
        )
        .fetch_all(pool)
        .await?;

        let total_comments: i64 = rows.iter().map(|r| r.total).sum();
        let weighted: f64 = rows
            .iter()
            .map(|r| r.confidence_mean.unwrap_or_default() * r.total as f64)
            .sum();
        let average_confidence = if total_comments > 0 {
            weighted / total_comments as f64
        } else {
            0.0
        };

        let by_sentiment = rows
            .into_iter()
            .map(|r| {
                (
                    r.sentiment,
                    SentimentStats {
                        total: r.total,
                        confidence_mean: r.confidence_mean,
                    },
                )
            })
            .collect();

        Ok(Statistics {
            total_comments,
            by_sentiment,
            average_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::models::User;

    fn new_comment(user_id: i64, text: &str, sentiment: Sentiment, confidence: f64) -> NewComment {
        NewComment {
            user_id,
            text: text.into(),
            sentiment: Some(sentiment),
            confidence: Some(confidence),
        }
    }

    async fn user(pool: &SqlitePool, email: &str) -> i64 {
        User::create(pool, "Test User", email).await.unwrap().id().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = test_pool().await;
        let user_id = user(&pool, "a@example.com").await;

        let created = Comment::create(
            &pool,
            new_comment(user_id, "Great product", Sentiment::Positive, 0.9),
            &TextLimits::default(),
        )
        .await
        .unwrap();

        let fetched = Comment::get(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.text, "Great product");
        assert_eq!(fetched.sentiment, Some(Sentiment::Positive));
        assert_eq!(fetched.confidence, Some(0.9));
        assert!(fetched.user.is_none());
    }

    #[tokio::test]
    async fn test_short_text_is_rejected_without_insert() {
        let pool = test_pool().await;
        let user_id = user(&pool, "a@example.com").await;

        let err = Comment::create(
            &pool,
            new_comment(user_id, "  hi  ", Sentiment::Neutral, 0.5),
            &TextLimits::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(Comment::get_all(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let pool = test_pool().await;
        let err = Comment::create(
            &pool,
            new_comment(42, "Nobody wrote this", Sentiment::Neutral, 0.5),
            &TextLimits::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::UnknownUser));
    }

    #[tokio::test]
    async fn test_confidence_outside_unit_interval_is_rejected() {
        let pool = test_pool().await;
        let user_id = user(&pool, "a@example.com").await;
        let err = Comment::create(
            &pool,
            new_comment(user_id, "Fine enough", Sentiment::Neutral, 1.5),
            &TextLimits::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_listing_and_filters() {
        let pool = test_pool().await;
        let ana = user(&pool, "ana@example.com").await;
        let bob = user(&pool, "bob@example.com").await;
        let limits = TextLimits::default();

        Comment::create(&pool, new_comment(ana, "Love it", Sentiment::Positive, 0.8), &limits)
            .await
            .unwrap();
        Comment::create(&pool, new_comment(bob, "Hate it", Sentiment::Negative, 0.7), &limits)
            .await
            .unwrap();
        Comment::create(&pool, new_comment(ana, "Really love it", Sentiment::Positive, 0.6), &limits)
            .await
            .unwrap();

        let all = Comment::get_all(&pool).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].text, "Really love it");
        assert_eq!(all[0].user.as_ref().unwrap().email, "ana@example.com");

        let by_ana = Comment::get_by_user(&pool, ana).await.unwrap();
        assert_eq!(by_ana.len(), 2);
        assert!(by_ana.iter().all(|c| c.user_id == ana));

        let positive = Comment::get_by_sentiment(&pool, "Positive").await.unwrap();
        assert_eq!(positive.len(), 2);
        assert!(Comment::get_by_sentiment(&pool, "neutral").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statistics() {
        let pool = test_pool().await;
        let ana = user(&pool, "ana@example.com").await;
        let limits = TextLimits::default();

        for (text, sentiment, confidence) in [
            ("Love it", Sentiment::Positive, 0.8),
            ("Adore it", Sentiment::Positive, 0.6),
            ("Hate it", Sentiment::Negative, 0.5),
        ] {
            Comment::create(&pool, new_comment(ana, text, sentiment, confidence), &limits)
                .await
                .unwrap();
        }

        let stats = Comment::get_statistics(&pool).await.unwrap();
        assert_eq!(stats.total_comments, 3);
        assert_eq!(stats.by_sentiment["positive"].total, 2);
        assert!((stats.by_sentiment["positive"].confidence_mean.unwrap() - 0.7).abs() < 1e-9);
        assert!((stats.average_confidence - (0.8 + 0.6 + 0.5) / 3.0).abs() < 1e-9);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_sentiment"]["negative"]["confidence_mean"], 50.0);
    }

    #[tokio::test]
    async fn test_statistics_on_empty_store() {
        let pool = test_pool().await;
        let stats = Comment::get_statistics(&pool).await.unwrap();
        assert_eq!(stats.total_comments, 0);
        assert_eq!(stats.average_confidence, 0.0);
        assert!(stats.by_sentiment.is_empty());
    }

    #[tokio::test]
    async fn test_deleting_user_removes_their_comments() {
        let pool = test_pool().await;
        let ana = user(&pool, "ana@example.com").await;
        Comment::create(
            &pool,
            new_comment(ana, "Love it", Sentiment::Positive, 0.8),
            &TextLimits::default(),
        )
        .await
        .unwrap();

        assert!(User::delete(&pool, ana).await.unwrap());
        assert!(Comment::get_all(&pool).await.unwrap().is_empty());
    }
}
