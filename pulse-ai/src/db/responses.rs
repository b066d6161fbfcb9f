//! Survey response database operations

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use pulse_common::{Error, Result};

use crate::db::retry::retry_on_lock;
use crate::models::{NewResponse, ResponseGroup, Sentiment, SurveyResponse, TopicScore};

/// Rows are pending when they carry a comment and no real sentiment yet.
/// "neutral with zero confidence" is the pre-classification default and
/// counts as pending; any label outside the known three is treated as the
/// `N/A` sentinel.
const PENDING_PREDICATE: &str = "TRIM(comment) <> '' \
     AND sentiment NOT IN ('positive', 'negative') \
     AND NOT (sentiment = 'neutral' AND sentiment_confidence > 0.0)";

const SELECT_COLUMNS: &str = "id, rating, comment, language, sentiment, \
     sentiment_confidence, topics, created_at, updated_at";

/// Insert a single response with the not-yet-analyzed sentinel
pub async fn insert(pool: &SqlitePool, new: &NewResponse) -> Result<SurveyResponse> {
    let now = Utc::now();
    let response = SurveyResponse {
        id: Uuid::new_v4(),
        rating: new.rating,
        comment: new.comment_text(),
        language: new.language_code(),
        response_group: ResponseGroup::from_rating(new.rating),
        sentiment: Sentiment::NotAnalyzed,
        sentiment_confidence: 0.0,
        topics: Vec::new(),
        created_at: new.created_at.unwrap_or(now),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO survey_responses (
            id, rating, comment, language, sentiment,
            sentiment_confidence, topics, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(response.id.to_string())
    .bind(response.rating)
    .bind(&response.comment)
    .bind(&response.language)
    .bind(response.sentiment.as_str())
    .bind(response.sentiment_confidence)
    .bind("[]")
    .bind(response.created_at.to_rfc3339())
    .bind(response.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(response)
}

/// Bulk insert for the import path; all-or-nothing within one transaction
pub async fn insert_many(pool: &SqlitePool, batch: &[NewResponse]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    for new in batch {
        sqlx::query(
            r#"
            INSERT INTO survey_responses (
                id, rating, comment, language, sentiment,
                sentiment_confidence, topics, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(new.rating)
        .bind(new.comment_text())
        .bind(new.language_code())
        .bind(Sentiment::NotAnalyzed.as_str())
        .bind(0.0_f64)
        .bind("[]")
        .bind(new.created_at.unwrap_or(now).to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(batch.len())
}

/// Load one response by id
pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<SurveyResponse>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM survey_responses WHERE id = ?",
        SELECT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|r| map_row(&r)).transpose()
}

/// Newest-first listing for the dashboard
pub async fn list(pool: &SqlitePool, limit: i64) -> Result<Vec<SurveyResponse>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM survey_responses ORDER BY created_at DESC, id DESC LIMIT ?",
        SELECT_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_row).collect()
}

/// Rows still awaiting enrichment, oldest first
pub async fn pending_for_enrichment(pool: &SqlitePool) -> Result<Vec<SurveyResponse>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM survey_responses WHERE {} ORDER BY created_at ASC, id ASC",
        SELECT_COLUMNS, PENDING_PREDICATE
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_row).collect()
}

/// Count of rows currently awaiting enrichment
pub async fn pending_count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM survey_responses WHERE {}",
        PENDING_PREDICATE
    ))
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Write a classification result back to a row, bumping `updated_at`
///
/// Retries on lock contention since enrichment writes race with API
/// inserts on the same file. The caller supplies the retry budget
/// (resolved once per run, not per row).
pub async fn update_enrichment(
    pool: &SqlitePool,
    id: Uuid,
    sentiment: Sentiment,
    confidence: f64,
    topics: &[TopicScore],
    max_lock_wait_ms: u64,
) -> Result<()> {
    let id_str = id.to_string();
    let topics_json = serde_json::to_string(topics)
        .map_err(|e| Error::Internal(format!("Failed to serialize topics: {}", e)))?;
    let updated_at = Utc::now().to_rfc3339();

    retry_on_lock("update_enrichment", max_lock_wait_ms, || async {
        let result = sqlx::query(
            r#"
            UPDATE survey_responses
            SET sentiment = ?, sentiment_confidence = ?, topics = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(sentiment.as_str())
        .bind(confidence)
        .bind(&topics_json)
        .bind(&updated_at)
        .bind(&id_str)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("response {}", id_str)));
        }
        Ok(())
    })
    .await
}

/// Delete every response; the data model's only delete path
pub async fn clear_all(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query("DELETE FROM survey_responses")
        .execute(pool)
        .await?;

    Ok(result.rows_affected() as usize)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Per-segment counts derived from ratings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCounts {
    pub promoters: i64,
    pub passives: i64,
    pub detractors: i64,
}

pub async fn group_counts(pool: &SqlitePool) -> Result<GroupCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN rating >= 9 THEN 1 ELSE 0 END), 0) AS promoters,
            COALESCE(SUM(CASE WHEN rating BETWEEN 7 AND 8 THEN 1 ELSE 0 END), 0) AS passives,
            COALESCE(SUM(CASE WHEN rating <= 6 THEN 1 ELSE 0 END), 0) AS detractors
        FROM survey_responses
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(GroupCounts {
        promoters: row.get("promoters"),
        passives: row.get("passives"),
        detractors: row.get("detractors"),
    })
}

/// Sentiment label distribution over all rows
pub async fn sentiment_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        "SELECT sentiment, COUNT(*) AS n FROM survey_responses GROUP BY sentiment ORDER BY n DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| (r.get::<String, _>("sentiment"), r.get::<i64, _>("n")))
        .collect())
}

/// Flattened topic scores from every enriched row, for aggregation
pub async fn all_topic_scores(pool: &SqlitePool) -> Result<Vec<TopicScore>> {
    let rows = sqlx::query("SELECT topics FROM survey_responses WHERE topics <> '[]'")
        .fetch_all(pool)
        .await?;

    let mut scores = Vec::new();
    for row in &rows {
        let json: String = row.get("topics");
        let topics: Vec<TopicScore> = serde_json::from_str(&json)
            .map_err(|e| Error::Internal(format!("Failed to deserialize topics: {}", e)))?;
        scores.extend(topics);
    }
    Ok(scores)
}

fn map_row(row: &SqliteRow) -> Result<SurveyResponse> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Failed to parse response id: {}", e)))?;

    let rating: i64 = row.get("rating");

    let sentiment_str: String = row.get("sentiment");
    let sentiment = Sentiment::from_db(&sentiment_str);

    let topics_json: String = row.get("topics");
    let topics: Vec<TopicScore> = serde_json::from_str(&topics_json)
        .map_err(|e| Error::Internal(format!("Failed to deserialize topics: {}", e)))?;

    let created_at = parse_timestamp(row, "created_at")?;
    let updated_at = parse_timestamp(row, "updated_at")?;

    Ok(SurveyResponse {
        id,
        rating,
        comment: row.get("comment"),
        language: row.get("language"),
        response_group: ResponseGroup::from_rating(rating),
        sentiment,
        sentiment_confidence: row.get("sentiment_confidence"),
        topics,
        created_at,
        updated_at,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(column);
    let parsed = DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn new_response(rating: i64, comment: &str) -> NewResponse {
        NewResponse {
            rating,
            comment: Some(comment.to_string()),
            language: Some("en".to_string()),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let pool = test_pool().await;

        let stored = insert(&pool, &new_response(3, "Fees are too high")).await.unwrap();
        assert_eq!(stored.sentiment, Sentiment::NotAnalyzed);
        assert_eq!(stored.response_group, ResponseGroup::Detractor);

        let loaded = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, stored.id);
        assert_eq!(loaded.rating, 3);
        assert_eq!(loaded.comment, "Fees are too high");
        assert_eq!(loaded.sentiment, Sentiment::NotAnalyzed);
        assert_eq!(loaded.sentiment_confidence, 0.0);
        assert!(loaded.topics.is_empty());
    }

    #[tokio::test]
    async fn test_pending_query_honours_sentinel() {
        let pool = test_pool().await;

        // Pending: has comment, never analyzed
        let pending = insert(&pool, &new_response(2, "Slow app")).await.unwrap();
        // Not pending: no comment
        insert(&pool, &new_response(9, "")).await.unwrap();
        // Not pending once a real result lands
        let done = insert(&pool, &new_response(10, "Love it")).await.unwrap();
        update_enrichment(
            &pool,
            done.id,
            Sentiment::Positive,
            0.8,
            &[TopicScore {
                topic: "Features".to_string(),
                confidence: 0.7,
            }],
            5000,
        )
        .await
        .unwrap();
        // Still pending: neutral with zero confidence is the default state
        let neutral_default = insert(&pool, &new_response(5, "It exists")).await.unwrap();
        update_enrichment(&pool, neutral_default.id, Sentiment::Neutral, 0.0, &[], 5000)
            .await
            .unwrap();

        let rows = pending_for_enrichment(&pool).await.unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        assert!(ids.contains(&pending.id));
        assert!(ids.contains(&neutral_default.id));
        assert_eq!(ids.len(), 2);
        assert_eq!(pending_count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_enrichment_bumps_updated_at() {
        let pool = test_pool().await;
        let stored = insert(&pool, &new_response(1, "Crashes daily")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        update_enrichment(&pool, stored.id, Sentiment::Negative, 0.8, &[], 5000)
            .await
            .unwrap();

        let loaded = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.sentiment, Sentiment::Negative);
        assert_eq!(loaded.sentiment_confidence, 0.8);
        assert!(loaded.updated_at > stored.updated_at);
        assert_eq!(loaded.created_at, stored.created_at);
    }

    #[tokio::test]
    async fn test_update_enrichment_unknown_id_is_not_found() {
        let pool = test_pool().await;
        let err = update_enrichment(&pool, Uuid::new_v4(), Sentiment::Positive, 0.8, &[], 5000)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_insert_many_and_clear_all() {
        let pool = test_pool().await;

        let batch = vec![
            new_response(10, "Great"),
            new_response(0, "Awful"),
            new_response(7, ""),
        ];
        assert_eq!(insert_many(&pool, &batch).await.unwrap(), 3);
        assert_eq!(count(&pool).await.unwrap(), 3);

        let groups = group_counts(&pool).await.unwrap();
        assert_eq!(groups.promoters, 1);
        assert_eq!(groups.passives, 1);
        assert_eq!(groups.detractors, 1);

        assert_eq!(clear_all(&pool).await.unwrap(), 3);
        assert_eq!(count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let pool = test_pool().await;

        let old = NewResponse {
            rating: 5,
            comment: Some("older".to_string()),
            language: None,
            created_at: Some(Utc::now() - chrono::Duration::days(2)),
        };
        insert(&pool, &old).await.unwrap();
        insert(&pool, &new_response(6, "newer")).await.unwrap();

        let rows = list(&pool, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].comment, "newer");
        assert_eq!(rows[1].comment, "older");

        let limited = list(&pool, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_topic_score_aggregation_source() {
        let pool = test_pool().await;

        let a = insert(&pool, &new_response(2, "support is slow")).await.unwrap();
        update_enrichment(
            &pool,
            a.id,
            Sentiment::Negative,
            0.8,
            &[
                TopicScore {
                    topic: "Customer Support".to_string(),
                    confidence: 0.9,
                },
                TopicScore {
                    topic: "App Performance".to_string(),
                    confidence: 0.5,
                },
            ],
            5000,
        )
        .await
        .unwrap();

        let scores = all_topic_scores(&pool).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().any(|t| t.topic == "Customer Support"));
    }
}
