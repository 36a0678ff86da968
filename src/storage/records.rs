//! Scrape-record persistence.
//!
//! A record is inserted at `in_progress` before the fetch pipeline runs and
//! is always moved to `completed` or `failed` by the single-URL scrape
//! operation, whichever way that operation exits.

use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::models::StrategyResult;
use crate::quality::ContentAnalysis;
use crate::storage::jobs::now_ms;
use crate::storage::models::{ScrapeRecordRow, TokenUsage, UrlEntry};

/// Inserts a record at status `in_progress` and returns its id.
pub async fn create_record(pool: &SqlitePool, entry: &UrlEntry) -> Result<i64, DatabaseError> {
    let now = now_ms();
    let result = sqlx::query(
        "INSERT INTO scrape_records (url, state, capital, link_id, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, 'in_progress', ?, ?)",
    )
    .bind(&entry.url)
    .bind(&entry.state)
    .bind(&entry.capital)
    .bind(&entry.link_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(result.last_insert_rowid())
}

/// Marks a record completed with the fetch outcome and analysis attached.
pub async fn complete_record(
    pool: &SqlitePool,
    id: i64,
    strategy: &StrategyResult,
    analysis: &ContentAnalysis,
    tokens: TokenUsage,
) -> Result<(), DatabaseError> {
    let methods: Vec<&str> = strategy
        .methods_attempted
        .iter()
        .map(|m| m.as_str())
        .collect();
    let methods_json = serde_json::to_string(&methods).unwrap_or_else(|_| "[]".to_string());
    let fields_json =
        serde_json::to_string(&analysis.fields).unwrap_or_else(|_| "{}".to_string());

    sqlx::query(
        "UPDATE scrape_records
         SET status = 'completed',
             page_type = ?,
             method = ?,
             methods_attempted = ?,
             fallback_used = ?,
             title = ?,
             extracted_fields = ?,
             data_quality = ?,
             data_completeness = ?,
             prompt_tokens = ?,
             completion_tokens = ?,
             total_tokens = ?,
             duration_ms = ?,
             error = NULL,
             updated_at = ?
         WHERE id = ?",
    )
    .bind(strategy.result.metadata.page_type.as_str())
    .bind(strategy.result.method.as_str())
    .bind(methods_json)
    .bind(strategy.fallback_used as i64)
    .bind(&strategy.result.title)
    .bind(fields_json)
    .bind(analysis.data_quality.as_str())
    .bind(analysis.completeness)
    .bind(tokens.prompt_tokens)
    .bind(tokens.completion_tokens)
    .bind(tokens.total_tokens)
    .bind(strategy.result.duration_ms as i64)
    .bind(now_ms())
    .bind(id)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;
    Ok(())
}

/// Marks a record failed with an error message.
pub async fn fail_record(pool: &SqlitePool, id: i64, error: &str) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE scrape_records SET status = 'failed', error = ?, updated_at = ? WHERE id = ?",
    )
    .bind(error)
    .bind(now_ms())
    .bind(id)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;
    Ok(())
}

/// Loads a record row.
pub async fn get_record(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ScrapeRecordRow>, DatabaseError> {
    sqlx::query_as::<_, ScrapeRecordRow>("SELECT * FROM scrape_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::SqlError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchResult, ScrapingMethod};
    use crate::quality;
    use crate::storage::models::RecordStatus;
    use crate::storage::run_migrations;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    fn strategy_result() -> StrategyResult {
        let mut result = FetchResult::failure(
            "https://example.gov/bids/1",
            ScrapingMethod::HttpFetch,
            "placeholder",
            321,
        );
        result.success = true;
        result.error = None;
        result.status_code = Some(200);
        result.title = Some("RFP 24-017".to_string());
        result.extracted_text =
            "RFP 24-017 proposals due May 4, 2026, contact buyer@example.gov".to_string();
        StrategyResult {
            result,
            methods_attempted: vec![ScrapingMethod::HttpFetch],
            fallback_used: false,
        }
    }

    #[tokio::test]
    async fn test_record_lifecycle_completed() {
        let pool = test_pool().await;
        let entry = UrlEntry {
            url: "https://example.gov/bids/1".to_string(),
            state: Some("TX".to_string()),
            capital: Some("Austin".to_string()),
            link_id: Some("link-9".to_string()),
        };
        let id = create_record(&pool, &entry).await.unwrap();

        let row = get_record(&pool, id).await.unwrap().unwrap();
        assert_eq!(row.status(), Some(RecordStatus::InProgress));
        assert_eq!(row.state.as_deref(), Some("TX"));

        let strategy = strategy_result();
        let analysis = quality::analyze(&strategy.result);
        complete_record(&pool, id, &strategy, &analysis, TokenUsage::default())
            .await
            .unwrap();

        let row = get_record(&pool, id).await.unwrap().unwrap();
        assert_eq!(row.status(), Some(RecordStatus::Completed));
        assert_eq!(row.method.as_deref(), Some("http_fetch"));
        assert_eq!(row.methods_attempted.as_deref(), Some(r#"["http_fetch"]"#));
        assert_eq!(row.fallback_used, 0);
        assert!(row.data_completeness.unwrap() > 0.0);
        assert!(row.error.is_none());
        assert_eq!(row.total_tokens, 0);
    }

    #[tokio::test]
    async fn test_record_lifecycle_failed() {
        let pool = test_pool().await;
        let id = create_record(&pool, &UrlEntry::new("https://example.gov"))
            .await
            .unwrap();
        fail_record(&pool, id, "All scraping methods failed")
            .await
            .unwrap();

        let row = get_record(&pool, id).await.unwrap().unwrap();
        assert_eq!(row.status(), Some(RecordStatus::Failed));
        assert_eq!(row.error.as_deref(), Some("All scraping methods failed"));
    }
}
