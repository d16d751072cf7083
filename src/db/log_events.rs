use std::collections::HashSet;

use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{LogDetail, LogEvent};

/// Persist an event and its owned details in a single transaction.
///
/// Returns the stored record with storage-assigned identifiers on the event
/// and every detail.
pub async fn create(pool: &PgPool, event: &LogEvent) -> Result<LogEvent, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut stored = event.clone();

    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO log_event (source_url, comment, created, month, user_email, user_ip,
                                source, log_event_type_id, log_reason_type_id, log_source_type_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(&event.source_url)
    .bind(&event.comment)
    .bind(event.created)
    .bind(&event.month)
    .bind(&event.user_email)
    .bind(&event.user_ip)
    .bind(&event.source)
    .bind(event.log_event_type_id)
    .bind(event.log_reason_type_id)
    .bind(event.log_source_type_id)
    .fetch_one(&mut *tx)
    .await?;
    stored.assign_id(id);

    stored.log_details = HashSet::with_capacity(event.log_details.len());
    for detail in &event.log_details {
        stored.log_details.insert(insert_detail(&mut tx, id, detail).await?);
    }

    tx.commit().await?;
    tracing::debug!("stored log event {id} with {} details", stored.log_details.len());
    Ok(stored)
}

async fn insert_detail(
    tx: &mut Transaction<'_, Postgres>,
    log_event_id: i32,
    detail: &LogDetail,
) -> Result<LogDetail, sqlx::Error> {
    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO log_detail (log_event_id, entity_type, record_type, record_count)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(log_event_id)
    .bind(&detail.entity_type)
    .bind(&detail.record_type)
    .bind(detail.record_count)
    .fetch_one(&mut **tx)
    .await?;

    let mut stored = detail.clone();
    stored.assign_id(id);
    Ok(stored)
}

/// Fetch one event with its detail set eagerly loaded.
pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<LogEvent>, sqlx::Error> {
    let event = sqlx::query_as::<_, LogEvent>("SELECT * FROM log_event WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match event {
        Some(mut event) => {
            event.log_details = details_for(pool, event.id()).await?;
            Ok(Some(event))
        }
        None => Ok(None),
    }
}

/// Events for one `YYYYMM` reporting bucket, newest first, details loaded.
pub async fn list_by_month(pool: &PgPool, month: &str) -> Result<Vec<LogEvent>, sqlx::Error> {
    let mut events = sqlx::query_as::<_, LogEvent>(
        "SELECT * FROM log_event WHERE month = $1 ORDER BY created DESC",
    )
    .bind(month)
    .fetch_all(pool)
    .await?;

    for event in &mut events {
        event.log_details = details_for(pool, event.id()).await?;
    }
    Ok(events)
}

async fn details_for(pool: &PgPool, log_event_id: i32) -> Result<HashSet<LogDetail>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogDetail>("SELECT * FROM log_detail WHERE log_event_id = $1")
        .bind(log_event_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Remove an event; the schema cascades the delete to its detail rows.
pub async fn delete(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM log_event WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
