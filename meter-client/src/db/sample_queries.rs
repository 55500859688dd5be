use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::{to_business_local, Reading, Sample, SampleRow, TableIdent};

const SAMPLE_COLUMNS: &str = r#""timestamp", voltage, "current", frequency, pf, watt, total_watt_hours"#;

/// Append one reading to a stream table, stamped with `at` in business-local
/// wall time.
pub async fn insert_sample(pool: &PgPool, table: &TableIdent, reading: &Reading, at: OffsetDateTime) -> Result<()> {
    let sql = format!(
        r#"
        INSERT INTO {table} (voltage, "current", frequency, pf, watt, total_watt_hours, "timestamp")
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
        table = table.quoted()
    );

    sqlx::query(&sql)
        .bind(reading.voltage)
        .bind(reading.current)
        .bind(reading.frequency)
        .bind(reading.power_factor)
        .bind(reading.watt)
        .bind(reading.cumulative_watt_hours)
        .bind(to_business_local(at))
        .execute(pool)
        .await?;

    Ok(())
}

/// Earliest sample with `timestamp >= at`.
pub async fn first_at_or_after(pool: &PgPool, table: &TableIdent, at: OffsetDateTime) -> Result<Option<Sample>> {
    let sql = format!(
        r#"SELECT {SAMPLE_COLUMNS} FROM {table} WHERE "timestamp" >= $1 ORDER BY "timestamp" ASC LIMIT 1"#,
        table = table.quoted()
    );

    let row = sqlx::query_as::<_, SampleRow>(&sql)
        .bind(to_business_local(at))
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Sample::from))
}

/// Latest sample with `timestamp <= at`.
pub async fn last_at_or_before(pool: &PgPool, table: &TableIdent, at: OffsetDateTime) -> Result<Option<Sample>> {
    let sql = format!(
        r#"SELECT {SAMPLE_COLUMNS} FROM {table} WHERE "timestamp" <= $1 ORDER BY "timestamp" DESC LIMIT 1"#,
        table = table.quoted()
    );

    let row = sqlx::query_as::<_, SampleRow>(&sql)
        .bind(to_business_local(at))
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Sample::from))
}

/// Most recent sample of the table, regardless of time.
pub async fn latest(pool: &PgPool, table: &TableIdent) -> Result<Option<Sample>> {
    let sql = format!(
        r#"SELECT {SAMPLE_COLUMNS} FROM {table} ORDER BY "timestamp" DESC LIMIT 1"#,
        table = table.quoted()
    );

    let row = sqlx::query_as::<_, SampleRow>(&sql).fetch_optional(pool).await?;

    Ok(row.map(Sample::from))
}

/// Time-ordered samples in `[start, end]`, both bounds inclusive. An open
/// `end` reads to the most recent sample.
pub async fn samples_between(
    pool: &PgPool,
    table: &TableIdent,
    start: OffsetDateTime,
    end: Option<OffsetDateTime>,
) -> Result<Vec<Sample>> {
    let rows = match end {
        Some(end) => {
            let sql = format!(
                r#"
                SELECT {SAMPLE_COLUMNS}
                FROM {table}
                WHERE "timestamp" >= $1
                  AND "timestamp" <= $2
                ORDER BY "timestamp"
                "#,
                table = table.quoted()
            );
            sqlx::query_as::<_, SampleRow>(&sql)
                .bind(to_business_local(start))
                .bind(to_business_local(end))
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                r#"SELECT {SAMPLE_COLUMNS} FROM {table} WHERE "timestamp" >= $1 ORDER BY "timestamp""#,
                table = table.quoted()
            );
            sqlx::query_as::<_, SampleRow>(&sql)
                .bind(to_business_local(start))
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows.into_iter().map(Sample::from).collect())
}

/// Names of every table visible in the current schema, straight from the
/// catalog. This is not filtered against any registry.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = current_schema()
        ORDER BY table_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(names)
}
