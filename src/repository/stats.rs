use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::error::Result;
use crate::models::{GlobalStats, IpStats, LanguageStats, StatsEntry, StatsReport};

/// Where request outcomes are written
#[async_trait]
pub trait StatsSink: Send + Sync {
    /// Fire-and-forget write. Failures are logged, never returned.
    fn record(&self, entry: StatsEntry);

    async fn summary(&self) -> Result<StatsReport>;
}

/// Repository for the stats table
#[derive(Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert one stats row
    pub async fn insert(&self, entry: &StatsEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stats (ip, language, characters_translated, outcome)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&entry.ip)
        .bind(&entry.language)
        .bind(entry.characters)
        .bind(entry.outcome.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let stats = sqlx::query_as::<_, GlobalStats>(
            r#"
            SELECT COUNT(*) AS total_requests,
                   COALESCE(SUM(CASE WHEN outcome = 'success' THEN 1 ELSE 0 END), 0) AS successful_requests,
                   COALESCE(SUM(CASE WHEN outcome = 'failure' THEN 1 ELSE 0 END), 0) AS failed_requests,
                   COALESCE(SUM(characters_translated), 0) AS total_characters,
                   COUNT(DISTINCT ip) AS unique_ips
            FROM stats
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    pub async fn per_language(&self) -> Result<Vec<LanguageStats>> {
        let rows = sqlx::query_as::<_, LanguageStats>(
            r#"
            SELECT COALESCE(language, '') AS language,
                   COUNT(*) AS total_requests,
                   COALESCE(SUM(CASE WHEN outcome = 'success' THEN 1 ELSE 0 END), 0) AS successful_requests,
                   COALESCE(SUM(CASE WHEN outcome = 'failure' THEN 1 ELSE 0 END), 0) AS failed_requests,
                   COALESCE(SUM(characters_translated), 0) AS total_characters
            FROM stats
            GROUP BY language
            ORDER BY language
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn per_ip(&self) -> Result<Vec<IpStats>> {
        let rows = sqlx::query_as::<_, IpStats>(
            r#"
            SELECT COALESCE(ip, '') AS ip,
                   COUNT(*) AS request_count,
                   COALESCE(SUM(characters_translated), 0) AS total_characters
            FROM stats
            GROUP BY ip
            ORDER BY ip
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl StatsSink for StatsRepository {
    fn record(&self, entry: StatsEntry) {
        let repo = self.clone();
        tokio::spawn(async move {
            match repo.insert(&entry).await {
                Ok(()) => debug!(ip = %entry.ip, outcome = %entry.outcome, "Recorded stats"),
                Err(e) => error!("Failed to record stats for {}: {}", entry.ip, e),
            }
        });
    }

    async fn summary(&self) -> Result<StatsReport> {
        let (global_stats, per_language_stats, per_ip_stats) =
            tokio::try_join!(self.global_stats(), self.per_language(), self.per_ip())?;

        Ok(StatsReport {
            global_stats,
            per_language_stats,
            per_ip_stats,
        })
    }
}
