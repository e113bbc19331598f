use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
    Row, Sqlite,
};

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{Survey, SurveyAnswer, SurveyResult};
use crate::store::{SurveyResultStore, SurveyStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    // Connect using the configured URL and pool size
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        Self::connect(&config.database_url, config.max_connections).await
    }

    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        // Create database if it doesn't exist (in-memory ones have nothing on disk)
        if !db_url.contains(":memory:") && !Sqlite::database_exists(db_url).await? {
            info!("Creating database {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        // Connect to the database
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;

        // Initialize schema
        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    // Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Initialize the database schema
    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS surveys (
                id TEXT PRIMARY KEY,
                question TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS survey_answers (
                survey_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                answer TEXT NOT NULL,
                image TEXT,
                PRIMARY KEY (survey_id, position),
                FOREIGN KEY (survey_id) REFERENCES surveys(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS survey_results (
                survey_id TEXT NOT NULL,
                participant_id TEXT NOT NULL,
                answer TEXT NOT NULL,
                date TEXT NOT NULL,
                PRIMARY KEY (survey_id, participant_id),
                FOREIGN KEY (survey_id) REFERENCES surveys(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS errors (
                stack TEXT NOT NULL,
                date TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // Record a server error for later inspection
    pub async fn log_error(&self, stack: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO errors (stack, date)
            VALUES (?, ?)
            "#,
        )
        .bind(stack)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Store a survey together with its ordered answer options
    pub async fn add_survey(&self, survey: &Survey) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Insert the survey
        sqlx::query(
            r#"
            INSERT INTO surveys (id, question, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&survey.id)
        .bind(&survey.question)
        .bind(survey.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        // Insert answer options, keeping their order
        for (i, option) in survey.answers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO survey_answers (survey_id, position, answer, image)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&survey.id)
            .bind(i as i64)
            .bind(&option.answer)
            .bind(&option.image)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // Get a survey by ID
    pub async fn get_survey(&self, survey_id: &str) -> Result<Option<Survey>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, question, created_at
            FROM surveys
            WHERE id = ?
            "#,
        )
        .bind(survey_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Get answer options
        let created_at: String = row.try_get("created_at")?;
        let answers = self.get_survey_answers(survey_id).await?;

        Ok(Some(Survey {
            id: row.try_get("id")?,
            question: row.try_get("question")?,
            answers,
            created_at: parse_timestamp("created_at", &created_at)?,
        }))
    }

    // Newest first
    pub async fn list_surveys(&self) -> Result<Vec<Survey>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, question, created_at
            FROM surveys
            ORDER BY rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut surveys = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let created_at: String = row.try_get("created_at")?;
            let answers = self.get_survey_answers(&id).await?;
            surveys.push(Survey {
                id,
                question: row.try_get("question")?,
                answers,
                created_at: parse_timestamp("created_at", &created_at)?,
            });
        }

        Ok(surveys)
    }

    // Get the answer options of a survey in their defined order
    async fn get_survey_answers(&self, survey_id: &str) -> Result<Vec<SurveyAnswer>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT answer, image
            FROM survey_answers
            WHERE survey_id = ?
            ORDER BY position
            "#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<SurveyAnswer, StoreError> {
                Ok(SurveyAnswer {
                    answer: row.try_get("answer")?,
                    image: row.try_get("image")?,
                })
            })
            .collect()
    }

    // Save a result (replacing any existing one for the same participant and survey)
    pub async fn save_survey_result(
        &self,
        survey_id: &str,
        participant_id: &str,
        answer: &str,
        date: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO survey_results (survey_id, participant_id, answer, date)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(survey_id, participant_id)
            DO UPDATE SET answer = excluded.answer, date = excluded.date
            "#,
        )
        .bind(survey_id)
        .bind(participant_id)
        .bind(answer)
        .bind(date.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Get every result recorded for a survey
    pub async fn get_survey_results(&self, survey_id: &str) -> Result<Vec<SurveyResult>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT survey_id, participant_id, answer, date
            FROM survey_results
            WHERE survey_id = ?
            "#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<SurveyResult, StoreError> {
                let date: String = row.try_get("date")?;
                Ok(SurveyResult {
                    survey_id: row.try_get("survey_id")?,
                    participant_id: row.try_get("participant_id")?,
                    answer: row.try_get("answer")?,
                    date: parse_timestamp("date", &date)?,
                })
            })
            .collect()
    }
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Malformed(format!("failed to parse {}: {}", column, e)))
}

#[async_trait]
impl SurveyStore for Database {
    async fn get_by_id(&self, survey_id: &str) -> Result<Option<Survey>, StoreError> {
        self.get_survey(survey_id).await
    }
}

#[async_trait]
impl SurveyResultStore for Database {
    async fn upsert(
        &self,
        survey_id: &str,
        participant_id: &str,
        answer: &str,
        date: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.save_survey_result(survey_id, participant_id, answer, date).await
    }

    async fn list_by_survey(&self, survey_id: &str) -> Result<Vec<SurveyResult>, StoreError> {
        self.get_survey_results(survey_id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) async fn memory_db() -> Database {
        Database::connect("sqlite::memory:", 1).await.unwrap()
    }

    pub(crate) fn survey(labels: &[&str]) -> Survey {
        let answers = labels
            .iter()
            .map(|label| SurveyAnswer {
                answer: label.to_string(),
                image: None,
            })
            .collect();
        Survey::new("Favourite colour?".to_string(), answers).unwrap()
    }

    #[tokio::test]
    async fn survey_round_trips_with_answer_order() {
        let db = memory_db().await;
        let mut survey = survey(&["red", "blue", "green"]);
        survey.answers[1].image = Some("https://img.example/blue.png".to_string());
        db.add_survey(&survey).await.unwrap();

        let loaded = db.get_survey(&survey.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, survey.id);
        assert_eq!(loaded.answers, survey.answers);
    }

    #[tokio::test]
    async fn unknown_survey_is_none() {
        let db = memory_db().await;
        assert!(db.get_survey("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_surveys_returns_newest_first() {
        let db = memory_db().await;
        let first = survey(&["a", "b"]);
        let second = survey(&["c"]);
        db.add_survey(&first).await.unwrap();
        db.add_survey(&second).await.unwrap();

        let surveys = db.list_surveys().await.unwrap();
        let ids: Vec<&str> = surveys.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, [second.id.as_str(), first.id.as_str()]);
        assert_eq!(surveys[1].answers.len(), 2);
    }

    #[tokio::test]
    async fn resubmission_replaces_existing_result() {
        let db = memory_db().await;
        let survey = survey(&["red", "blue"]);
        db.add_survey(&survey).await.unwrap();

        let first = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 2, 12, 30, 0).unwrap();
        db.upsert(&survey.id, "alice", "red", first).await.unwrap();
        db.upsert(&survey.id, "alice", "blue", second).await.unwrap();

        let results = db.list_by_survey(&survey.id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].participant_id, "alice");
        assert_eq!(results[0].answer, "blue");
        assert_eq!(results[0].date, second);
    }

    #[tokio::test]
    async fn results_are_scoped_to_their_survey() {
        let db = memory_db().await;
        let colours = survey(&["red", "blue"]);
        let other = survey(&["yes", "no"]);
        db.add_survey(&colours).await.unwrap();
        db.add_survey(&other).await.unwrap();

        let now = Utc::now();
        db.upsert(&colours.id, "alice", "red", now).await.unwrap();
        db.upsert(&colours.id, "bob", "blue", now).await.unwrap();
        db.upsert(&other.id, "alice", "yes", now).await.unwrap();

        assert_eq!(db.list_by_survey(&colours.id).await.unwrap().len(), 2);
        assert_eq!(db.list_by_survey(&other.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_timestamp_is_reported() {
        let db = memory_db().await;
        let survey = survey(&["red"]);
        db.add_survey(&survey).await.unwrap();
        sqlx::query("INSERT INTO survey_results (survey_id, participant_id, answer, date) VALUES (?, ?, ?, ?)")
            .bind(&survey.id)
            .bind("alice")
            .bind("red")
            .bind("yesterday")
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.list_by_survey(&survey.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[tokio::test]
    async fn logged_errors_are_stored() {
        let db = memory_db().await;
        let before = Utc::now();
        db.log_error("StoreFailure { survey_id: \"s1\" }").await.unwrap();

        let rows = sqlx::query("SELECT stack, date FROM errors")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let stack: String = rows[0].get("stack");
        let date: String = rows[0].get("date");
        assert_eq!(stack, "StoreFailure { survey_id: \"s1\" }");
        assert!(parse_timestamp("date", &date).unwrap() >= before);
    }
}
