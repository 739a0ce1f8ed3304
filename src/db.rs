// =============================================================================
// Farmstead Backend - Database Layer
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Location category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LocationKind {
    Farm,
    Market,
    Warehouse,
}

/// Livestock gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// User model.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

/// User response (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            admin: user.admin,
            created_at: user.created_at,
        }
    }
}

/// Location model (farms, markets, warehouses).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: LocationKind,
    pub name: String,
    pub address: String,
}

/// Livestock model.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Livestock {
    pub id: String,
    pub name: String,
    pub breed: String,
    pub species: String,
    pub birthplace_id: i64,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub location_id: i64,
}

/// Thin livestock row for population forecasting. The birthdate is kept in
/// its stored text form; the predictor parses it and fails loudly on corrupt
/// values instead of skipping them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BirthRecord {
    pub birthdate: String,
    pub location_id: i64,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(url: &str) -> Result<Self, sqlx::Error> {
        // Add create_if_missing option for SQLite
        let url_with_options = if url.starts_with("sqlite:") && !url.contains('?') {
            format!("{}?mode=rwc", url)
        } else if url.starts_with("sqlite:") && !url.contains("mode=") {
            format!("{}&mode=rwc", url)
        } else {
            url.to_string()
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url_with_options)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        // Users table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Locations table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                name TEXT NOT NULL,
                address TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Livestock table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS livestock (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                breed TEXT NOT NULL,
                species TEXT NOT NULL,
                birthplace_id INTEGER NOT NULL REFERENCES locations(id),
                birthdate TEXT NOT NULL,
                gender TEXT NOT NULL,
                location_id INTEGER NOT NULL REFERENCES locations(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes for performance
        let _ = sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_livestock_location ON livestock(location_id)",
        )
        .execute(&self.pool)
        .await;
        let _ = sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_livestock_birthplace ON livestock(birthplace_id)",
        )
        .execute(&self.pool)
        .await;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    // =========================================================================
    // User Methods
    // =========================================================================

    /// Find user by ID.
    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find user by username.
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// Create a new user.
    pub async fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, admin, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find_user_by_id(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    // =========================================================================
    // Location Methods
    // =========================================================================

    /// Create a new location, returning its ID.
    pub async fn create_location(
        &self,
        kind: LocationKind,
        name: &str,
        address: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO locations (type, name, address) VALUES (?, ?, ?)")
            .bind(kind)
            .bind(name)
            .bind(address)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get all locations.
    pub async fn get_locations(&self) -> Result<Vec<Location>, sqlx::Error> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Find location by ID.
    pub async fn find_location_by_id(&self, id: i64) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Write back a full location row.
    pub async fn update_location(&self, location: &Location) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE locations SET type = ?, name = ?, address = ? WHERE id = ?")
            .bind(location.kind)
            .bind(&location.name)
            .bind(&location.address)
            .bind(location.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a location, returning the number of affected rows.
    pub async fn delete_location(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Livestock Methods
    // =========================================================================

    /// Create a new livestock record.
    pub async fn create_livestock(&self, livestock: &Livestock) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO livestock (id, name, breed, species, birthplace_id, birthdate, gender, location_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&livestock.id)
        .bind(&livestock.name)
        .bind(&livestock.breed)
        .bind(&livestock.species)
        .bind(livestock.birthplace_id)
        .bind(livestock.birthdate)
        .bind(livestock.gender)
        .bind(livestock.location_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get all livestock records.
    pub async fn get_livestock(&self) -> Result<Vec<Livestock>, sqlx::Error> {
        sqlx::query_as::<_, Livestock>("SELECT * FROM livestock ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Find livestock by ID.
    pub async fn find_livestock_by_id(&self, id: &str) -> Result<Option<Livestock>, sqlx::Error> {
        sqlx::query_as::<_, Livestock>("SELECT * FROM livestock WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Write back a full livestock row.
    pub async fn update_livestock(&self, livestock: &Livestock) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE livestock
            SET name = ?, breed = ?, species = ?, birthplace_id = ?, birthdate = ?, gender = ?, location_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&livestock.name)
        .bind(&livestock.breed)
        .bind(&livestock.species)
        .bind(livestock.birthplace_id)
        .bind(livestock.birthdate)
        .bind(livestock.gender)
        .bind(livestock.location_id)
        .bind(&livestock.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a livestock record, returning the number of affected rows.
    pub async fn delete_livestock(&self, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM livestock WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Fetch the rows the population forecast runs on. Read fresh per
    /// request; the predictor keeps no cache of its own.
    pub async fn birth_records(&self) -> Result<Vec<BirthRecord>, sqlx::Error> {
        sqlx::query_as::<_, BirthRecord>("SELECT birthdate, location_id FROM livestock")
            .fetch_all(&self.pool)
            .await
    }
}
