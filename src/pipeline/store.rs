//! Store functions - persist user records to the SQLite `usuarios` table

use crate::pipeline::types::{IngestMode, Table, UserRecord, UserRow, WriteStats, USER_COLUMNS};
use crate::pipeline::utils::ensure_parent_dir;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::{debug, error, info, warn};

const INSERT_USER: &str = r#"
    INSERT INTO usuarios (nombre, apellido, email, genero, pais, fecha_extraccion)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

const UPSERT_USER: &str = r#"
    INSERT OR REPLACE INTO usuarios (nombre, apellido, email, genero, pais, fecha_extraccion)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

/// Open (creating if missing) the SQLite database at `path`
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    ensure_parent_dir(path)?;

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    // A single connection: every stage is one sequential writer
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {:?}", path))?;

    debug!("Opened database {:?}", path);
    Ok(pool)
}

/// Drop and recreate the table; email is UNIQUE only in strict mode
pub async fn recreate_table(db: &SqlitePool, mode: IngestMode) -> Result<()> {
    let email_column = match mode {
        IngestMode::Strict => "email TEXT UNIQUE",
        IngestMode::Permissive => "email TEXT",
    };

    sqlx::query("DROP TABLE IF EXISTS usuarios")
        .execute(db)
        .await?;

    let create = format!(
        r#"
        CREATE TABLE usuarios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT,
            apellido TEXT,
            {},
            genero TEXT,
            pais TEXT,
            fecha_extraccion TEXT
        )
        "#,
        email_column
    );
    sqlx::query(&create).execute(db).await?;

    info!("Recreated table usuarios ({} mode)", mode);
    Ok(())
}

/// Write user records using the semantics of `mode`
pub async fn insert_users(
    db: &SqlitePool,
    records: &[UserRecord],
    mode: IngestMode,
) -> Result<WriteStats> {
    info!("Writing {} user records ({} mode)", records.len(), mode);

    let stats = match mode {
        IngestMode::Permissive => insert_permissive(db, records).await?,
        IngestMode::Strict => upsert_strict(db, records).await?,
    };

    info!("Write complete: {}", stats);
    Ok(stats)
}

/// Plain inserts; a failing row is logged and skipped
async fn insert_permissive(db: &SqlitePool, records: &[UserRecord]) -> Result<WriteStats> {
    let mut stats = WriteStats::default();
    let mut tx = db.begin().await?;

    for record in records {
        match insert_user(&mut tx, INSERT_USER, record).await {
            Ok(()) => stats.inserted += 1,
            Err(e) => {
                warn!("Failed to insert user {}: {}", record.email, e);
                stats.errors += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(stats)
}

/// Insert-or-replace on email, all or nothing
async fn upsert_strict(db: &SqlitePool, records: &[UserRecord]) -> Result<WriteStats> {
    let mut tx = db.begin().await?;

    match upsert_batch(&mut tx, records).await {
        Ok(stats) => {
            tx.commit().await?;
            Ok(stats)
        }
        Err(e) => {
            error!(
                "Upsert failed, rolling back batch of {} records: {}",
                records.len(),
                e
            );
            tx.rollback().await?;
            Err(e)
        }
    }
}

async fn upsert_batch(conn: &mut SqliteConnection, records: &[UserRecord]) -> Result<WriteStats> {
    let mut stats = WriteStats::default();

    for record in records {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM usuarios WHERE email = ?)",
        )
        .bind(&record.email)
        .fetch_one(&mut *conn)
        .await?;

        insert_user(conn, UPSERT_USER, record).await?;

        if exists {
            debug!("Replaced user {}", record.email);
            stats.replaced += 1;
        } else {
            stats.inserted += 1;
        }
    }

    Ok(stats)
}

async fn insert_user(conn: &mut SqliteConnection, sql: &str, record: &UserRecord) -> Result<()> {
    sqlx::query(sql)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(&record.gender)
        .bind(&record.country)
        .bind(&record.extracted_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Re-insert a stored row verbatim under a fresh id
pub async fn insert_row(conn: &mut SqliteConnection, row: &UserRow) -> Result<()> {
    sqlx::query(INSERT_USER)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.email)
        .bind(&row.gender)
        .bind(&row.country)
        .bind(&row.extracted_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Null the first name of the row with `id`
pub async fn null_first_name(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("UPDATE usuarios SET nombre = NULL WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// All rows ordered by id
pub async fn read_users(db: &SqlitePool) -> Result<Vec<UserRow>> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, nombre, apellido, email, genero, pais, fecha_extraccion
        FROM usuarios
        ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(rows)
}

/// Full table scan into a `Table`, columns in `USER_COLUMNS` order
pub async fn read_all(db: &SqlitePool) -> Result<Table> {
    let rows = read_users(db).await?;
    info!("Read {} rows from usuarios", rows.len());

    Ok(Table::new(
        USER_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows.into_iter().map(UserRow::into_cells).collect(),
    ))
}

/// Whether `usuarios` carries a unique index (the strict-mode email constraint)
pub async fn has_unique_email(db: &SqlitePool) -> Result<bool> {
    let unique = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM pragma_index_list('usuarios') WHERE "unique" = 1"#,
    )
    .fetch_one(db)
    .await?;
    Ok(unique > 0)
}

pub async fn count_users(db: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM usuarios")
        .fetch_one(db)
        .await?;
    Ok(count)
}


#[cfg(test)]
mod tests {
    use super::test_support::{memory_db, user, users};
    use super::*;
    use tempfile::tempdir;

    async fn reject_email_trigger(db: &SqlitePool, email: &str) {
        let sql = format!(
            "CREATE TRIGGER reject_email BEFORE INSERT ON usuarios \
             WHEN NEW.email = '{}' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
            email
        );
        sqlx::query(&sql).execute(db).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_then_read_keeps_cardinality() {
        let db = memory_db().await;
        recreate_table(&db, IngestMode::Permissive).await.unwrap();

        let stats = insert_users(&db, &users(25), IngestMode::Permissive).await.unwrap();
        let table = read_all(&db).await.unwrap();

        assert_eq!(stats.inserted, 25);
        assert_eq!(table.row_count(), 25);
        assert_eq!(table.columns, USER_COLUMNS.to_vec());
        assert_eq!(table.rows[0][1], Some("First0".to_string()));
        assert_eq!(table.rows[0][0], Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_permissive_allows_duplicate_emails() {
        let db = memory_db().await;
        recreate_table(&db, IngestMode::Permissive).await.unwrap();

        let batch = vec![user(1), user(1), user(2)];
        let stats = insert_users(&db, &batch, IngestMode::Permissive).await.unwrap();

        assert_eq!(stats.inserted, 3);
        assert_eq!(count_users(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_permissive_skips_failing_rows() {
        let db = memory_db().await;
        recreate_table(&db, IngestMode::Permissive).await.unwrap();
        reject_email_trigger(&db, "user2@example.com").await;

        let stats = insert_users(&db, &users(4), IngestMode::Permissive).await.unwrap();

        assert_eq!(stats.inserted, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(count_users(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_strict_upserts_on_email() {
        let db = memory_db().await;
        recreate_table(&db, IngestMode::Strict).await.unwrap();
        insert_users(&db, &users(3), IngestMode::Strict).await.unwrap();

        let mut changed = user(1);
        changed.country = "Canada".to_string();
        let stats = insert_users(&db, &[changed, user(3)], IngestMode::Strict)
            .await
            .unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.replaced, 1);

        let rows = read_users(&db).await.unwrap();
        assert_eq!(rows.len(), 4);
        let replaced = rows
            .iter()
            .find(|r| r.email.as_deref() == Some("user1@example.com"))
            .unwrap();
        assert_eq!(replaced.country.as_deref(), Some("Canada"));
    }

    #[tokio::test]
    async fn test_strict_rolls_back_whole_batch() {
        let db = memory_db().await;
        recreate_table(&db, IngestMode::Strict).await.unwrap();
        reject_email_trigger(&db, "user2@example.com").await;

        let result = insert_users(&db, &users(4), IngestMode::Strict).await;

        assert!(result.is_err());
        assert_eq!(count_users(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recreate_drops_previous_rows() {
        let db = memory_db().await;
        recreate_table(&db, IngestMode::Permissive).await.unwrap();
        insert_users(&db, &users(5), IngestMode::Permissive).await.unwrap();

        recreate_table(&db, IngestMode::Permissive).await.unwrap();

        assert_eq!(count_users(&db).await.unwrap(), 0);
        assert_eq!(read_all(&db).await.unwrap().columns.len(), 7);
    }

    #[tokio::test]
    async fn test_insert_row_and_null_first_name() {
        let db = memory_db().await;
        recreate_table(&db, IngestMode::Permissive).await.unwrap();
        insert_users(&db, &users(2), IngestMode::Permissive).await.unwrap();

        let original = read_users(&db).await.unwrap().remove(0);
        let mut conn = db.acquire().await.unwrap();
        insert_row(&mut conn, &original).await.unwrap();
        null_first_name(&mut conn, original.id).await.unwrap();
        drop(conn);

        let rows = read_users(&db).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].first_name, None);
        assert_eq!(rows[2].id, 3);
        assert_eq!(rows[2].first_name, Some("First0".to_string()));
        assert_eq!(rows[2].email, original.email);
    }

    #[tokio::test]
    async fn test_has_unique_email_follows_mode() {
        let db = memory_db().await;

        recreate_table(&db, IngestMode::Strict).await.unwrap();
        assert!(has_unique_email(&db).await.unwrap());

        recreate_table(&db, IngestMode::Permissive).await.unwrap();
        assert!(!has_unique_email(&db).await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db").join("user_data.db");

        let db = connect(&path).await.unwrap();
        recreate_table(&db, IngestMode::Permissive).await.unwrap();
        db.close().await;

        assert!(path.exists());
    }
}
