use std::sync::{OnceLock, RwLock};

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr};

struct SharedDb {
    dsn: String,
    connection: DatabaseConnection,
}

static SHARED_DB: OnceLock<RwLock<Option<SharedDb>>> = OnceLock::new();

/// Connects once per process per DSN and hands out clones of the pooled
/// connection afterwards, so admin-surface writers and the gateway's own
/// bootstrap path never open a second pool against the same database.
pub async fn connect_shared(dsn: &str) -> Result<DatabaseConnection, DbErr> {
    let lock = SHARED_DB.get_or_init(|| RwLock::new(None));
    if let Ok(guard) = lock.read()
        && let Some(shared) = guard.as_ref()
        && shared.dsn == dsn
    {
        return Ok(shared.connection.clone());
    }

    let connection = Database::connect(dsn).await?;
    if connection.get_database_backend() == DatabaseBackend::Sqlite {
        connection
            .execute_unprepared("PRAGMA foreign_keys = ON")
            .await?;
    }
    if let Ok(mut guard) = lock.write() {
        *guard = Some(SharedDb {
            dsn: dsn.to_string(),
            connection: connection.clone(),
        });
    }
    Ok(connection)
}
