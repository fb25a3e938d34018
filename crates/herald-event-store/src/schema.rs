//! Event store database schema.

use sqlx::migrate::Migrator;

/// Embedded migrations creating the `stored_events` table and its
/// `created_at` index, used by `find_since` and retention sweeps.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
