/// Database layer
///
/// - `pool`: Postgres connection pool with a health check
/// - `migrations`: embedded schema migrations
///
/// Models keep their SQL next to their types in `crate::models`.

pub mod migrations;
pub mod pool;
