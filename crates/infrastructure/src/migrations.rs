use sqlx::migrate::Migrator;

/// 内嵌的数据库迁移，目录位于仓库根目录 `migrations/`
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
