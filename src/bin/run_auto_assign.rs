// Small dev utility: run one committing auto-assign pass against a database.
//
// Usage:
//   cargo run --bin run_auto_assign -- [db_path]
//
// This is intentionally lightweight and does not start any web layer.

use std::sync::{Arc, Mutex};
use voyage_assign::api::PlanApi;
use voyage_assign::config::ConfigManager;
use voyage_assign::db::{init_schema, open_sqlite_connection};
use voyage_assign::repository::SqliteAssignmentStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    voyage_assign::logging::init();

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(default_db_path);

    tracing::info!("使用数据库: {}", db_path);

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let store = Arc::new(SqliteAssignmentStore::from_connection(conn.clone()));
    let config = Arc::new(ConfigManager::from_connection(conn)?);

    // 工具二进制不接外部建议服务,批量运行跳过提示阶段
    let plan_api = PlanApi::new(store, config, None);
    let result = plan_api.auto_assign().await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn default_db_path() -> String {
    if let Some(dir) = dirs::data_dir() {
        let app_dir = dir.join("voyage-assign");
        if std::fs::create_dir_all(&app_dir).is_ok() {
            return app_dir
                .join("voyage_assign.db")
                .to_string_lossy()
                .to_string();
        }
    }
    "voyage_assign.db".to_string()
}
