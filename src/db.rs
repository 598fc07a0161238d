// ==========================================
// 海运航次配载系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为,避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供幂等建表,供工具二进制与集成测试复用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明: 版本号用于提示/告警 (不做自动迁移),避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version (若表不存在则返回 None)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema (幂等)
///
/// 说明:
/// - 时间戳统一 RFC 3339 文本存储
/// - voyage_assignment 上的两条唯一索引即配载不变量:
///   (voyage_id, shipment_id) 防重复配载;
///   shipment_id 全表唯一 → 单票同一时刻至多一个在册航次
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS shipment (
            id TEXT PRIMARY KEY,
            shipment_code TEXT NOT NULL UNIQUE,
            origin TEXT NOT NULL,
            destination TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'CREATED',
            is_priority INTEGER NOT NULL DEFAULT 0,
            ship_date TEXT,
            transit_days INTEGER NOT NULL DEFAULT 0,
            weight_t REAL,
            volume_m3 REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_shipment_status ON shipment(status);
        CREATE INDEX IF NOT EXISTS idx_shipment_lane ON shipment(origin, destination);

        CREATE TABLE IF NOT EXISTS voyage (
            id TEXT PRIMARY KEY,
            voyage_code TEXT NOT NULL UNIQUE,
            vessel_name TEXT NOT NULL,
            origin TEXT NOT NULL,
            destination TEXT NOT NULL,
            depart_at TEXT,
            arrive_by TEXT,
            weight_cap_t REAL,
            volume_cap_m3 REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_voyage_lane ON voyage(origin, destination);
        CREATE INDEX IF NOT EXISTS idx_voyage_depart ON voyage(depart_at);

        CREATE TABLE IF NOT EXISTS voyage_assignment (
            id TEXT PRIMARY KEY,
            voyage_id TEXT NOT NULL REFERENCES voyage(id) ON DELETE CASCADE,
            shipment_id TEXT NOT NULL REFERENCES shipment(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            UNIQUE(voyage_id, shipment_id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_assignment_single_active
            ON voyage_assignment(shipment_id);
        CREATE INDEX IF NOT EXISTS idx_assignment_voyage
            ON voyage_assignment(voyage_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
