// ==========================================
// 海运航次配载系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::assign_config_trait::AssignConfigReader;
use crate::db::configure_sqlite_connection;
use crate::db::open_sqlite_connection;
use crate::domain::types::ScoringMode;
use crate::engine::feasibility::DEFAULT_DEPART_SLACK_HOURS;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键与默认值
// ==========================================

pub const KEY_DEPART_SLACK_HOURS: &str = "assign/depart_slack_hours";
pub const KEY_MAX_BATCH_SHIPMENTS: &str = "assign/max_batch_shipments";
pub const KEY_MAX_CANDIDATE_VOYAGES: &str = "assign/max_candidate_voyages";
pub const KEY_SCORING_MODE: &str = "assign/scoring_mode";
pub const KEY_SNAPSHOT_TTL_SECONDS: &str = "assign/snapshot_ttl_seconds";

pub const DEFAULT_MAX_BATCH_SHIPMENTS: u32 = 500;
pub const DEFAULT_MAX_CANDIDATE_VOYAGES: u32 = 200;
pub const DEFAULT_SNAPSHOT_TTL_SECONDS: i64 = 300;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 为保证连接行为一致,会对传入连接再次应用统一 PRAGMA (幂等)。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值 (公开方法,供其他模块复用)
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (upsert)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值,带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配载配置的快照 (JSON 格式)
    ///
    /// # 用途
    /// - 批量运行留痕时记录当时生效的配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' AND key LIKE 'assign/%' ORDER BY key",
        )?;
        let mut values: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            values.insert(key, value);
        }

        Ok(json!(values).to_string())
    }
}

// ==========================================
// AssignConfigReader trait 实现
// ==========================================
#[async_trait]
impl AssignConfigReader for ConfigManager {
    async fn get_depart_slack_hours(&self) -> Result<i64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            KEY_DEPART_SLACK_HOURS,
            &DEFAULT_DEPART_SLACK_HOURS.to_string(),
        )?;
        Ok(raw.parse::<i64>().unwrap_or(DEFAULT_DEPART_SLACK_HOURS))
    }

    async fn get_max_batch_shipments(&self) -> Result<u32, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            KEY_MAX_BATCH_SHIPMENTS,
            &DEFAULT_MAX_BATCH_SHIPMENTS.to_string(),
        )?;
        Ok(raw.parse::<u32>().unwrap_or(DEFAULT_MAX_BATCH_SHIPMENTS))
    }

    async fn get_max_candidate_voyages(&self) -> Result<u32, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            KEY_MAX_CANDIDATE_VOYAGES,
            &DEFAULT_MAX_CANDIDATE_VOYAGES.to_string(),
        )?;
        Ok(raw.parse::<u32>().unwrap_or(DEFAULT_MAX_CANDIDATE_VOYAGES))
    }

    async fn get_scoring_mode(&self) -> Result<ScoringMode, Box<dyn Error>> {
        let raw = self.get_config_or_default(KEY_SCORING_MODE, "SPREAD_LOAD")?;
        Ok(ScoringMode::from_str(&raw))
    }

    async fn get_snapshot_ttl_seconds(&self) -> Result<i64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            KEY_SNAPSHOT_TTL_SECONDS,
            &DEFAULT_SNAPSHOT_TTL_SECONDS.to_string(),
        )?;
        Ok(raw.parse::<i64>().unwrap_or(DEFAULT_SNAPSHOT_TTL_SECONDS))
    }
}
