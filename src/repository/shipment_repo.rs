// ==========================================
// 海运航次配载系统 - 运单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{parse_audit_timestamp, parse_timestamp_lenient};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ShipmentRepository - 运单仓储
// ==========================================

/// 运单仓储
/// 职责: 管理 shipment 表的 CRUD 操作
pub struct ShipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentRepository {
    /// 创建新的运单仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 插入运单
    pub fn insert(&self, shipment: &Shipment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shipment (
                id, shipment_code, origin, destination, status, is_priority,
                ship_date, transit_days, weight_t, volume_m3, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                shipment.id,
                shipment.shipment_code,
                shipment.origin,
                shipment.destination,
                shipment.status.to_db_str(),
                shipment.is_priority as i32,
                shipment.ship_date.map(|t| t.to_rfc3339()),
                shipment.transit_days,
                shipment.weight_t,
                shipment.volume_m3,
                shipment.created_at.to_rfc3339(),
                shipment.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 更新运单状态
    ///
    /// # 返回
    /// - Ok(true): 更新了一条记录
    /// - Ok(false): 运单不存在
    pub fn update_status(
        &self,
        shipment_code: &str,
        status: ShipmentStatus,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE shipment
            SET status = ?1, updated_at = ?2
            WHERE shipment_code = ?3 COLLATE NOCASE
            "#,
            params![status.to_db_str(), Utc::now().to_rfc3339(), shipment_code],
        )?;
        Ok(affected > 0)
    }

    /// 删除运单 (在册配载随外键级联删除;历史事件成为孤儿,本域可接受)
    pub fn delete(&self, shipment_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM shipment WHERE shipment_code = ?1 COLLATE NOCASE",
            params![shipment_code],
        )?;
        Ok(affected > 0)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按运单号查询 (忽略大小写)
    pub fn find_by_code(&self, shipment_code: &str) -> RepositoryResult<Option<Shipment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE shipment_code = ?1 COLLATE NOCASE",
            SELECT_SHIPMENT
        ))?;
        let shipment = stmt
            .query_row(params![shipment_code], map_shipment_row)
            .optional()?;
        Ok(shipment)
    }

    /// 按行标识查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Shipment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_SHIPMENT))?;
        let shipment = stmt.query_row(params![id], map_shipment_row).optional()?;
        Ok(shipment)
    }

    /// 列出未配载运单
    ///
    /// 过滤: 状态在指定集合内,且无在册配载。
    /// 排序: 优先级降序,起运日期升序 (缺失排最后),运单号兜底。
    ///
    /// # 参数
    /// - statuses: 允许的状态集合 (空集返回空列表)
    /// - limit: 单次返回上限 (约束单次批量运行的工作量)
    pub fn list_unassigned(
        &self,
        statuses: &[ShipmentStatus],
        limit: u32,
    ) -> RepositoryResult<Vec<Shipment>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            r#"
            {} AS s
            WHERE s.status IN ({})
              AND NOT EXISTS (
                  SELECT 1 FROM voyage_assignment a WHERE a.shipment_id = s.id
              )
            ORDER BY s.is_priority DESC, s.ship_date IS NULL, s.ship_date ASC, s.shipment_code ASC
            LIMIT ?
            "#,
            SELECT_SHIPMENT, placeholders
        );

        let mut values: Vec<Value> = statuses
            .iter()
            .map(|s| Value::Text(s.to_db_str().to_string()))
            .collect();
        values.push(Value::Integer(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(params_from_iter(values), map_shipment_row)?
            .collect::<SqliteResult<Vec<Shipment>>>()?;
        Ok(shipments)
    }

    /// 列出全部运单 (限量)
    pub fn list_all(&self, limit: u32) -> RepositoryResult<Vec<Shipment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC LIMIT ?1",
            SELECT_SHIPMENT
        ))?;
        let shipments = stmt
            .query_map(params![limit], map_shipment_row)?
            .collect::<SqliteResult<Vec<Shipment>>>()?;
        Ok(shipments)
    }

    /// 列出某航次的补位候选运单
    ///
    /// 过滤: 航线匹配 (忽略大小写/首尾空白)、状态可配载、
    ///       起运日期不晚于离港时间、未在该航次在册。
    /// 排序: 优先级降序,起运日期升序。
    pub fn list_lane_candidates(
        &self,
        origin: &str,
        destination: &str,
        ship_on_or_before: Option<DateTime<Utc>>,
        exclude_voyage_id: &str,
        limit: u32,
    ) -> RepositoryResult<Vec<Shipment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            {} AS s
            WHERE LOWER(TRIM(s.origin)) = LOWER(TRIM(?1))
              AND LOWER(TRIM(s.destination)) = LOWER(TRIM(?2))
              AND s.status IN ('CREATED', 'IN_TRANSIT')
              AND (?3 IS NULL OR (s.ship_date IS NOT NULL AND s.ship_date <= ?3))
              AND NOT EXISTS (
                  SELECT 1 FROM voyage_assignment a
                  WHERE a.shipment_id = s.id AND a.voyage_id = ?4
              )
            ORDER BY s.is_priority DESC, s.ship_date IS NULL, s.ship_date ASC, s.shipment_code ASC
            LIMIT ?5
            "#,
            SELECT_SHIPMENT
        );

        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(
                params![
                    origin,
                    destination,
                    ship_on_or_before.map(|t| t.to_rfc3339()),
                    exclude_voyage_id,
                    limit
                ],
                map_shipment_row,
            )?
            .collect::<SqliteResult<Vec<Shipment>>>()?;
        Ok(shipments)
    }
}

// ==========================================
// 行映射
// ==========================================

const SELECT_SHIPMENT: &str = r#"
    SELECT
        id, shipment_code, origin, destination, status, is_priority,
        ship_date, transit_days, weight_t, volume_m3, created_at, updated_at
    FROM shipment
"#;

fn map_shipment_row(row: &Row<'_>) -> SqliteResult<Shipment> {
    let id: String = row.get(0)?;
    Ok(Shipment {
        shipment_code: row.get(1)?,
        origin: row.get(2)?,
        destination: row.get(3)?,
        status: ShipmentStatus::from_str(&row.get::<_, String>(4)?),
        is_priority: row.get::<_, i64>(5)? != 0,
        ship_date: parse_timestamp_lenient(row.get(6)?, "shipment", "ship_date", &id),
        transit_days: row.get(7)?,
        weight_t: row.get(8)?,
        volume_m3: row.get(9)?,
        created_at: parse_audit_timestamp(row.get(10)?, "shipment", "created_at", &id),
        updated_at: parse_audit_timestamp(row.get(11)?, "shipment", "updated_at", &id),
        id,
    })
}
