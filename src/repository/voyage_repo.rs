// ==========================================
// 海运航次配载系统 - 航次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: 航次占用永远由在册配载现算,不在实体上维护累计值
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::ledger::VoyageLoad;
use crate::domain::voyage::{AssignedCargo, Voyage, VoyageWithAssignments};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{parse_audit_timestamp, parse_timestamp_lenient};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// VoyageRepository - 航次仓储
// ==========================================

/// 航次仓储
/// 职责: 管理 voyage 表的 CRUD,以及面向台账构建的联合查询
pub struct VoyageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VoyageRepository {
    /// 创建新的航次仓储实例
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

    /// 插入航次
    pub fn insert(&self, voyage: &Voyage) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO voyage (
                id, voyage_code, vessel_name, origin, destination,
                depart_at, arrive_by, weight_cap_t, volume_cap_m3, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                voyage.id,
                voyage.voyage_code,
                voyage.vessel_name,
                voyage.origin,
                voyage.destination,
                voyage.depart_at.map(|t| t.to_rfc3339()),
                voyage.arrive_by.map(|t| t.to_rfc3339()),
                voyage.weight_cap_t,
                voyage.volume_cap_m3,
                voyage.created_at.to_rfc3339(),
                voyage.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按航次号查询 (忽略大小写)
    pub fn find_by_code(&self, voyage_code: &str) -> RepositoryResult<Option<Voyage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE voyage_code = ?1 COLLATE NOCASE",
            SELECT_VOYAGE
        ))?;
        let voyage = stmt
            .query_row(params![voyage_code], map_voyage_row)
            .optional()?;
        Ok(voyage)
    }

    /// 按行标识查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Voyage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_VOYAGE))?;
        let voyage = stmt.query_row(params![id], map_voyage_row).optional()?;
        Ok(voyage)
    }

    /// 列出航次及其在册配载 (离港时间升序,限量)
    ///
    /// 在册货载用一趟联合查询取回再按航次归组,避免逐航次 N+1 查询。
    pub fn list_with_assignments(
        &self,
        limit: u32,
    ) -> RepositoryResult<Vec<VoyageWithAssignments>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY depart_at IS NULL, depart_at ASC, voyage_code ASC LIMIT ?1",
            SELECT_VOYAGE
        ))?;
        let voyages = stmt
            .query_map(params![limit], map_voyage_row)?
            .collect::<SqliteResult<Vec<Voyage>>>()?;

        let mut cargo_by_voyage: HashMap<String, Vec<AssignedCargo>> = HashMap::new();
        let mut cargo_stmt = conn.prepare(
            r#"
            SELECT a.voyage_id, a.shipment_id, s.weight_t, s.volume_m3
            FROM voyage_assignment a
            JOIN shipment s ON s.id = a.shipment_id
            "#,
        )?;
        let rows = cargo_stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                AssignedCargo {
                    shipment_id: row.get(1)?,
                    weight_t: row.get(2)?,
                    volume_m3: row.get(3)?,
                },
            ))
        })?;
        for row in rows {
            let (voyage_id, cargo) = row?;
            cargo_by_voyage.entry(voyage_id).or_default().push(cargo);
        }

        Ok(voyages
            .into_iter()
            .map(|voyage| {
                let cargo = cargo_by_voyage.remove(&voyage.id).unwrap_or_default();
                VoyageWithAssignments { voyage, cargo }
            })
            .collect())
    }

    /// 列出匹配航线且按时离港的航次 (供单票建议)
    ///
    /// # 参数
    /// - origin/destination: 航线 (忽略大小写/首尾空白)
    /// - depart_on_or_after: 离港时间下限 (None 不过滤)
    /// - limit: 返回上限
    pub fn list_lane_voyages(
        &self,
        origin: &str,
        destination: &str,
        depart_on_or_after: Option<DateTime<Utc>>,
        limit: u32,
    ) -> RepositoryResult<Vec<Voyage>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            {}
            WHERE LOWER(TRIM(origin)) = LOWER(TRIM(?1))
              AND LOWER(TRIM(destination)) = LOWER(TRIM(?2))
              AND (?3 IS NULL OR (depart_at IS NOT NULL AND depart_at >= ?3))
            ORDER BY depart_at IS NULL, depart_at ASC, voyage_code ASC
            LIMIT ?4
            "#,
            SELECT_VOYAGE
        );
        let mut stmt = conn.prepare(&sql)?;
        let voyages = stmt
            .query_map(
                params![
                    origin,
                    destination,
                    depart_on_or_after.map(|t| t.to_rfc3339()),
                    limit
                ],
                map_voyage_row,
            )?
            .collect::<SqliteResult<Vec<Voyage>>>()?;
        Ok(voyages)
    }

    /// 现算单航次的占用/余量
    ///
    /// # 返回
    /// - Ok(Some(VoyageLoad)): 航次存在
    /// - Ok(None): 航次不存在
    pub fn load_for_voyage(&self, voyage_id: &str) -> RepositoryResult<Option<VoyageLoad>> {
        let Some(voyage) = self.find_by_id(voyage_id)? else {
            return Ok(None);
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.weight_t, s.volume_m3
            FROM voyage_assignment a
            JOIN shipment s ON s.id = a.shipment_id
            WHERE a.voyage_id = ?1
            "#,
        )?;
        let cargo = stmt
            .query_map(params![voyage_id], |row| {
                Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, Option<f64>>(1)?))
            })?
            .collect::<SqliteResult<Vec<(Option<f64>, Option<f64>)>>>()?;

        let mut load = VoyageLoad::for_voyage(&voyage);
        for (weight_t, volume_m3) in cargo {
            load.add_cargo(sanitize(weight_t), sanitize(volume_m3));
        }
        Ok(Some(load))
    }
}

/// 在册货载字段的空值处理 (与引擎有效载量口径一致)
fn sanitize(value: Option<f64>) -> f64 {
    let v = value.unwrap_or(0.0);
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

// ==========================================
// 行映射
// ==========================================

const SELECT_VOYAGE: &str = r#"
    SELECT
        id, voyage_code, vessel_name, origin, destination,
        depart_at, arrive_by, weight_cap_t, volume_cap_m3, created_at, updated_at
    FROM voyage
"#;

fn map_voyage_row(row: &Row<'_>) -> SqliteResult<Voyage> {
    let id: String = row.get(0)?;
    Ok(Voyage {
        voyage_code: row.get(1)?,
        vessel_name: row.get(2)?,
        origin: row.get(3)?,
        destination: row.get(4)?,
        depart_at: parse_timestamp_lenient(row.get(5)?, "voyage", "depart_at", &id),
        arrive_by: parse_timestamp_lenient(row.get(6)?, "voyage", "arrive_by", &id),
        weight_cap_t: row.get(7)?,
        volume_cap_m3: row.get(8)?,
        created_at: parse_audit_timestamp(row.get(9)?, "voyage", "created_at", &id),
        updated_at: parse_audit_timestamp(row.get(10)?, "voyage", "updated_at", &id),
        id,
    })
}
