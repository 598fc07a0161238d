// ==========================================
// 海运航次配载系统 - 配载关系数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: "换船"走移动语义 (同一事务内删旧插新),
//       过程中不可观测到"无配载"的中间态
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::voyage::VoyageAssignment;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::parse_audit_timestamp;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// AssignmentRepository - 配载关系仓储
// ==========================================

/// 配载关系仓储
/// 职责: 管理 voyage_assignment 表,承载原子移动语义
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    /// 创建新的配载关系仓储实例
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

    /// 创建配载 (原子移动语义)
    ///
    /// 同一事务内: 先删除该运单已有配载 (若有),再插入新配载。
    /// 事务失败整体回滚,绝不留下"已删未插"的中间态。
    ///
    /// # 参数
    /// - shipment_id: 运单行标识
    /// - voyage_id: 目标航次行标识
    ///
    /// # 返回
    /// - Ok(VoyageAssignment): 新的配载记录
    /// - Err: 事务失败 (外键/唯一约束等)
    pub fn create_move(
        &self,
        shipment_id: &str,
        voyage_id: &str,
    ) -> RepositoryResult<VoyageAssignment> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "DELETE FROM voyage_assignment WHERE shipment_id = ?1",
            params![shipment_id],
        )?;

        let record = VoyageAssignment {
            id: Uuid::new_v4().to_string(),
            voyage_id: voyage_id.to_string(),
            shipment_id: shipment_id.to_string(),
            created_at: Utc::now(),
        };
        tx.execute(
            r#"
            INSERT INTO voyage_assignment (id, voyage_id, shipment_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.id,
                record.voyage_id,
                record.shipment_id,
                record.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(record)
    }

    /// 删除配载 (显式解除)
    ///
    /// # 返回
    /// - Ok(true): 删除了一条记录
    /// - Ok(false): 记录不存在
    pub fn delete(&self, voyage_id: &str, shipment_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM voyage_assignment WHERE voyage_id = ?1 AND shipment_id = ?2",
            params![voyage_id, shipment_id],
        )?;
        Ok(affected > 0)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询某运单的在册配载 (不变量: 至多一条)
    pub fn find_by_shipment(
        &self,
        shipment_id: &str,
    ) -> RepositoryResult<Option<VoyageAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE shipment_id = ?1",
            SELECT_ASSIGNMENT
        ))?;
        let assignment = stmt
            .query_row(params![shipment_id], map_assignment_row)
            .optional()?;
        Ok(assignment)
    }

    /// 列出某航次的在册配载
    pub fn list_by_voyage(&self, voyage_id: &str) -> RepositoryResult<Vec<VoyageAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE voyage_id = ?1 ORDER BY created_at ASC",
            SELECT_ASSIGNMENT
        ))?;
        let assignments = stmt
            .query_map(params![voyage_id], map_assignment_row)?
            .collect::<SqliteResult<Vec<VoyageAssignment>>>()?;
        Ok(assignments)
    }

    /// 统计某航次的在册配载票数
    pub fn count_by_voyage(&self, voyage_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM voyage_assignment WHERE voyage_id = ?1",
            params![voyage_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

// ==========================================
// 行映射
// ==========================================

const SELECT_ASSIGNMENT: &str = r#"
    SELECT id, voyage_id, shipment_id, created_at
    FROM voyage_assignment
"#;

fn map_assignment_row(row: &Row<'_>) -> SqliteResult<VoyageAssignment> {
    let id: String = row.get(0)?;
    Ok(VoyageAssignment {
        voyage_id: row.get(1)?,
        shipment_id: row.get(2)?,
        created_at: parse_audit_timestamp(row.get(3)?, "voyage_assignment", "created_at", &id),
        id,
    })
}
