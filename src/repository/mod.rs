// ==========================================
// 海运航次配载系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod assignment_repo;
pub mod error;
pub mod shipment_repo;
pub mod store;
pub mod voyage_repo;

// 重导出核心仓储
pub use assignment_repo::AssignmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use shipment_repo::ShipmentRepository;
pub use store::SqliteAssignmentStore;
pub use voyage_repo::VoyageRepository;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

/// 宽容解析时间戳文本
///
/// 依次尝试 RFC 3339、"%Y-%m-%d %H:%M:%S"、"%Y-%m-%d" (按零点补齐);
/// 均失败时告警一次并返回 None,脏数据绝不让读取崩溃;
/// 缺失语义交由引擎按 STRICT/ADVISORY 模式处理。
pub(crate) fn parse_timestamp_lenient(
    raw: Option<String>,
    entity: &str,
    field: &str,
    id: &str,
) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(DateTime::from_naive_utc_and_offset(
            date.and_hms_opt(0, 0, 0).expect("midnight is valid"),
            Utc,
        ));
    }

    warn!(
        entity = entity,
        field = field,
        id = id,
        raw = trimmed,
        "时间戳无法解析,按缺失处理"
    );
    None
}

/// 审计时间戳解析 (NOT NULL 列,解析失败回落到 Unix 纪元)
pub(crate) fn parse_audit_timestamp(raw: String, entity: &str, field: &str, id: &str) -> DateTime<Utc> {
    parse_timestamp_lenient(Some(raw), entity, field, id).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
