// ==========================================
// 海运航次配载系统 - 引擎层数据访问接口
// ==========================================
// 职责: 定义批量配载引擎所需的数据访问 trait,实现依赖倒置
// 说明: Engine 层定义 trait,Repository 层实现适配器
// 红线: 引擎不拼 SQL,不感知存储细节
// ==========================================

use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use crate::domain::voyage::{VoyageAssignment, VoyageWithAssignments};
use crate::repository::error::RepositoryResult;

/// 配载引擎的数据访问集合 (数据访问协作方)
///
/// # 实现说明
/// - `repository::store::SqliteAssignmentStore` 为生产实现
/// - 集成测试可注入内存实现验证引擎行为
pub trait AssignmentStore: Send + Sync {
    /// 列出未配载运单 (按状态过滤,优先级降序、起运日期升序,限量)
    fn list_unassigned_shipments(
        &self,
        statuses: &[ShipmentStatus],
        limit: u32,
    ) -> RepositoryResult<Vec<Shipment>>;

    /// 列出航次及其在册配载 (离港时间升序,限量),供台账构建
    fn list_voyages_with_assignments(
        &self,
        limit: u32,
    ) -> RepositoryResult<Vec<VoyageWithAssignments>>;

    /// 创建配载 (原子移动语义)
    ///
    /// 同一事务内先删除该运单已有配载,再插入新配载;
    /// 过程中不可观测到"无配载"的中间态
    fn create_assignment(
        &self,
        shipment_id: &str,
        voyage_id: &str,
    ) -> RepositoryResult<VoyageAssignment>;

    /// 删除配载
    ///
    /// # 返回
    /// - Ok(true): 删除了一条记录
    /// - Ok(false): 记录不存在
    fn delete_assignment(&self, voyage_id: &str, shipment_id: &str) -> RepositoryResult<bool>;
}
