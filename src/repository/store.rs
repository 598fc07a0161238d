// ==========================================
// 海运航次配载系统 - 引擎数据访问适配器
// ==========================================
// 职责: 聚合配载引擎所需的全部 Repository,
//       实现 engine 层定义的 AssignmentStore trait
// ==========================================

use crate::domain::ledger::{CapacityLedger, LedgerSnapshot};
use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use crate::domain::voyage::{Voyage, VoyageAssignment, VoyageWithAssignments};
use crate::engine::repositories::AssignmentStore;
use crate::repository::assignment_repo::AssignmentRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::shipment_repo::ShipmentRepository;
use crate::repository::voyage_repo::VoyageRepository;
use chrono::Utc;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// SqliteAssignmentStore - 生产实现
// ==========================================

/// 配载引擎仓储集合
///
/// 聚合引擎所需的三个 Repository,简化依赖注入;
/// 同时持有台账快照的时效契约 (快照由数据访问层构建并打时戳)。
#[derive(Clone)]
pub struct SqliteAssignmentStore {
    shipment_repo: Arc<ShipmentRepository>,
    voyage_repo: Arc<VoyageRepository>,
    assignment_repo: Arc<AssignmentRepository>,
}

impl SqliteAssignmentStore {
    /// 创建新的仓储集合
    pub fn new(
        shipment_repo: Arc<ShipmentRepository>,
        voyage_repo: Arc<VoyageRepository>,
        assignment_repo: Arc<AssignmentRepository>,
    ) -> Self {
        Self {
            shipment_repo,
            voyage_repo,
            assignment_repo,
        }
    }

    /// 从共享连接创建仓储集合 (三个仓储共用同一连接)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            shipment_repo: Arc::new(ShipmentRepository::from_connection(conn.clone())),
            voyage_repo: Arc::new(VoyageRepository::from_connection(conn.clone())),
            assignment_repo: Arc::new(AssignmentRepository::from_connection(conn)),
        }
    }

    /// 获取运单仓储
    pub fn shipment_repo(&self) -> &Arc<ShipmentRepository> {
        &self.shipment_repo
    }

    /// 获取航次仓储
    pub fn voyage_repo(&self) -> &Arc<VoyageRepository> {
        &self.voyage_repo
    }

    /// 获取配载关系仓储
    pub fn assignment_repo(&self) -> &Arc<AssignmentRepository> {
        &self.assignment_repo
    }

    /// 构建带时效的容量台账快照
    ///
    /// 显式作用域的快照对象取代隐式全局缓存:
    /// 调用方把快照传入单次规划运行,过期由 `is_expired` 显式判定;
    /// 时效契约由数据访问层持有 (此处打时戳)。
    ///
    /// # 返回
    /// (快照覆盖的航次集合, 台账快照)
    pub fn build_ledger_snapshot(
        &self,
        max_voyages: u32,
        ttl_seconds: i64,
    ) -> RepositoryResult<(Vec<Voyage>, LedgerSnapshot)> {
        let voyages_with = self.voyage_repo.list_with_assignments(max_voyages)?;
        let snapshot = LedgerSnapshot::new(
            CapacityLedger::build(&voyages_with),
            Utc::now(),
            ttl_seconds,
        );
        let voyages = voyages_with.into_iter().map(|v| v.voyage).collect();
        Ok((voyages, snapshot))
    }
}

// ==========================================
// AssignmentStore trait 实现
// ==========================================
impl AssignmentStore for SqliteAssignmentStore {
    fn list_unassigned_shipments(
        &self,
        statuses: &[ShipmentStatus],
        limit: u32,
    ) -> RepositoryResult<Vec<Shipment>> {
        self.shipment_repo.list_unassigned(statuses, limit)
    }

    fn list_voyages_with_assignments(
        &self,
        limit: u32,
    ) -> RepositoryResult<Vec<VoyageWithAssignments>> {
        self.voyage_repo.list_with_assignments(limit)
    }

    fn create_assignment(
        &self,
        shipment_id: &str,
        voyage_id: &str,
    ) -> RepositoryResult<VoyageAssignment> {
        self.assignment_repo.create_move(shipment_id, voyage_id)
    }

    fn delete_assignment(&self, voyage_id: &str, shipment_id: &str) -> RepositoryResult<bool> {
        self.assignment_repo.delete(voyage_id, shipment_id)
    }
}
