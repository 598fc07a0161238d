// ==========================================
// 海运航次配载系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、容量约束接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod ledger;
pub mod shipment;
pub mod types;
pub mod voyage;

// 重导出核心类型
pub use ledger::{CapacityHeadroom, CapacityLedger, LedgerSnapshot, VoyageLoad};
pub use shipment::Shipment;
pub use types::{DominantDimension, ScoringMode, ShipmentStatus, SkipReason, TimeFitMode};
pub use voyage::{AssignedCargo, Voyage, VoyageAssignment, VoyageWithAssignments};
