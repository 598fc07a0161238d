// ==========================================
// 海运航次配载系统 - API 层
// ==========================================
// 职责: 面向外层 (Web 处理器) 的操作接口与错误转换
// 红线: 本层只编排引擎与仓储,不实现配载规则
// ==========================================

pub mod assignment_api;
pub mod error;
pub mod plan_api;

pub use assignment_api::{
    AssignOutcome, AssignmentApi, NewShipment, NewVoyage, ShipmentPick, VoyageFillSuggestion,
    VoyageSuggestion,
};
pub use error::{ApiError, ApiResult};
pub use plan_api::{
    CapacityOverview, PlanApi, RejectedProposal, SuggestionApplyResult, VoyageCapacityView,
};
