// ==========================================
// 海运航次配载系统 - 引擎层
// ==========================================
// 职责: 实现配载业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod advisor;
pub mod assigner;
pub mod auto_assign;
pub mod feasibility;
pub mod planner;
pub mod repositories;
pub mod scoring;
pub mod suggestion;

// 重导出核心引擎
pub use advisor::{
    fallback_hint, AdvisorError, AdvisoryCandidate, AdvisoryContext, AdvisoryShipment,
    NoOpAdvisor, RouteAdvisor,
};
pub use assigner::{AssignmentDecision, ShipmentAssigner};
pub use auto_assign::{AssignedPair, AutoAssignEngine, AutoAssignLimits, BatchAssignResult};
pub use feasibility::{FeasibilityChecker, DEFAULT_DEPART_SLACK_HOURS};
pub use planner::{LoadPlan, LoadPlanner, PlanFilters, SkippedShipment, Utilization, VesselProfile};
pub use repositories::AssignmentStore;
pub use scoring::{CandidateVoyage, ScoringPolicy, PRIORITY_BONUS};
pub use suggestion::{
    AcceptedSuggestion, ProposedAssignment, RejectedSuggestion, SuggestionGate,
    VerifiedSuggestions,
};
