// ==========================================
// 海运航次配载系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 货载分配决策引擎 (由外层 Web 处理器调用)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 配载规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施 (连接初始化/PRAGMA 统一)
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CapacityHeadroom, CapacityLedger, DominantDimension, LedgerSnapshot, ScoringMode, Shipment,
    ShipmentStatus, SkipReason, TimeFitMode, Voyage, VoyageAssignment, VoyageLoad,
    VoyageWithAssignments,
};

// 引擎
pub use engine::{
    AssignmentStore, AutoAssignEngine, AutoAssignLimits, BatchAssignResult, FeasibilityChecker,
    LoadPlan, LoadPlanner, NoOpAdvisor, PlanFilters, RouteAdvisor, ScoringPolicy,
    ShipmentAssigner, SuggestionGate, VesselProfile,
};

// API
pub use api::{ApiError, ApiResult, AssignmentApi, PlanApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "海运航次配载系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================
