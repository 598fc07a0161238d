// ==========================================
// 海运航次配载系统 - 配置层
// ==========================================
// 职责: 配置读取接口与 config_kv 存储实现
// ==========================================

pub mod assign_config_trait;
pub mod config_manager;

pub use assign_config_trait::AssignConfigReader;
pub use config_manager::{
    ConfigManager, DEFAULT_MAX_BATCH_SHIPMENTS, DEFAULT_MAX_CANDIDATE_VOYAGES,
    DEFAULT_SNAPSHOT_TTL_SECONDS, KEY_DEPART_SLACK_HOURS, KEY_MAX_BATCH_SHIPMENTS,
    KEY_MAX_CANDIDATE_VOYAGES, KEY_SCORING_MODE, KEY_SNAPSHOT_TTL_SECONDS,
};
