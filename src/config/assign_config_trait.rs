// ==========================================
// 海运航次配载系统 - 配载配置读取接口
// ==========================================
// 职责: 定义引擎/API 所需配置项的读取 trait
// 说明: 引擎只依赖 trait,不感知配置存储方式;
//       集成测试可注入 Mock 实现
// ==========================================

use crate::domain::types::ScoringMode;
use async_trait::async_trait;
use std::error::Error;

/// 配载配置读取接口
#[async_trait]
pub trait AssignConfigReader: Send + Sync {
    /// 离港宽限 (小时,0-24)
    async fn get_depart_slack_hours(&self) -> Result<i64, Box<dyn Error>>;

    /// 单次批量运行处理的运单上限
    async fn get_max_batch_shipments(&self) -> Result<u32, Box<dyn Error>>;

    /// 候选航次上限
    async fn get_max_candidate_voyages(&self) -> Result<u32, Box<dyn Error>>;

    /// 候选排序策略模式
    async fn get_scoring_mode(&self) -> Result<ScoringMode, Box<dyn Error>>;

    /// 台账快照时效 (秒)
    async fn get_snapshot_ttl_seconds(&self) -> Result<i64, Box<dyn Error>>;
}
