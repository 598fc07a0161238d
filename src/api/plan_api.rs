// ==========================================
// 海运航次配载系统 - 规划操作接口
// ==========================================
// 职责: 面向外层 (Web 处理器) 的批量规划操作:
//       装载预演 (不落库)、批量自动配载 (落库)、外部提案落地
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AssignConfigReader;
use crate::domain::ledger::{CapacityHeadroom, CapacityLedger};
use crate::domain::types::ShipmentStatus;
use crate::domain::voyage::Voyage;
use crate::engine::advisor::RouteAdvisor;
use crate::engine::auto_assign::{
    AssignedPair, AutoAssignEngine, AutoAssignLimits, BatchAssignResult,
};
use crate::engine::feasibility::FeasibilityChecker;
use crate::engine::planner::{LoadPlan, LoadPlanner, PlanFilters, VesselProfile};
use crate::engine::repositories::AssignmentStore;
use crate::engine::scoring::ScoringPolicy;
use crate::engine::suggestion::{ProposedAssignment, SuggestionGate};
use crate::repository::store::SqliteAssignmentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// 输出结构
// ==========================================

/// 被拒提案 (对外暴露原因)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedProposal {
    pub shipment_code: String,
    pub voyage_code: String,
    pub reason: String,
}

/// 外部提案落地结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionApplyResult {
    pub committed: Vec<AssignedPair>,
    pub rejected: Vec<RejectedProposal>,
}

/// 单航次的容量概览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoyageCapacityView {
    pub voyage_code: String,
    pub vessel_name: String,
    pub assigned_count: usize,
    pub used_weight_t: f64,
    pub used_volume_m3: f64,
    pub remaining_weight_t: Option<f64>, // None = 不限量
    pub remaining_volume_m3: Option<f64>,
    pub utilization_weight_pct: Option<i64>,
    pub utilization_volume_pct: Option<i64>,
}

/// 容量概览快照 (显式时效,调用方可在 generated_at + ttl_seconds 内缓存)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityOverview {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub ttl_seconds: i64,
    pub voyages: Vec<VoyageCapacityView>,
}

// ==========================================
// PlanApi - 规划操作接口
// ==========================================
pub struct PlanApi<C>
where
    C: AssignConfigReader,
{
    store: Arc<SqliteAssignmentStore>,
    config: Arc<C>,
    advisor: Option<Arc<dyn RouteAdvisor>>,
}

impl<C> PlanApi<C>
where
    C: AssignConfigReader,
{
    /// 构造函数
    ///
    /// # 参数
    /// - `store`: 数据访问集合
    /// - `config`: 配置管理器
    /// - `advisor`: 建议文本协作方 (None 则批量运行跳过提示阶段)
    pub fn new(
        store: Arc<SqliteAssignmentStore>,
        config: Arc<C>,
        advisor: Option<Arc<dyn RouteAdvisor>>,
    ) -> Self {
        Self {
            store,
            config,
            advisor,
        }
    }

    async fn build_checker(&self) -> ApiResult<FeasibilityChecker> {
        let slack = self
            .config
            .get_depart_slack_hours()
            .await
            .map_err(ApiError::from_config)?;
        Ok(FeasibilityChecker::new(slack))
    }

    // ==========================================
    // 装载预演 (不落库)
    // ==========================================

    /// 对假想船型做降序装箱预演
    ///
    /// 纯预演,不提交任何配载,可用不同船型假设反复调用。
    #[instrument(skip(self, filters))]
    pub async fn preview_load_plan(
        &self,
        vessel: VesselProfile,
        filters: Option<PlanFilters>,
    ) -> ApiResult<LoadPlan> {
        let max_shipments = self
            .config
            .get_max_batch_shipments()
            .await
            .map_err(ApiError::from_config)?;
        let pool = self.store.list_unassigned_shipments(
            &[ShipmentStatus::Created, ShipmentStatus::InTransit],
            max_shipments,
        )?;

        let planner = LoadPlanner::new();
        Ok(planner.plan(&pool, &vessel, filters.as_ref()))
    }

    // ==========================================
    // 容量概览 (带时效的快照)
    // ==========================================

    /// 全航次容量概览
    ///
    /// 快照由数据访问层构建并打时戳;调用方可在 ttl_seconds 内
    /// 复用返回值,过期后重新请求: 没有任何隐藏的进程级缓存。
    #[instrument(skip(self))]
    pub async fn capacity_overview(&self) -> ApiResult<CapacityOverview> {
        let max_voyages = self
            .config
            .get_max_candidate_voyages()
            .await
            .map_err(ApiError::from_config)?;
        let ttl_seconds = self
            .config
            .get_snapshot_ttl_seconds()
            .await
            .map_err(ApiError::from_config)?;

        let (voyages, snapshot) = self
            .store
            .build_ledger_snapshot(max_voyages, ttl_seconds)?;

        let views = voyages
            .into_iter()
            .filter_map(|voyage| {
                let load = snapshot.ledger.get(&voyage.id)?;
                Some(VoyageCapacityView {
                    voyage_code: voyage.voyage_code,
                    vessel_name: voyage.vessel_name,
                    assigned_count: load.assigned_count,
                    used_weight_t: load.used_weight_t,
                    used_volume_m3: load.used_volume_m3,
                    remaining_weight_t: finite_or_none(load.remaining_weight_t()),
                    remaining_volume_m3: finite_or_none(load.remaining_volume_m3()),
                    utilization_weight_pct: load.utilization_weight_pct(),
                    utilization_volume_pct: load.utilization_volume_pct(),
                })
            })
            .collect();

        Ok(CapacityOverview {
            generated_at: snapshot.generated_at,
            ttl_seconds: snapshot.ttl_seconds,
            voyages: views,
        })
    }

    // ==========================================
    // 批量自动配载 (落库)
    // ==========================================

    /// 执行一次提交式批量配载
    ///
    /// 始终返回结构化结果 (计数 + 逐票原因);
    /// 单票不可行不会中止整批。
    #[instrument(skip(self))]
    pub async fn auto_assign(&self) -> ApiResult<BatchAssignResult> {
        let checker = self.build_checker().await?;
        let mode = self
            .config
            .get_scoring_mode()
            .await
            .map_err(ApiError::from_config)?;
        let limits = AutoAssignLimits {
            max_shipments: self
                .config
                .get_max_batch_shipments()
                .await
                .map_err(ApiError::from_config)?,
            max_voyages: self
                .config
                .get_max_candidate_voyages()
                .await
                .map_err(ApiError::from_config)?,
            ..AutoAssignLimits::default()
        };

        let engine = AutoAssignEngine::new(
            self.store.clone(),
            checker,
            ScoringPolicy::new(mode),
            self.advisor.clone(),
            limits,
        );
        let result = engine.run().await?;

        info!(
            assigned = result.assigned,
            processed = result.processed,
            "批量自动配载完成"
        );
        Ok(result)
    }

    // ==========================================
    // 外部提案落地 (提案-复核-提交)
    // ==========================================

    /// 复核并提交外部来源的 运单→航次 提案
    ///
    /// 每条提案先通过与确定性路径完全相同的可行性检查
    /// (针对实时台账,接受即消耗余量),复核通过才原子落库;
    /// 被拒提案带原因返回,绝不直接信任外部建议。
    #[instrument(skip(self, proposals), fields(proposals_count = proposals.len()))]
    pub async fn apply_suggestions(
        &self,
        proposals: Vec<ProposedAssignment>,
    ) -> ApiResult<SuggestionApplyResult> {
        let checker = self.build_checker().await?;
        let max_shipments = self
            .config
            .get_max_batch_shipments()
            .await
            .map_err(ApiError::from_config)?;
        let max_voyages = self
            .config
            .get_max_candidate_voyages()
            .await
            .map_err(ApiError::from_config)?;

        let shipments = self.store.list_unassigned_shipments(
            &[ShipmentStatus::Created, ShipmentStatus::InTransit],
            max_shipments,
        )?;
        let voyages_with = self.store.list_voyages_with_assignments(max_voyages)?;
        let mut ledger = CapacityLedger::build(&voyages_with);
        let voyages: Vec<Voyage> = voyages_with.into_iter().map(|v| v.voyage).collect();

        let gate = SuggestionGate::new(checker);
        let verified = gate.verify(&proposals, &shipments, &voyages, &mut ledger);

        let mut committed = Vec::new();
        let mut rejected: Vec<RejectedProposal> = verified
            .rejected
            .into_iter()
            .map(|r| RejectedProposal {
                shipment_code: r.proposal.shipment_code,
                voyage_code: r.proposal.voyage_code,
                reason: r.reason,
            })
            .collect();

        for accepted in verified.accepted {
            match self
                .store
                .create_assignment(&accepted.shipment_id, &accepted.voyage_id)
            {
                Ok(_) => committed.push(AssignedPair {
                    shipment_code: accepted.shipment_code,
                    voyage_code: accepted.voyage_code,
                }),
                Err(e) => {
                    // 单条落库失败按被拒处理,其余提案继续
                    warn!(
                        shipment_code = %accepted.shipment_code,
                        error = %e,
                        "提案落库失败"
                    );
                    rejected.push(RejectedProposal {
                        shipment_code: accepted.shipment_code,
                        voyage_code: accepted.voyage_code,
                        reason: format!("COMMIT_FAILED: {}", e),
                    });
                }
            }
        }

        Ok(SuggestionApplyResult { committed, rejected })
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
