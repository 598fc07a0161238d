// ==========================================
// 海运航次配载系统 - 批量自动配载引擎
// ==========================================
// 职责: 协调可行性检查、候选排序、单票分配与落库,
//       对未配载运单池做一次提交式批量运行
// 红线: 单票不可行绝不中止整批 (部分失败必须可容忍);
//       运行内严格串行: 第 N 票的台账消耗必须先于
//       第 N+1 票的可行性检查可见,容量消耗是累积且顺序相关的
// ==========================================
// 并发说明: 台账每次运行从数据库重建,本设计不串行化并发的
// 批量运行;两个并发提交方可能基于同一余量快照双双提交造成
// 超卖。生产部署必须在外层加单写者队列或可串行化事务,
// 这是必须的加固项而非可选增强 (见 DESIGN.md 决策 2)。
// ==========================================

use crate::domain::ledger::CapacityLedger;
use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use crate::domain::voyage::Voyage;
use crate::engine::advisor::{
    fallback_hint, AdvisoryCandidate, AdvisoryContext, AdvisoryShipment, RouteAdvisor,
};
use crate::engine::assigner::ShipmentAssigner;
use crate::engine::feasibility::FeasibilityChecker;
use crate::engine::repositories::AssignmentStore;
use crate::engine::scoring::ScoringPolicy;
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 运行参数
// ==========================================

/// 批量运行的边界参数 (把单次运行的工作量约束在可控范围)
#[derive(Debug, Clone)]
pub struct AutoAssignLimits {
    pub max_shipments: u32,        // 单次运行处理的运单上限
    pub max_voyages: u32,          // 候选航次上限
    pub max_hint_shipments: usize, // 进入建议文本的滞留运单上限
    pub max_hint_candidates: usize, // 每票建议携带的临近航次上限
    pub near_depart_gap_days: i64, // 临近候选的离港时间窗 (天)
}

impl Default for AutoAssignLimits {
    fn default() -> Self {
        Self {
            max_shipments: 500,
            max_voyages: 200,
            max_hint_shipments: 25,
            max_hint_candidates: 20,
            near_depart_gap_days: 10,
        }
    }
}

// ==========================================
// BatchAssignResult - 批量运行结果
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedPair {
    pub shipment_code: String,
    pub voyage_code: String,
}

/// 批量运行始终返回结构化结果 (计数 + 逐票原因),
/// 部分成功永远可检视,不以裸错误收场
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAssignResult {
    pub assigned: usize,
    pub processed: usize,
    pub pairs: Vec<AssignedPair>,
    pub messages: Vec<String>,
}

// ==========================================
// AutoAssignEngine - 批量自动配载引擎
// ==========================================
pub struct AutoAssignEngine<S>
where
    S: AssignmentStore,
{
    store: Arc<S>,
    assigner: ShipmentAssigner,
    advisor: Option<Arc<dyn RouteAdvisor>>,
    limits: AutoAssignLimits,
}

impl<S> AutoAssignEngine<S>
where
    S: AssignmentStore,
{
    /// 构造函数
    ///
    /// # 参数
    /// - `store`: 数据访问集合
    /// - `checker`: 可行性检查引擎 (提交口径)
    /// - `policy`: 候选排序引擎
    /// - `advisor`: 建议文本协作方 (None 则跳过提示阶段)
    /// - `limits`: 运行边界参数
    pub fn new(
        store: Arc<S>,
        checker: FeasibilityChecker,
        policy: ScoringPolicy,
        advisor: Option<Arc<dyn RouteAdvisor>>,
        limits: AutoAssignLimits,
    ) -> Self {
        Self {
            store,
            assigner: ShipmentAssigner::new(checker, policy),
            advisor,
            limits,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行一次提交式批量配载
    ///
    /// 流程:
    /// 1) 取未配载且状态可配载的运单 (优先级降序、起运日期升序)
    /// 2) 取航次及在册配载,重建容量台账
    /// 3) 逐票调用单票分配引擎;成功则原子落库并就地更新台账,
    ///    失败则记录原因后继续
    /// 4) 滞留运单走建议文本阶段 (仅提示,不提交)
    #[instrument(skip(self))]
    pub async fn run(&self) -> RepositoryResult<BatchAssignResult> {
        // ==========================================
        // 步骤1: 拉取运单与航次
        // ==========================================
        let shipments = self.store.list_unassigned_shipments(
            &[ShipmentStatus::Created, ShipmentStatus::InTransit],
            self.limits.max_shipments,
        )?;
        // 仓储已按序返回;此处再排一次,保证任何 store 实现下
        // 优先货都不会在同一决策点输给普通货
        let shipments = ScoringPolicy::order_for_batch(shipments);

        let voyages_with = self
            .store
            .list_voyages_with_assignments(self.limits.max_voyages)?;
        let mut ledger = CapacityLedger::build(&voyages_with);
        let voyages: Vec<Voyage> = voyages_with.iter().map(|v| v.voyage.clone()).collect();

        info!(
            shipments_count = shipments.len(),
            voyages_count = voyages.len(),
            "开始批量自动配载"
        );

        let processed = shipments.len();
        let mut assigned = 0usize;
        let mut pairs = Vec::new();
        let mut messages = Vec::new();
        let mut leftovers: Vec<Shipment> = Vec::new();

        // ==========================================
        // 步骤2: 严格串行的逐票分配
        // ==========================================
        for shipment in shipments {
            match self.assigner.assign(&shipment, &voyages, &ledger) {
                Some(decision) => {
                    // 落库 (原子移动);单票落库失败按跳过处理,整批继续
                    match self
                        .store
                        .create_assignment(&shipment.id, &decision.voyage_id)
                    {
                        Ok(_) => {
                            ledger.apply_commit(
                                &decision.voyage_id,
                                shipment.effective_weight_t(),
                                shipment.effective_volume_m3(),
                            );
                            messages.push(format!(
                                "ASSIGNED: {} -> {}",
                                shipment.shipment_code, decision.voyage_code
                            ));
                            pairs.push(AssignedPair {
                                shipment_code: shipment.shipment_code.clone(),
                                voyage_code: decision.voyage_code,
                            });
                            assigned += 1;
                        }
                        Err(e) => {
                            warn!(
                                shipment_code = %shipment.shipment_code,
                                error = %e,
                                "配载落库失败,跳过该票继续"
                            );
                            messages.push(format!(
                                "ERROR: {}: commit failed ({})",
                                shipment.shipment_code, e
                            ));
                        }
                    }
                }
                None => {
                    debug!(shipment_code = %shipment.shipment_code, "无可行航次,跳过");
                    messages.push(format!(
                        "SKIPPED: {}: no feasible voyage (lane/window/capacity)",
                        shipment.shipment_code
                    ));
                    leftovers.push(shipment);
                }
            }
        }

        info!(
            assigned = assigned,
            skipped = leftovers.len(),
            "确定性配载阶段完成"
        );

        // ==========================================
        // 步骤3: 滞留运单的建议文本阶段 (仅提示,不提交)
        // ==========================================
        if !leftovers.is_empty() {
            if let Some(advisor) = &self.advisor {
                self.append_hints(advisor, &leftovers, &voyages, &ledger, &mut messages)
                    .await;
            }
        }

        Ok(BatchAssignResult {
            assigned,
            processed,
            pairs,
            messages,
        })
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 为滞留运单生成多段中转建议;协作方故障降级为兜底文本
    async fn append_hints(
        &self,
        advisor: &Arc<dyn RouteAdvisor>,
        leftovers: &[Shipment],
        voyages: &[Voyage],
        ledger: &CapacityLedger,
        messages: &mut Vec<String>,
    ) {
        let subset = &leftovers[..leftovers.len().min(self.limits.max_hint_shipments)];
        let context = self.build_advisory_context(subset, voyages, ledger);
        if context.is_empty() {
            return;
        }

        match advisor.advise(&context).await {
            Ok(text) => {
                for line in text.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        messages.push(line.to_string());
                    }
                }
            }
            Err(e) => {
                // 建议失败绝不影响确定性结果,降级为兜底文本
                warn!(error = %e, "建议文本生成失败,使用兜底提示");
                for shipment in subset {
                    messages.push(fallback_hint(&shipment.shipment_code));
                }
            }
        }
    }

    /// 组装建议上下文: 每票滞留运单携带若干临近候选航次
    /// (降级匹配口径,仅供提示,绝不用于提交判定)
    fn build_advisory_context(
        &self,
        leftovers: &[Shipment],
        voyages: &[Voyage],
        ledger: &CapacityLedger,
    ) -> AdvisoryContext {
        let shipments = leftovers
            .iter()
            .map(|shipment| {
                let mut near: Vec<&Voyage> = voyages
                    .iter()
                    .filter(|v| {
                        FeasibilityChecker::near_candidate(
                            shipment,
                            v,
                            self.limits.near_depart_gap_days,
                        )
                    })
                    .collect();
                near.sort_by_key(|v| v.depart_at.unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC));
                near.truncate(self.limits.max_hint_candidates);

                let candidates = near
                    .into_iter()
                    .filter_map(|v| {
                        ledger
                            .get(&v.id)
                            .map(|load| AdvisoryCandidate::from_voyage(v, load))
                    })
                    .collect();
                AdvisoryShipment::from_shipment(shipment, candidates)
            })
            .collect();

        AdvisoryContext { shipments }
    }
}
