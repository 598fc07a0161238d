// ==========================================
// 海运航次配载系统 - 单票分配引擎
// ==========================================
// 职责: 在候选航次集合中为一票运单选出最优可行航次
// 红线: 无可行航次时返回 None,由调用方决定后续
//       (报告"无可行航次"或请求建议文本),绝不凭空编造配载
// ==========================================
// 台账不变时重复调用结论不变 (幂等);
// 落库与台账更新由调用方在接受决策后完成。
// ==========================================

use crate::domain::ledger::CapacityLedger;
use crate::domain::shipment::Shipment;
use crate::domain::voyage::Voyage;
use crate::engine::feasibility::FeasibilityChecker;
use crate::engine::scoring::{CandidateVoyage, ScoringPolicy};
use tracing::{debug, instrument};

// ==========================================
// AssignmentDecision - 分配决策
// ==========================================
#[derive(Debug, Clone)]
pub struct AssignmentDecision {
    pub voyage_id: String,
    pub voyage_code: String,
    pub reason: String, // JSON 格式的决策原因 (可解释性)
}

// ==========================================
// ShipmentAssigner - 单票分配引擎
// ==========================================
pub struct ShipmentAssigner {
    checker: FeasibilityChecker,
    policy: ScoringPolicy,
}

impl ShipmentAssigner {
    /// 构造函数
    ///
    /// # 参数
    /// - `checker`: 可行性检查引擎 (提交口径)
    /// - `policy`: 候选排序引擎
    pub fn new(checker: FeasibilityChecker, policy: ScoringPolicy) -> Self {
        Self { checker, policy }
    }

    pub fn checker(&self) -> &FeasibilityChecker {
        &self.checker
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 为一票运单选择最优航次
    ///
    /// 流程: 可行性过滤 → 排序 → 取首位。
    ///
    /// # 参数
    /// - `shipment`: 待分配运单
    /// - `voyages`: 候选航次集合
    /// - `ledger`: 本次规划运行的容量台账
    ///
    /// # 返回
    /// - Some(AssignmentDecision): 最优可行航次
    /// - None: 无可行航次
    #[instrument(skip(self, voyages, ledger), fields(
        shipment_code = %shipment.shipment_code,
        voyages_count = voyages.len()
    ))]
    pub fn assign(
        &self,
        shipment: &Shipment,
        voyages: &[Voyage],
        ledger: &CapacityLedger,
    ) -> Option<AssignmentDecision> {
        let candidates: Vec<CandidateVoyage<'_>> = voyages
            .iter()
            .filter_map(|voyage| {
                // 台账里没有条目的航次不参与 (台账与航次集合同源构建,缺失属异常)
                let load = match ledger.get(&voyage.id) {
                    Some(load) => load,
                    None => {
                        debug!(voyage_code = %voyage.voyage_code, "航次缺少台账条目,跳过");
                        return None;
                    }
                };
                self.checker
                    .fits(shipment, voyage, load)
                    .then_some(CandidateVoyage { voyage, load })
            })
            .collect();

        if candidates.is_empty() {
            debug!(shipment_code = %shipment.shipment_code, "无可行航次");
            return None;
        }

        let ranked = self.policy.rank_voyages(shipment, candidates);
        let top = ranked[0];

        Some(AssignmentDecision {
            voyage_id: top.voyage.id.clone(),
            voyage_code: top.voyage.voyage_code.clone(),
            reason: self.policy.generate_rank_reason(shipment, &top),
        })
    }
}
