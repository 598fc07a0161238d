// ==========================================
// 海运航次配载系统 - 外部提案验证闸门
// ==========================================
// 职责: 对外部来源 (如 LLM) 提出的 运单→航次 提案做强制复核
// 红线: 提案-复核 (propose-then-verify) 是架构规则,不是顺手校验;
//       任何外部提案必须通过与确定性路径完全相同的可行性检查
//       后才允许提交,绝不直接信任外部建议
// ==========================================

use crate::domain::ledger::CapacityLedger;
use crate::domain::shipment::Shipment;
use crate::domain::voyage::Voyage;
use crate::engine::feasibility::FeasibilityChecker;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

// ==========================================
// ProposedAssignment - 外部提案
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAssignment {
    pub shipment_code: String,
    pub voyage_code: String,
    pub reason: Option<String>, // 提案方附注,仅透传
}

/// 复核通过的提案 (已解析为内部行标识)
#[derive(Debug, Clone)]
pub struct AcceptedSuggestion {
    pub shipment_id: String,
    pub shipment_code: String,
    pub voyage_id: String,
    pub voyage_code: String,
}

/// 被拒提案及拒绝原因
#[derive(Debug, Clone)]
pub struct RejectedSuggestion {
    pub proposal: ProposedAssignment,
    pub reason: String,
}

/// 复核结果
#[derive(Debug, Clone, Default)]
pub struct VerifiedSuggestions {
    pub accepted: Vec<AcceptedSuggestion>,
    pub rejected: Vec<RejectedSuggestion>,
}

// ==========================================
// SuggestionGate - 提案验证闸门
// ==========================================
pub struct SuggestionGate {
    checker: FeasibilityChecker,
}

impl SuggestionGate {
    /// 构造函数
    pub fn new(checker: FeasibilityChecker) -> Self {
        Self { checker }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 逐条复核外部提案
    ///
    /// 提案按输入顺序复核;已接受提案的载量立即计入台账,
    /// 后续提案看到的是消耗后的余量 (与批量运行同一口径)。
    ///
    /// # 参数
    /// - `proposals`: 外部提案列表
    /// - `shipments`: 可配载运单池 (按运单号解析)
    /// - `voyages`: 候选航次集合 (按航次号解析)
    /// - `ledger`: 本次运行的容量台账 (就地消耗)
    ///
    /// # 返回
    /// 通过/被拒两个清单,被拒附原因
    #[instrument(skip(self, proposals, shipments, voyages, ledger), fields(
        proposals_count = proposals.len()
    ))]
    pub fn verify(
        &self,
        proposals: &[ProposedAssignment],
        shipments: &[Shipment],
        voyages: &[Voyage],
        ledger: &mut CapacityLedger,
    ) -> VerifiedSuggestions {
        let shipment_index: HashMap<String, &Shipment> = shipments
            .iter()
            .map(|s| (s.shipment_code.to_lowercase(), s))
            .collect();
        let voyage_index: HashMap<String, &Voyage> = voyages
            .iter()
            .map(|v| (v.voyage_code.to_lowercase(), v))
            .collect();

        let mut result = VerifiedSuggestions::default();
        // 同一批提案内一票只接受一次 (单票单航次不变量)
        let mut claimed_shipments: HashSet<String> = HashSet::new();

        for proposal in proposals {
            let Some(shipment) = shipment_index
                .get(&proposal.shipment_code.to_lowercase())
                .copied()
            else {
                result.rejected.push(RejectedSuggestion {
                    proposal: proposal.clone(),
                    reason: format!("UNKNOWN_SHIPMENT: {}", proposal.shipment_code),
                });
                continue;
            };

            let Some(voyage) = voyage_index
                .get(&proposal.voyage_code.to_lowercase())
                .copied()
            else {
                result.rejected.push(RejectedSuggestion {
                    proposal: proposal.clone(),
                    reason: format!("UNKNOWN_VOYAGE: {}", proposal.voyage_code),
                });
                continue;
            };

            if claimed_shipments.contains(&shipment.id) {
                result.rejected.push(RejectedSuggestion {
                    proposal: proposal.clone(),
                    reason: format!(
                        "DUPLICATE_SHIPMENT: {} already accepted in this batch",
                        shipment.shipment_code
                    ),
                });
                continue;
            }

            let Some(load) = ledger.get(&voyage.id) else {
                result.rejected.push(RejectedSuggestion {
                    proposal: proposal.clone(),
                    reason: format!("NO_LEDGER_ENTRY: {}", voyage.voyage_code),
                });
                continue;
            };

            // 与确定性路径完全相同的三道门控 (提交口径,fail closed)
            let (feasible, reasons) = self.checker.check(shipment, voyage, load);
            if !feasible {
                debug!(
                    shipment_code = %shipment.shipment_code,
                    voyage_code = %voyage.voyage_code,
                    "外部提案未通过复核"
                );
                result.rejected.push(RejectedSuggestion {
                    proposal: proposal.clone(),
                    reason: reasons.join("; "),
                });
                continue;
            }

            // 通过: 立即消耗台账余量
            ledger.apply_commit(
                &voyage.id,
                shipment.effective_weight_t(),
                shipment.effective_volume_m3(),
            );
            claimed_shipments.insert(shipment.id.clone());
            result.accepted.push(AcceptedSuggestion {
                shipment_id: shipment.id.clone(),
                shipment_code: shipment.shipment_code.clone(),
                voyage_id: voyage.id.clone(),
                voyage_code: voyage.voyage_code.clone(),
            });
        }

        result
    }
}
