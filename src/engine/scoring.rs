// ==========================================
// 海运航次配载系统 - 候选排序引擎
// ==========================================
// 职责: 对可行候选给出全序 (最优在前),所有规则可输出 reason
// 红线: 排序必须确定,同输入同输出 (尾键稳定兜底)
// ==========================================
// 三种命名策略由调用方意图选择,不得各端点各写一套:
// - SPREAD_LOAD (单票分配默认): 早离港、少在册、余量大者优先,
//   分摊负载,降低后续级联不可行的风险
// - TIGHT_PACK (装载预览): 早离港、少在册、余量小者优先,装得更紧
// - PRIORITY_WEIGHTED (按航次补位): 优先货固定大额加分压倒一切,
//   其后按主导维度填充率
// ==========================================

use crate::domain::ledger::{CapacityHeadroom, VoyageLoad};
use crate::domain::shipment::Shipment;
use crate::domain::types::ScoringMode;
use crate::domain::voyage::Voyage;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// 优先货固定加分: 远大于其他打分项之和,保证可行时优先货必胜
pub const PRIORITY_BONUS: f64 = 1_000_000.0;

// ==========================================
// CandidateVoyage - 参与排序的候选航次
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct CandidateVoyage<'a> {
    pub voyage: &'a Voyage,
    pub load: &'a VoyageLoad,
}

// ==========================================
// ScoringPolicy - 候选排序引擎
// ==========================================
pub struct ScoringPolicy {
    mode: ScoringMode,
}

impl ScoringPolicy {
    /// 构造函数
    pub fn new(mode: ScoringMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    // ==========================================
    // 核心方法: 为运单排序候选航次
    // ==========================================

    /// 排序候选航次 (最优在前)
    ///
    /// 排序键:
    /// 1) 离港时间升序 (早开船早起运; 时间缺失排最后)
    /// 2) 在册票数升序 (分摊负载,避免把单一航次塞满)
    /// 3) 假设装入后的合计余量: SPREAD_LOAD 降序 / TIGHT_PACK 升序
    /// 4) 航次号升序 (稳定兜底)
    pub fn rank_voyages<'a>(
        &self,
        shipment: &Shipment,
        mut candidates: Vec<CandidateVoyage<'a>>,
    ) -> Vec<CandidateVoyage<'a>> {
        candidates.sort_by(|a, b| self.compare_voyages(shipment, a, b));
        candidates
    }

    fn compare_voyages(
        &self,
        shipment: &Shipment,
        a: &CandidateVoyage<'_>,
        b: &CandidateVoyage<'_>,
    ) -> Ordering {
        // 1. 离港时间升序
        let dep_a = depart_key(a.voyage.depart_at);
        let dep_b = depart_key(b.voyage.depart_at);
        match dep_a.cmp(&dep_b) {
            Ordering::Equal => {}
            other => return other,
        }

        // 2. 在册票数升序
        match a.load.assigned_count.cmp(&b.load.assigned_count) {
            Ordering::Equal => {}
            other => return other,
        }

        // 3. 假设装入后的合计余量
        let slack_a = combined_slack_after(shipment, a.load);
        let slack_b = combined_slack_after(shipment, b.load);
        let ord = match self.mode {
            // 余量大者优先 (不限量维度贡献 +∞,天然排前)
            ScoringMode::SpreadLoad | ScoringMode::PriorityWeighted => {
                slack_b.total_cmp(&slack_a)
            }
            // 余量小者优先 (装得更紧)
            ScoringMode::TightPack => slack_a.total_cmp(&slack_b),
        };
        match ord {
            Ordering::Equal => {}
            other => return other,
        }

        // 4. 稳定兜底
        a.voyage.voyage_code.cmp(&b.voyage.voyage_code)
    }

    // ==========================================
    // 核心方法: 为航次排序候选运单 (补位方向)
    // ==========================================

    /// 排序候选运单 (最优在前)
    ///
    /// 打分 (降序):
    /// - 优先货固定大额加分 (压倒其他所有项)
    /// - 主导维度填充率: 0.6 × 重量占比 + 0.4 × 体积占比 (不限量维度计 0)
    /// 同分按起运日期升序,再按运单号升序兜底。
    pub fn rank_shipments_for_voyage<'a>(
        &self,
        voyage: &Voyage,
        mut candidates: Vec<&'a Shipment>,
    ) -> Vec<&'a Shipment> {
        candidates.sort_by(|a, b| {
            let score_a = Self::slot_score(voyage, a);
            let score_b = Self::slot_score(voyage, b);
            match score_b.total_cmp(&score_a) {
                Ordering::Equal => {}
                other => return other,
            }

            let sd_a = ship_date_key(a.ship_date);
            let sd_b = ship_date_key(b.ship_date);
            match sd_a.cmp(&sd_b) {
                Ordering::Equal => {}
                other => return other,
            }

            a.shipment_code.cmp(&b.shipment_code)
        });
        candidates
    }

    /// 补位打分
    fn slot_score(voyage: &Voyage, shipment: &Shipment) -> f64 {
        let bonus = if shipment.is_priority {
            PRIORITY_BONUS
        } else {
            0.0
        };

        let weight_ratio = fill_ratio(shipment.effective_weight_t(), voyage.weight_cap_t);
        let volume_ratio = fill_ratio(shipment.effective_volume_m3(), voyage.volume_cap_m3);

        bonus + 0.6 * weight_ratio + 0.4 * volume_ratio
    }

    // ==========================================
    // 批量顺序: 优先级降序,起运日期升序
    // ==========================================

    /// 批量运行的处理顺序
    ///
    /// 容量紧张时顺序决定谁被跳过,这里保证:
    /// 同一决策点上,可行的优先货绝不会输给可行的普通货。
    pub fn order_for_batch(mut shipments: Vec<Shipment>) -> Vec<Shipment> {
        shipments.sort_by(|a, b| {
            match b.is_priority.cmp(&a.is_priority) {
                Ordering::Equal => {}
                other => return other,
            }
            let sd_a = ship_date_key(a.ship_date);
            let sd_b = ship_date_key(b.ship_date);
            match sd_a.cmp(&sd_b) {
                Ordering::Equal => {}
                other => return other,
            }
            a.shipment_code.cmp(&b.shipment_code)
        });
        shipments
    }

    /// 生成排序原因 (可解释性)
    pub fn generate_rank_reason(
        &self,
        shipment: &Shipment,
        candidate: &CandidateVoyage<'_>,
    ) -> String {
        format!(
            r#"{{"mode":"{}","depart_at":"{}","assigned_count":{},"slack_after":{}}}"#,
            self.mode,
            candidate
                .voyage
                .depart_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "null".to_string()),
            candidate.load.assigned_count,
            fmt_slack(combined_slack_after(shipment, candidate.load))
        )
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::new(ScoringMode::SpreadLoad)
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 离港时间排序键 (缺失排最后)
fn depart_key(depart_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    depart_at.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn ship_date_key(ship_date: Option<DateTime<Utc>>) -> DateTime<Utc> {
    ship_date.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 假设装入该运单后的合计余量 (两维度之和,不限量维度为 +∞)
fn combined_slack_after(shipment: &Shipment, load: &VoyageLoad) -> f64 {
    let slack_w = load.remaining_weight_t() - shipment.effective_weight_t();
    let slack_v = load.remaining_volume_m3() - shipment.effective_volume_m3();
    slack_w + slack_v
}

/// 填充率: 载量 / 上限,上限缺失/非法计 0
fn fill_ratio(need: f64, cap: Option<f64>) -> f64 {
    match cap {
        Some(c) if c.is_finite() && c > 0.0 => need / c,
        _ => 0.0,
    }
}

fn fmt_slack(value: f64) -> String {
    if value.is_finite() {
        format!("{:.3}", value)
    } else {
        "\"unlimited\"".to_string()
    }
}
