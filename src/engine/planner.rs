// ==========================================
// 海运航次配载系统 - 装载预览引擎 (降序装箱)
// ==========================================
// 职责: 对单一假想船型做确定性装载预演
// 红线: 纯预演,不落库,可用不同船型假设反复调用
// ==========================================
// 经典降序首次适配 (First-Fit-Decreasing) 变体:
// 1) 选主导资源维度 (有限且更紧的上限)
// 2) 按主导维度载量降序排序 (优先货、早起运为平手键)
// 3) 贪心装入,首个超限维度即跳过并记录原因
// 4) 汇报两维度利用率 (不限量维度报 0,禁止除以 ∞)
// ==========================================

use crate::domain::shipment::Shipment;
use crate::domain::types::{DominantDimension, SkipReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::instrument;

// ==========================================
// VesselProfile - 假想船型
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselProfile {
    pub weight_cap_t: Option<f64>,  // 重量上限 (吨,缺失 = 不限)
    pub volume_cap_m3: Option<f64>, // 体积上限 (m³,缺失 = 不限)
}

// ==========================================
// PlanFilters - 预演候选过滤条件
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanFilters {
    pub origin: Option<String>,      // 起运港包含 (忽略大小写)
    pub destination: Option<String>, // 目的港包含 (忽略大小写)
    pub start_after: Option<DateTime<Utc>>, // 起运日期不早于
}

impl PlanFilters {
    /// 运单是否满足过滤条件
    ///
    /// 起运日期缺失的运单无法通过日期过滤 (无从判断,保守排除)
    pub fn matches(&self, shipment: &Shipment) -> bool {
        if let Some(origin) = &self.origin {
            if !shipment
                .origin
                .to_lowercase()
                .contains(&origin.to_lowercase())
            {
                return false;
            }
        }
        if let Some(destination) = &self.destination {
            if !shipment
                .destination
                .to_lowercase()
                .contains(&destination.to_lowercase())
            {
                return false;
            }
        }
        if let Some(cut) = self.start_after {
            match shipment.ship_date {
                Some(sd) if sd >= cut => {}
                _ => return false,
            }
        }
        true
    }
}

// ==========================================
// LoadPlan - 装载预演结果
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedShipment {
    pub shipment_code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utilization {
    pub weight_pct: i64, // 不限量时为 0
    pub volume_pct: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPlan {
    pub assigned: Vec<String>, // 装入的运单号,按装载顺序
    pub skipped: Vec<SkippedShipment>,
    pub utilization: Utilization,
    pub dominant: DominantDimension,
    pub used_weight_t: f64,
    pub used_volume_m3: f64,
}

// ==========================================
// LoadPlanner - 装载预览引擎
// ==========================================
pub struct LoadPlanner {
    // 无状态引擎,不需要注入依赖
}

impl LoadPlanner {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 装载预演 (单一假想船型)
    ///
    /// # 参数
    /// - `shipments`: 候选运单池
    /// - `vessel`: 假想船型容量
    /// - `filters`: 可选的航线/日期过滤
    ///
    /// # 返回
    /// 装载预演结果 (装入清单 + 跳过原因 + 利用率)
    #[instrument(skip(self, shipments, filters), fields(pool_size = shipments.len()))]
    pub fn plan(
        &self,
        shipments: &[Shipment],
        vessel: &VesselProfile,
        filters: Option<&PlanFilters>,
    ) -> LoadPlan {
        let cap_w = declared_cap(vessel.weight_cap_t);
        let cap_v = declared_cap(vessel.volume_cap_m3);

        // 1. 过滤候选池
        let pool: Vec<&Shipment> = shipments
            .iter()
            .filter(|s| filters.map_or(true, |f| f.matches(s)))
            .collect();

        // 2. 选主导资源维度
        let dominant = Self::dominant_dimension(cap_w, cap_v);

        // 3. 主导维度降序排序 (平手: 优先货在前,再早起运,再运单号)
        let mut sorted = pool;
        sorted.sort_by(|a, b| Self::compare_for_packing(a, b, dominant));

        // 4. 贪心装入
        let mut used_w = 0.0;
        let mut used_v = 0.0;
        let mut assigned = Vec::new();
        let mut skipped = Vec::new();

        for shipment in sorted {
            let w = shipment.effective_weight_t();
            let v = shipment.effective_volume_m3();
            let ok_w = used_w + w <= cap_w;
            let ok_v = used_v + v <= cap_v;

            if ok_w && ok_v {
                assigned.push(shipment.shipment_code.clone());
                used_w += w;
                used_v += v;
            } else {
                let reason = match (ok_w, ok_v) {
                    (false, false) => SkipReason::WeightAndVolume,
                    (false, true) => SkipReason::Weight,
                    (true, false) => SkipReason::Volume,
                    (true, true) => unreachable!(),
                };
                skipped.push(SkippedShipment {
                    shipment_code: shipment.shipment_code.clone(),
                    reason,
                });
            }
        }

        LoadPlan {
            assigned,
            skipped,
            utilization: Utilization {
                weight_pct: utilization_pct(used_w, cap_w),
                volume_pct: utilization_pct(used_v, cap_v),
            },
            dominant,
            used_weight_t: used_w,
            used_volume_m3: used_v,
        }
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 选主导资源维度
    ///
    /// 规则:
    /// - 双维度均有限: 原值更小 (更紧) 者主导,相等时重量主导
    /// - 仅一个有限: 该维度主导
    /// - 均不限量: 默认重量主导
    fn dominant_dimension(cap_w: f64, cap_v: f64) -> DominantDimension {
        match (cap_w.is_finite(), cap_v.is_finite()) {
            (true, true) => {
                if cap_w <= cap_v {
                    DominantDimension::Weight
                } else {
                    DominantDimension::Volume
                }
            }
            (true, false) => DominantDimension::Weight,
            (false, true) => DominantDimension::Volume,
            (false, false) => DominantDimension::Weight,
        }
    }

    fn compare_for_packing(a: &Shipment, b: &Shipment, dominant: DominantDimension) -> Ordering {
        let value = |s: &Shipment| match dominant {
            DominantDimension::Weight => s.effective_weight_t(),
            DominantDimension::Volume => s.effective_volume_m3(),
        };

        // 1. 主导维度降序
        match value(b).total_cmp(&value(a)) {
            Ordering::Equal => {}
            other => return other,
        }

        // 2. 优先货在前
        match b.is_priority.cmp(&a.is_priority) {
            Ordering::Equal => {}
            other => return other,
        }

        // 3. 早起运在前 (缺失排最后)
        let sd_a = a.ship_date.unwrap_or(DateTime::<Utc>::MAX_UTC);
        let sd_b = b.ship_date.unwrap_or(DateTime::<Utc>::MAX_UTC);
        match sd_a.cmp(&sd_b) {
            Ordering::Equal => {}
            other => return other,
        }

        // 4. 稳定兜底
        a.shipment_code.cmp(&b.shipment_code)
    }
}

impl Default for LoadPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// 申报容量换算: 缺失/非法值视为不限量
fn declared_cap(cap: Option<f64>) -> f64 {
    match cap {
        Some(c) if c.is_finite() && c >= 0.0 => c,
        _ => f64::INFINITY,
    }
}

/// 利用率百分比 (四舍五入); 不限量报 0,禁止除以 ∞
fn utilization_pct(used: f64, cap: f64) -> i64 {
    if cap.is_finite() && cap > 0.0 {
        ((used / cap) * 100.0).round() as i64
    } else {
        0
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ShipmentStatus;
    use chrono::TimeZone;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn create_test_shipment(code: &str, weight_t: f64, volume_m3: f64) -> Shipment {
        Shipment {
            id: format!("s-{}", code),
            shipment_code: code.to_string(),
            origin: "Mumbai".to_string(),
            destination: "Chennai".to_string(),
            status: ShipmentStatus::Created,
            is_priority: false,
            ship_date: Some(ts(2025, 8, 9)),
            transit_days: 5,
            weight_t: Some(weight_t),
            volume_m3: Some(volume_m3),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // ==========================================
    // 测试用例 1: 基础降序装箱
    // ==========================================

    #[test]
    fn test_ffd_basic_weight_dominant() {
        // 场景: 两票 10t/6t,船重量上限 10t (体积不限)
        let planner = LoadPlanner::new();
        let shipments = vec![
            create_test_shipment("SHP-106", 6.0, 1.0),
            create_test_shipment("SHP-110", 10.0, 1.0),
        ];
        let vessel = VesselProfile {
            weight_cap_t: Some(10.0),
            volume_cap_m3: None,
        };

        let plan = planner.plan(&shipments, &vessel, None);

        assert_eq!(plan.dominant, DominantDimension::Weight);
        assert_eq!(plan.assigned, vec!["SHP-110".to_string()]); // 降序先装 10t
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].shipment_code, "SHP-106");
        assert_eq!(plan.skipped[0].reason, SkipReason::Weight);
        assert_eq!(plan.utilization.weight_pct, 100);
        assert_eq!(plan.utilization.volume_pct, 0); // 不限量报 0
    }

    #[test]
    fn test_ffd_volume_dominant_when_tighter() {
        // 体积上限 30 < 重量上限 50 → 体积主导
        let planner = LoadPlanner::new();
        let shipments = vec![
            create_test_shipment("SHP-201", 5.0, 20.0),
            create_test_shipment("SHP-202", 40.0, 8.0),
        ];
        let vessel = VesselProfile {
            weight_cap_t: Some(50.0),
            volume_cap_m3: Some(30.0),
        };

        let plan = planner.plan(&shipments, &vessel, None);

        assert_eq!(plan.dominant, DominantDimension::Volume);
        // 体积降序: SHP-201 (20) 先装,SHP-202 (8) 再装,均可行
        assert_eq!(
            plan.assigned,
            vec!["SHP-201".to_string(), "SHP-202".to_string()]
        );
    }

    #[test]
    fn test_ffd_equal_caps_weight_dominant() {
        let planner = LoadPlanner::new();
        let vessel = VesselProfile {
            weight_cap_t: Some(30.0),
            volume_cap_m3: Some(30.0),
        };
        let plan = planner.plan(&[], &vessel, None);
        assert_eq!(plan.dominant, DominantDimension::Weight);
    }

    #[test]
    fn test_ffd_no_caps_defaults_to_weight() {
        let planner = LoadPlanner::new();
        let shipments = vec![create_test_shipment("SHP-201", 1000.0, 1000.0)];
        let vessel = VesselProfile {
            weight_cap_t: None,
            volume_cap_m3: None,
        };

        let plan = planner.plan(&shipments, &vessel, None);

        assert_eq!(plan.dominant, DominantDimension::Weight);
        assert_eq!(plan.assigned.len(), 1); // 不限量全装入
        assert_eq!(plan.utilization.weight_pct, 0);
        assert_eq!(plan.utilization.volume_pct, 0);
    }

    // ==========================================
    // 测试用例 2: 跳过原因
    // ==========================================

    #[test]
    fn test_skip_reason_both_dimensions() {
        let planner = LoadPlanner::new();
        let shipments = vec![
            create_test_shipment("SHP-201", 10.0, 10.0),
            create_test_shipment("SHP-202", 8.0, 8.0), // 双维度均装不下
        ];
        let vessel = VesselProfile {
            weight_cap_t: Some(12.0),
            volume_cap_m3: Some(12.0),
        };

        let plan = planner.plan(&shipments, &vessel, None);

        assert_eq!(plan.assigned, vec!["SHP-201".to_string()]);
        assert_eq!(plan.skipped[0].reason, SkipReason::WeightAndVolume);
    }

    #[test]
    fn test_skip_reason_volume_only() {
        let planner = LoadPlanner::new();
        let shipments = vec![
            create_test_shipment("SHP-201", 1.0, 10.0),
            create_test_shipment("SHP-202", 1.0, 8.0),
        ];
        let vessel = VesselProfile {
            weight_cap_t: Some(100.0),
            volume_cap_m3: Some(12.0),
        };

        let plan = planner.plan(&shipments, &vessel, None);

        assert_eq!(plan.skipped[0].shipment_code, "SHP-202");
        assert_eq!(plan.skipped[0].reason, SkipReason::Volume);
    }

    // ==========================================
    // 测试用例 3: 平手键
    // ==========================================

    #[test]
    fn test_tie_break_priority_then_ship_date() {
        let planner = LoadPlanner::new();
        let mut normal = create_test_shipment("SHP-201", 10.0, 1.0);
        normal.ship_date = Some(ts(2025, 8, 1));
        let mut priority = create_test_shipment("SHP-202", 10.0, 1.0);
        priority.is_priority = true;
        priority.ship_date = Some(ts(2025, 8, 20));

        // 同为 10t,优先货在前;容量只够一票
        let vessel = VesselProfile {
            weight_cap_t: Some(10.0),
            volume_cap_m3: None,
        };
        let plan = planner.plan(&[normal, priority], &vessel, None);

        assert_eq!(plan.assigned, vec!["SHP-202".to_string()]);
        assert_eq!(plan.skipped[0].shipment_code, "SHP-201");
    }

    // ==========================================
    // 测试用例 4: 过滤条件
    // ==========================================

    #[test]
    fn test_filters_lane_and_date() {
        let planner = LoadPlanner::new();
        let mut off_lane = create_test_shipment("SHP-201", 1.0, 1.0);
        off_lane.origin = "Goa".to_string();
        let mut too_early = create_test_shipment("SHP-202", 1.0, 1.0);
        too_early.ship_date = Some(ts(2025, 7, 1));
        let matching = create_test_shipment("SHP-203", 1.0, 1.0);

        let filters = PlanFilters {
            origin: Some("mum".to_string()),
            destination: None,
            start_after: Some(ts(2025, 8, 1)),
        };
        let vessel = VesselProfile {
            weight_cap_t: Some(100.0),
            volume_cap_m3: None,
        };

        let plan = planner.plan(&[off_lane, too_early, matching], &vessel, Some(&filters));

        assert_eq!(plan.assigned, vec!["SHP-203".to_string()]);
        assert!(plan.skipped.is_empty()); // 被过滤的不算跳过
    }

    #[test]
    fn test_filter_missing_ship_date_excluded_by_date_filter() {
        let planner = LoadPlanner::new();
        let mut undated = create_test_shipment("SHP-201", 1.0, 1.0);
        undated.ship_date = None;

        let filters = PlanFilters {
            origin: None,
            destination: None,
            start_after: Some(ts(2025, 8, 1)),
        };
        let vessel = VesselProfile {
            weight_cap_t: None,
            volume_cap_m3: None,
        };

        let plan = planner.plan(&[undated], &vessel, Some(&filters));
        assert!(plan.assigned.is_empty());
    }

    // ==========================================
    // 测试用例 5: 预演可重复 (纯函数)
    // ==========================================

    #[test]
    fn test_plan_is_repeatable() {
        let planner = LoadPlanner::new();
        let shipments = vec![
            create_test_shipment("SHP-201", 10.0, 5.0),
            create_test_shipment("SHP-202", 6.0, 3.0),
        ];
        let vessel = VesselProfile {
            weight_cap_t: Some(10.0),
            volume_cap_m3: None,
        };

        let first = planner.plan(&shipments, &vessel, None);
        let second = planner.plan(&shipments, &vessel, None);
        assert_eq!(first.assigned, second.assigned);
        assert_eq!(first.utilization.weight_pct, second.utilization.weight_pct);
    }
}
