// ==========================================
// 海运航次配载系统 - 容量台账领域模型
// ==========================================
// 红线: 容量约束优先于运单优先级
// 用途: 单次规划运行内的派生视图,不落库;
//       每次批量运行开始时从在册配载重建,运行结束即丢弃
// ==========================================

use crate::domain::voyage::{Voyage, VoyageWithAssignments};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

// ==========================================
// VoyageLoad - 单航次占用/余量
// ==========================================
// cap_* 为 +∞ 表示该维度未申报上限 (不限量)
#[derive(Debug, Clone)]
pub struct VoyageLoad {
    // ===== 容量参数 =====
    pub cap_weight_t: f64,  // 重量上限 (吨)
    pub cap_volume_m3: f64, // 体积上限 (m³)

    // ===== 实际占用 =====
    pub used_weight_t: f64,    // 已占重量 (吨)
    pub used_volume_m3: f64,   // 已占体积 (m³)
    pub assigned_count: usize, // 在册配载票数
}

// ==========================================
// Trait: CapacityHeadroom
// ==========================================
// 用途: 可行性检查的容量余量接口
pub trait CapacityHeadroom {
    /// 剩余重量 (吨),不限量时为 +∞
    fn remaining_weight_t(&self) -> f64;

    /// 剩余体积 (m³),不限量时为 +∞
    fn remaining_volume_m3(&self) -> f64;

    /// 检查能否再装入指定载量
    fn can_take(&self, weight_t: f64, volume_m3: f64) -> bool;
}

impl VoyageLoad {
    /// 按航次申报容量构造空载条目
    pub fn for_voyage(voyage: &Voyage) -> Self {
        Self {
            cap_weight_t: declared_cap(voyage.weight_cap_t),
            cap_volume_m3: declared_cap(voyage.volume_cap_m3),
            used_weight_t: 0.0,
            used_volume_m3: 0.0,
            assigned_count: 0,
        }
    }

    /// 计入一票货载的占用
    pub fn add_cargo(&mut self, weight_t: f64, volume_m3: f64) {
        self.used_weight_t += weight_t;
        self.used_volume_m3 += volume_m3;
        self.assigned_count += 1;
    }

    /// 重量维度利用率 (百分比,四舍五入)
    ///
    /// # 返回
    /// - Some(pct): 有申报上限
    /// - None: 不限量 (利用率无定义,禁止除以 ∞)
    pub fn utilization_weight_pct(&self) -> Option<i64> {
        utilization_pct(self.used_weight_t, self.cap_weight_t)
    }

    /// 体积维度利用率 (百分比,四舍五入)
    pub fn utilization_volume_pct(&self) -> Option<i64> {
        utilization_pct(self.used_volume_m3, self.cap_volume_m3)
    }
}

impl CapacityHeadroom for VoyageLoad {
    /// 剩余重量: max(0, cap - used),有限时截断为非负
    ///
    /// 正常情况下可行性检查会拦住超限提交,这里的截断只是
    /// 最后一道防线,保证余量绝不以负值向外传播。
    fn remaining_weight_t(&self) -> f64 {
        remaining(self.cap_weight_t, self.used_weight_t)
    }

    fn remaining_volume_m3(&self) -> f64 {
        remaining(self.cap_volume_m3, self.used_volume_m3)
    }

    fn can_take(&self, weight_t: f64, volume_m3: f64) -> bool {
        self.remaining_weight_t() >= weight_t && self.remaining_volume_m3() >= volume_m3
    }
}

/// 申报容量换算: 缺失/非法值视为不限量
fn declared_cap(cap: Option<f64>) -> f64 {
    match cap {
        Some(c) if c.is_finite() && c >= 0.0 => c,
        _ => f64::INFINITY,
    }
}

fn remaining(cap: f64, used: f64) -> f64 {
    if cap.is_finite() {
        (cap - used).max(0.0)
    } else {
        f64::INFINITY
    }
}

fn utilization_pct(used: f64, cap: f64) -> Option<i64> {
    if cap.is_finite() && cap > 0.0 {
        Some(((used / cap) * 100.0).round() as i64)
    } else {
        None
    }
}

// ==========================================
// CapacityLedger - 容量台账
// ==========================================
// 以 voyage_id 为键的 VoyageLoad 集合。
// 提交一票后只原地更新被选中的条目,其余条目不重算。
#[derive(Debug, Clone, Default)]
pub struct CapacityLedger {
    entries: HashMap<String, VoyageLoad>,
}

impl CapacityLedger {
    /// 从航次及其在册配载重建台账
    pub fn build(voyages: &[VoyageWithAssignments]) -> Self {
        let mut entries = HashMap::with_capacity(voyages.len());
        for item in voyages {
            let mut load = VoyageLoad::for_voyage(&item.voyage);
            for cargo in &item.cargo {
                load.add_cargo(
                    sanitize(cargo.weight_t),
                    sanitize(cargo.volume_m3),
                );
            }
            entries.insert(item.voyage.id.clone(), load);
        }
        Self { entries }
    }

    /// 查询单航次条目
    pub fn get(&self, voyage_id: &str) -> Option<&VoyageLoad> {
        self.entries.get(voyage_id)
    }

    /// 提交一票后的原地更新 (只动被选中的航次)
    pub fn apply_commit(&mut self, voyage_id: &str, weight_t: f64, volume_m3: f64) {
        if let Some(load) = self.entries.get_mut(voyage_id) {
            load.add_cargo(weight_t, volume_m3);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 在册货载字段的空值处理 (与运单有效载量口径一致)
fn sanitize(value: Option<f64>) -> f64 {
    let v = value.unwrap_or(0.0);
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

// ==========================================
// LedgerSnapshot - 带时效的台账快照
// ==========================================
// 取代隐式的模块级容量缓存: 快照是显式构造、显式传入
// 单次批量运行的对象,时效契约由数据访问层持有。
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub ledger: CapacityLedger,
    pub generated_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

impl LedgerSnapshot {
    pub fn new(ledger: CapacityLedger, generated_at: DateTime<Utc>, ttl_seconds: i64) -> Self {
        Self {
            ledger,
            generated_at,
            ttl_seconds,
        }
    }

    /// 快照是否已过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.generated_at > Duration::seconds(self.ttl_seconds.max(0))
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voyage::AssignedCargo;
    use chrono::TimeZone;

    fn create_test_voyage(
        id: &str,
        weight_cap_t: Option<f64>,
        volume_cap_m3: Option<f64>,
    ) -> Voyage {
        Voyage {
            id: id.to_string(),
            voyage_code: format!("VOY-{}", id),
            vessel_name: "MV Test".to_string(),
            origin: "Mumbai".to_string(),
            destination: "Chennai".to_string(),
            depart_at: Some(Utc.with_ymd_and_hms(2025, 8, 10, 0, 0, 0).unwrap()),
            arrive_by: Some(Utc.with_ymd_and_hms(2025, 8, 15, 0, 0, 0).unwrap()),
            weight_cap_t,
            volume_cap_m3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_sums_existing_cargo() {
        let voyages = vec![VoyageWithAssignments {
            voyage: create_test_voyage("v1", Some(20.0), Some(40.0)),
            cargo: vec![
                AssignedCargo {
                    shipment_id: "s1".to_string(),
                    weight_t: Some(12.5),
                    volume_m3: Some(28.0),
                },
                AssignedCargo {
                    shipment_id: "s2".to_string(),
                    weight_t: None, // 空值按 0 计
                    volume_m3: Some(5.0),
                },
            ],
        }];

        let ledger = CapacityLedger::build(&voyages);
        let load = ledger.get("v1").unwrap();

        assert_eq!(load.used_weight_t, 12.5);
        assert_eq!(load.used_volume_m3, 33.0);
        assert_eq!(load.assigned_count, 2);
        assert_eq!(load.remaining_weight_t(), 7.5);
        assert_eq!(load.remaining_volume_m3(), 7.0);
    }

    #[test]
    fn test_unlimited_capacity() {
        let voyages = vec![VoyageWithAssignments {
            voyage: create_test_voyage("v1", None, None),
            cargo: vec![],
        }];

        let ledger = CapacityLedger::build(&voyages);
        let load = ledger.get("v1").unwrap();

        assert!(load.remaining_weight_t().is_infinite());
        assert!(load.can_take(1000.0, 1000.0));
        assert_eq!(load.utilization_weight_pct(), None); // 不限量不计算利用率
    }

    #[test]
    fn test_apply_commit_updates_only_target() {
        let voyages = vec![
            VoyageWithAssignments {
                voyage: create_test_voyage("v1", Some(20.0), Some(40.0)),
                cargo: vec![],
            },
            VoyageWithAssignments {
                voyage: create_test_voyage("v2", Some(30.0), Some(60.0)),
                cargo: vec![],
            },
        ];

        let mut ledger = CapacityLedger::build(&voyages);
        ledger.apply_commit("v1", 12.5, 28.0);

        assert_eq!(ledger.get("v1").unwrap().used_weight_t, 12.5);
        assert_eq!(ledger.get("v1").unwrap().assigned_count, 1);
        assert_eq!(ledger.get("v2").unwrap().used_weight_t, 0.0);
    }

    #[test]
    fn test_remaining_never_negative() {
        let voyages = vec![VoyageWithAssignments {
            voyage: create_test_voyage("v1", Some(10.0), Some(10.0)),
            cargo: vec![AssignedCargo {
                shipment_id: "s1".to_string(),
                weight_t: Some(15.0), // 构造性超限 (不应发生,防御性验证)
                volume_m3: Some(4.0),
            }],
        }];

        let ledger = CapacityLedger::build(&voyages);
        let load = ledger.get("v1").unwrap();

        assert_eq!(load.remaining_weight_t(), 0.0); // 截断为 0,不传播负值
        assert_eq!(load.remaining_volume_m3(), 6.0);
    }

    #[test]
    fn test_utilization_pct() {
        let voyages = vec![VoyageWithAssignments {
            voyage: create_test_voyage("v1", Some(20.0), None),
            cargo: vec![AssignedCargo {
                shipment_id: "s1".to_string(),
                weight_t: Some(12.5),
                volume_m3: Some(28.0),
            }],
        }];

        let ledger = CapacityLedger::build(&voyages);
        let load = ledger.get("v1").unwrap();

        assert_eq!(load.utilization_weight_pct(), Some(63)); // 12.5/20 = 62.5% -> 63
        assert_eq!(load.utilization_volume_pct(), None);
    }

    #[test]
    fn test_snapshot_expiry() {
        let generated_at = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();
        let snapshot = LedgerSnapshot::new(CapacityLedger::default(), generated_at, 300);

        assert!(!snapshot.is_expired(generated_at + Duration::seconds(299)));
        assert!(snapshot.is_expired(generated_at + Duration::seconds(301)));
    }
}
