// ==========================================
// 海运航次配载系统 - 可行性检查引擎
// ==========================================
// 职责: 提供运单-航次适配判定的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================
// 三道门控全部通过才算可行:
// 1) 航线门控: 起运港/目的港严格相等 (忽略大小写与首尾空白)
// 2) 时间门控: 离港不早于起运日期 (允许小时级宽限),
//              到港不早于运单自身 ETA
// 3) 容量门控: 两个维度的余量均不小于运单有效载量
// ==========================================

use crate::domain::ledger::{CapacityHeadroom, VoyageLoad};
use crate::domain::shipment::Shipment;
use crate::domain::types::TimeFitMode;
use crate::domain::voyage::Voyage;
use chrono::{DateTime, Duration, Utc};

/// 默认离港宽限 (小时),吸收时钟/时区噪声
pub const DEFAULT_DEPART_SLACK_HOURS: i64 = 24;

/// 离港宽限允许的配置上限 (小时)
pub const MAX_DEPART_SLACK_HOURS: i64 = 24;

// ==========================================
// FeasibilityChecker - 可行性检查引擎
// ==========================================
pub struct FeasibilityChecker {
    depart_slack_hours: i64,
}

impl FeasibilityChecker {
    /// 构造函数
    ///
    /// # 参数
    /// - `depart_slack_hours`: 离港宽限 (小时),截断至 [0, 24]
    pub fn new(depart_slack_hours: i64) -> Self {
        Self {
            depart_slack_hours: depart_slack_hours.clamp(0, MAX_DEPART_SLACK_HOURS),
        }
    }

    pub fn depart_slack_hours(&self) -> i64 {
        self.depart_slack_hours
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 完整可行性判定 (提交路径,时间缺失 fail closed)
    ///
    /// # 参数
    /// - `shipment`: 运单
    /// - `voyage`: 候选航次
    /// - `load`: 该航次的台账条目
    ///
    /// # 返回
    /// - (bool, Vec<String>): 是否可行 + 判定原因
    pub fn check(
        &self,
        shipment: &Shipment,
        voyage: &Voyage,
        load: &VoyageLoad,
    ) -> (bool, Vec<String>) {
        let mut reasons = Vec::new();

        // 门控 1: 航线匹配
        if !Self::lane_matches(voyage, shipment) {
            reasons.push(format!(
                "LANE_MISMATCH: voyage={}→{}, shipment={}→{}",
                voyage.origin, voyage.destination, shipment.origin, shipment.destination
            ));
            return (false, reasons);
        }

        // 门控 2: 时间窗 (提交路径恒为 STRICT)
        if !self.window_fits(
            shipment.ship_date,
            shipment.transit_days,
            voyage.depart_at,
            voyage.arrive_by,
            TimeFitMode::Strict,
        ) {
            reasons.push(format!(
                "WINDOW_MISS: ship_date={}, transit_days={}, depart_at={}, arrive_by={}",
                fmt_ts(shipment.ship_date),
                shipment.transit_days,
                fmt_ts(voyage.depart_at),
                fmt_ts(voyage.arrive_by)
            ));
            return (false, reasons);
        }

        // 门控 3: 容量余量
        let need_w = shipment.effective_weight_t();
        let need_v = shipment.effective_volume_m3();
        if !load.can_take(need_w, need_v) {
            reasons.push(format!(
                "CAPACITY_SHORT: need_w={:.3}, rem_w={}, need_v={:.3}, rem_v={}",
                need_w,
                fmt_cap(load.remaining_weight_t()),
                need_v,
                fmt_cap(load.remaining_volume_m3())
            ));
            return (false, reasons);
        }

        reasons.push("FEASIBLE: lane/window/capacity ok".to_string());
        (true, reasons)
    }

    /// 布尔简写
    pub fn fits(&self, shipment: &Shipment, voyage: &Voyage, load: &VoyageLoad) -> bool {
        self.check(shipment, voyage, load).0
    }

    /// 时间窗判定
    ///
    /// 规则:
    /// - depart_at + slack >= ship_date (允许离港略早于起运,吸收时钟噪声)
    /// - arrive_by >= ship_date + transit_days (航次不得早于运单自身 ETA 到港)
    ///
    /// 缺失/无法解析的时间戳按模式处理 (两个调用场景风险容忍度不同,
    /// 不对称是刻意保留的,不要"修复"):
    /// - STRICT: 视为不适配 (提交路径 fail closed)
    /// - ADVISORY: 视为适配 (提示路径 fail open,建议文本无资金风险)
    pub fn window_fits(
        &self,
        ship_date: Option<DateTime<Utc>>,
        transit_days: i32,
        depart_at: Option<DateTime<Utc>>,
        arrive_by: Option<DateTime<Utc>>,
        mode: TimeFitMode,
    ) -> bool {
        let (Some(sd), Some(dep), Some(arr)) = (ship_date, depart_at, arrive_by) else {
            return mode == TimeFitMode::Advisory;
        };

        let eta = sd + Duration::days(transit_days.max(0) as i64);
        dep + Duration::hours(self.depart_slack_hours) >= sd && arr >= eta
    }

    /// 航线匹配: 起运港与目的港均严格相等 (忽略大小写与首尾空白)
    ///
    /// 这是提交路径的唯一口径; 前缀/近似匹配只存在于提示路径的
    /// 候选收集 (`near_candidate`),绝不用于配载判定。
    pub fn lane_matches(voyage: &Voyage, shipment: &Shipment) -> bool {
        norm(&voyage.origin) == norm(&shipment.origin)
            && norm(&voyage.destination) == norm(&shipment.destination)
    }

    // ==========================================
    // 提示路径候选收集 (降级匹配,仅供建议文本)
    // ==========================================

    /// 航线相似度 (0.0 - 1.0)
    ///
    /// 每个端点: 完全相等 +0.5,前缀包含 +0.25
    pub fn lane_affinity(voyage: &Voyage, shipment: &Shipment) -> f64 {
        endpoint_affinity(&voyage.origin, &shipment.origin)
            + endpoint_affinity(&voyage.destination, &shipment.destination)
    }

    /// 是否为提示路径的"临近候选"
    ///
    /// 航线部分重合,或离港时间与起运日期相差不超过 `max_depart_gap_days`。
    /// 时间缺失时该项不成立 (航线项仍可命中)。
    pub fn near_candidate(
        shipment: &Shipment,
        voyage: &Voyage,
        max_depart_gap_days: i64,
    ) -> bool {
        if Self::lane_affinity(voyage, shipment) > 0.0 {
            return true;
        }
        match (voyage.depart_at, shipment.ship_date) {
            (Some(dep), Some(sd)) => {
                (dep - sd).num_days().abs() <= max_depart_gap_days
            }
            _ => false,
        }
    }
}

impl Default for FeasibilityChecker {
    fn default() -> Self {
        Self::new(DEFAULT_DEPART_SLACK_HOURS)
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

fn endpoint_affinity(a: &str, b: &str) -> f64 {
    let a = norm(a);
    let b = norm(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        0.5
    } else if a.starts_with(&b) || b.starts_with(&a) {
        0.25
    } else {
        0.0
    }
}

fn fmt_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "missing".to_string())
}

fn fmt_cap(value: f64) -> String {
    if value.is_finite() {
        format!("{:.3}", value)
    } else {
        "unlimited".to_string()
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

    fn create_test_shipment(
        origin: &str,
        destination: &str,
        ship_date: Option<DateTime<Utc>>,
        transit_days: i32,
        weight_t: Option<f64>,
        volume_m3: Option<f64>,
    ) -> Shipment {
        Shipment {
            id: "s-1".to_string(),
            shipment_code: "SHP-101".to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            status: ShipmentStatus::Created,
            is_priority: false,
            ship_date,
            transit_days,
            weight_t,
            volume_m3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn create_test_voyage(
        origin: &str,
        destination: &str,
        depart_at: Option<DateTime<Utc>>,
        arrive_by: Option<DateTime<Utc>>,
        weight_cap_t: Option<f64>,
        volume_cap_m3: Option<f64>,
    ) -> Voyage {
        Voyage {
            id: "v-1".to_string(),
            voyage_code: "VOY-001".to_string(),
            vessel_name: "MV Test".to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            depart_at,
            arrive_by,
            weight_cap_t,
            volume_cap_m3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn empty_load(voyage: &Voyage) -> VoyageLoad {
        VoyageLoad::for_voyage(voyage)
    }

    // ==========================================
    // 测试 1: 三道门控全通过
    // ==========================================

    #[test]
    fn test_check_all_gates_pass() {
        // 场景: V1 Mumbai→Chennai 8/10 离港 8/15 到港, 容量 20t/40m³;
        //       S1 Mumbai→Chennai 8/9 起运 5 天在途 12.5t/28m³
        let checker = FeasibilityChecker::default();
        let shipment = create_test_shipment(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 9)),
            5,
            Some(12.5),
            Some(28.0),
        );
        let voyage = create_test_voyage(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            Some(20.0),
            Some(40.0),
        );

        let (feasible, reasons) = checker.check(&shipment, &voyage, &empty_load(&voyage));
        assert!(feasible);
        assert!(reasons[0].contains("FEASIBLE"));
    }

    // ==========================================
    // 测试 2: 航线门控
    // ==========================================

    #[test]
    fn test_lane_match_case_and_whitespace_insensitive() {
        let shipment =
            create_test_shipment("  mumbai ", "CHENNAI", Some(ts(2025, 8, 9)), 5, None, None);
        let voyage = create_test_voyage(
            "Mumbai",
            "chennai ",
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            None,
            None,
        );
        assert!(FeasibilityChecker::lane_matches(&voyage, &shipment));
    }

    #[test]
    fn test_lane_mismatch_rejected() {
        let checker = FeasibilityChecker::default();
        let shipment =
            create_test_shipment("Mumbai", "Kochi", Some(ts(2025, 8, 9)), 5, None, None);
        let voyage = create_test_voyage(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            None,
            None,
        );

        let (feasible, reasons) = checker.check(&shipment, &voyage, &empty_load(&voyage));
        assert!(!feasible);
        assert!(reasons[0].contains("LANE_MISMATCH"));
    }

    #[test]
    fn test_lane_prefix_is_not_a_match_on_commit_path() {
        // "Chennai Port" 与 "Chennai" 前缀重合只对提示路径有意义
        let shipment =
            create_test_shipment("Mumbai", "Chennai", Some(ts(2025, 8, 9)), 5, None, None);
        let voyage = create_test_voyage(
            "Mumbai",
            "Chennai Port",
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            None,
            None,
        );

        assert!(!FeasibilityChecker::lane_matches(&voyage, &shipment));
        assert!(FeasibilityChecker::near_candidate(&shipment, &voyage, 10));
    }

    // ==========================================
    // 测试 3: 时间门控
    // ==========================================

    #[test]
    fn test_window_depart_before_ship_date_within_slack() {
        let checker = FeasibilityChecker::new(24);
        // 离港比起运早 12 小时,在 24h 宽限内
        let sd = Utc.with_ymd_and_hms(2025, 8, 10, 12, 0, 0).unwrap();
        let dep = Utc.with_ymd_and_hms(2025, 8, 10, 0, 0, 0).unwrap();
        let arr = ts(2025, 8, 20);
        assert!(checker.window_fits(Some(sd), 3, Some(dep), Some(arr), TimeFitMode::Strict));

        // 零宽限时同样的偏差不再适配
        let strict = FeasibilityChecker::new(0);
        assert!(!strict.window_fits(Some(sd), 3, Some(dep), Some(arr), TimeFitMode::Strict));
    }

    #[test]
    fn test_window_arrive_before_eta_rejected() {
        let checker = FeasibilityChecker::default();
        // ETA = 8/9 + 5 天 = 8/14, 航次 8/13 到港 → 不适配
        assert!(!checker.window_fits(
            Some(ts(2025, 8, 9)),
            5,
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 13)),
            TimeFitMode::Strict
        ));
    }

    #[test]
    fn test_window_missing_dates_fail_closed_strict() {
        let checker = FeasibilityChecker::default();
        assert!(!checker.window_fits(
            None,
            5,
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            TimeFitMode::Strict
        ));
        assert!(!checker.window_fits(
            Some(ts(2025, 8, 9)),
            5,
            None,
            Some(ts(2025, 8, 15)),
            TimeFitMode::Strict
        ));
    }

    #[test]
    fn test_window_missing_dates_fail_open_advisory() {
        let checker = FeasibilityChecker::default();
        assert!(checker.window_fits(
            None,
            5,
            None,
            None,
            TimeFitMode::Advisory
        ));
    }

    // ==========================================
    // 测试 4: 容量门控
    // ==========================================

    #[test]
    fn test_capacity_short_rejected_with_reason() {
        let checker = FeasibilityChecker::default();
        let shipment = create_test_shipment(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 9)),
            5,
            Some(15.0),
            Some(5.0),
        );
        let voyage = create_test_voyage(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            Some(20.0),
            Some(40.0),
        );
        let mut load = empty_load(&voyage);
        load.add_cargo(12.5, 28.0); // 剩余 7.5t / 12m³

        let (feasible, reasons) = checker.check(&shipment, &voyage, &load);
        assert!(!feasible);
        assert!(reasons[0].contains("CAPACITY_SHORT"));
        assert!(reasons[0].contains("need_w=15.000"));
    }

    #[test]
    fn test_unlimited_capacity_always_fits_dimension() {
        let checker = FeasibilityChecker::default();
        let shipment = create_test_shipment(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 9)),
            5,
            Some(1000.0),
            Some(1000.0),
        );
        let voyage = create_test_voyage(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            None, // 双维度不限量
            None,
        );

        assert!(checker.fits(&shipment, &voyage, &empty_load(&voyage)));
    }

    #[test]
    fn test_missing_weight_treated_as_zero() {
        let checker = FeasibilityChecker::default();
        let shipment =
            create_test_shipment("Mumbai", "Chennai", Some(ts(2025, 8, 9)), 5, None, None);
        let voyage = create_test_voyage(
            "Mumbai",
            "Chennai",
            Some(ts(2025, 8, 10)),
            Some(ts(2025, 8, 15)),
            Some(0.0), // 上限 0 也能装下 0 载量
            Some(0.0),
        );

        assert!(checker.fits(&shipment, &voyage, &empty_load(&voyage)));
    }

    // ==========================================
    // 测试 5: 提示路径候选
    // ==========================================

    #[test]
    fn test_lane_affinity_scoring() {
        let shipment =
            create_test_shipment("Mumbai", "Chennai", Some(ts(2025, 8, 9)), 5, None, None);
        let exact = create_test_voyage("Mumbai", "Chennai", None, None, None, None);
        let prefix = create_test_voyage("Mumbai", "Chennai Port", None, None, None, None);
        let none = create_test_voyage("Goa", "Kochi", None, None, None, None);

        assert_eq!(FeasibilityChecker::lane_affinity(&exact, &shipment), 1.0);
        assert_eq!(FeasibilityChecker::lane_affinity(&prefix, &shipment), 0.75);
        assert_eq!(FeasibilityChecker::lane_affinity(&none, &shipment), 0.0);
    }

    #[test]
    fn test_near_candidate_by_depart_gap() {
        let shipment =
            create_test_shipment("Mumbai", "Chennai", Some(ts(2025, 8, 9)), 5, None, None);
        let voyage = create_test_voyage(
            "Goa",
            "Kochi",
            Some(ts(2025, 8, 15)),
            Some(ts(2025, 8, 20)),
            None,
            None,
        );

        assert!(FeasibilityChecker::near_candidate(&shipment, &voyage, 10));
        assert!(!FeasibilityChecker::near_candidate(&shipment, &voyage, 3));
    }
}
