// ==========================================
// 海运航次配载系统 - 运单领域模型
// ==========================================

use crate::domain::types::ShipmentStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Shipment - 运单主数据
// ==========================================
// 用途: 录入层写入,引擎层只读
// 对齐: shipment 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    // ===== 主键 =====
    pub id: String,            // 内部行标识 (uuid)
    pub shipment_code: String, // 外部运单号 (人工编号,唯一,如 "SHP-101")

    // ===== 航线 =====
    pub origin: String,      // 起运港城市
    pub destination: String, // 目的港城市

    // ===== 状态 =====
    pub status: ShipmentStatus, // 运单状态 (CREATED/IN_TRANSIT/DELIVERED/RETURNED)
    pub is_priority: bool,      // 优先货标记

    // ===== 时间信息 =====
    // ship_date 在仓储层宽容解析,历史脏数据无法解析时为 None
    pub ship_date: Option<DateTime<Utc>>, // 起运日期
    pub transit_days: i32,                // 计划在途天数

    // ===== 载量维度 =====
    pub weight_t: Option<f64>,  // 重量 (吨,可缺失)
    pub volume_m3: Option<f64>, // 体积 (m³,可缺失)

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl Shipment {
    /// 预计送达时间 (起运日期 + 在途天数)
    ///
    /// # 返回
    /// - Some(DateTime): 预计送达时间
    /// - None: 起运日期缺失/无法解析
    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> {
        self.ship_date
            .map(|d| d + Duration::days(self.transit_days.max(0) as i64))
    }

    /// 有效重量 (吨)
    ///
    /// 缺失/非有限/负值统一按 0 处理: 该运单在该维度不占用舱位。
    /// 这是刻意的宽容默认,避免数据缺口阻断本可成立的配载;
    /// 代价是重量确实未知时存在少计风险 (见 DESIGN.md 决策 1)。
    pub fn effective_weight_t(&self) -> f64 {
        let w = self.weight_t.unwrap_or(0.0);
        if w.is_finite() && w > 0.0 {
            w
        } else {
            0.0
        }
    }

    /// 有效体积 (m³),空值处理规则与重量一致
    pub fn effective_volume_m3(&self) -> f64 {
        let v = self.volume_m3.unwrap_or(0.0);
        if v.is_finite() && v > 0.0 {
            v
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_shipment() -> Shipment {
        Shipment {
            id: "s-1".to_string(),
            shipment_code: "SHP-101".to_string(),
            origin: "Mumbai".to_string(),
            destination: "Chennai".to_string(),
            status: ShipmentStatus::Created,
            is_priority: false,
            ship_date: Some(Utc.with_ymd_and_hms(2025, 8, 9, 0, 0, 0).unwrap()),
            transit_days: 5,
            weight_t: Some(12.5),
            volume_m3: Some(28.0),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_estimated_delivery() {
        let shipment = create_test_shipment();
        assert_eq!(
            shipment.estimated_delivery(),
            Some(Utc.with_ymd_and_hms(2025, 8, 14, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_estimated_delivery_missing_ship_date() {
        let mut shipment = create_test_shipment();
        shipment.ship_date = None;
        assert_eq!(shipment.estimated_delivery(), None);
    }

    #[test]
    fn test_effective_values_null_as_zero() {
        let mut shipment = create_test_shipment();
        shipment.weight_t = None;
        shipment.volume_m3 = Some(f64::NAN);
        assert_eq!(shipment.effective_weight_t(), 0.0);
        assert_eq!(shipment.effective_volume_m3(), 0.0);
    }

    #[test]
    fn test_effective_values_negative_clamped() {
        let mut shipment = create_test_shipment();
        shipment.weight_t = Some(-3.0);
        assert_eq!(shipment.effective_weight_t(), 0.0);
    }
}
