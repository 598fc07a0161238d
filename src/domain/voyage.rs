// ==========================================
// 海运航次配载系统 - 航次领域模型
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Voyage - 航次主数据
// ==========================================
// 用途: 航线计划层写入,引擎层只读
// 对齐: voyage 表
// 约束: 容量字段缺失表示该维度不限量;
//       实际占用始终由在册配载求和得出,实体上不维护累计值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voyage {
    // ===== 主键 =====
    pub id: String,          // 内部行标识 (uuid)
    pub voyage_code: String, // 外部航次号 (唯一,如 "VOY-001")

    // ===== 基础信息 =====
    pub vessel_name: String, // 船名

    // ===== 航线 =====
    pub origin: String,      // 起运港城市
    pub destination: String, // 目的港城市

    // ===== 时间窗 =====
    // 仓储层宽容解析,脏数据无法解析时为 None
    pub depart_at: Option<DateTime<Utc>>, // 离港时间
    pub arrive_by: Option<DateTime<Utc>>, // 最迟到港时间 (约定 depart_at <= arrive_by)

    // ===== 容量 =====
    pub weight_cap_t: Option<f64>,  // 重量上限 (吨,缺失 = 不限)
    pub volume_cap_m3: Option<f64>, // 体积上限 (m³,缺失 = 不限)

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// VoyageAssignment - 配载关系 (连接实体)
// ==========================================
// 约束: (voyage_id, shipment_id) 唯一;
//       shipment_id 全表唯一: 单票同一时刻至多一个在册航次,
//       换船走"同事务删旧插新"的移动语义,绝不追加
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoyageAssignment {
    pub id: String,                // 行标识 (uuid)
    pub voyage_id: String,         // 航次行标识
    pub shipment_id: String,       // 运单行标识
    pub created_at: DateTime<Utc>, // 配载时间
}

// ==========================================
// AssignedCargo - 在册货载摘要
// ==========================================
// 用途: 台账重建时按航次汇总占用,只携带需要求和的字段
#[derive(Debug, Clone)]
pub struct AssignedCargo {
    pub shipment_id: String,
    pub weight_t: Option<f64>,
    pub volume_m3: Option<f64>,
}

// ==========================================
// VoyageWithAssignments - 航次及其在册配载
// ==========================================
// 用途: 批量配载运行开始时一次取出,供台账构建
#[derive(Debug, Clone)]
pub struct VoyageWithAssignments {
    pub voyage: Voyage,
    pub cargo: Vec<AssignedCargo>,
}
