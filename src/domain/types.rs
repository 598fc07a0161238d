// ==========================================
// 海运航次配载系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 运单状态 (Shipment Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Created,   // 已创建
    InTransit, // 运输中
    Delivered, // 已送达
    Returned,  // 已退回
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipmentStatus::Created => write!(f, "CREATED"),
            ShipmentStatus::InTransit => write!(f, "IN_TRANSIT"),
            ShipmentStatus::Delivered => write!(f, "DELIVERED"),
            ShipmentStatus::Returned => write!(f, "RETURNED"),
        }
    }
}

impl ShipmentStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CREATED" => ShipmentStatus::Created,
            "IN_TRANSIT" => ShipmentStatus::InTransit,
            "DELIVERED" => ShipmentStatus::Delivered,
            "RETURNED" => ShipmentStatus::Returned,
            _ => ShipmentStatus::Created, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Created => "CREATED",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Returned => "RETURNED",
        }
    }

    /// 是否允许参与配载
    ///
    /// 已送达/已退回的运单不再占用航次舱位
    pub fn is_assignable(&self) -> bool {
        matches!(self, ShipmentStatus::Created | ShipmentStatus::InTransit)
    }
}

// ==========================================
// 排序策略模式 (Scoring Mode)
// ==========================================
// 同一套候选排序引擎的三种命名策略,由调用方意图选择:
// - SPREAD_LOAD: 单票分配默认,余量大者优先 (分摊负载)
// - TIGHT_PACK: 装载预览场景,余量小者优先 (紧凑装载)
// - PRIORITY_WEIGHTED: 按航次补位场景,优先货压倒一切
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringMode {
    SpreadLoad,
    TightPack,
    PriorityWeighted,
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::SpreadLoad => write!(f, "SPREAD_LOAD"),
            ScoringMode::TightPack => write!(f, "TIGHT_PACK"),
            ScoringMode::PriorityWeighted => write!(f, "PRIORITY_WEIGHTED"),
        }
    }
}

impl ScoringMode {
    /// 从字符串解析策略模式
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "TIGHT_PACK" => ScoringMode::TightPack,
            "PRIORITY_WEIGHTED" => ScoringMode::PriorityWeighted,
            _ => ScoringMode::SpreadLoad, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ScoringMode::SpreadLoad => "SPREAD_LOAD",
            ScoringMode::TightPack => "TIGHT_PACK",
            ScoringMode::PriorityWeighted => "PRIORITY_WEIGHTED",
        }
    }
}

// ==========================================
// 时间窗判定模式 (Time Fit Mode)
// ==========================================
// 两个调用场景对缺失/无法解析时间戳的容忍度不同,必须保留这一不对称:
// - STRICT: 提交路径(真金白银的配载),时间缺失视为不适配 (fail closed)
// - ADVISORY: 提示路径(仅生成建议文本),时间缺失视为适配 (fail open)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFitMode {
    Strict,
    Advisory,
}

// ==========================================
// 装载跳过原因 (Skip Reason)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "weight")]
    Weight, // 重量超限
    #[serde(rename = "volume")]
    Volume, // 体积超限
    #[serde(rename = "weight+volume")]
    WeightAndVolume, // 双维度超限
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Weight => write!(f, "weight"),
            SkipReason::Volume => write!(f, "volume"),
            SkipReason::WeightAndVolume => write!(f, "weight+volume"),
        }
    }
}

// ==========================================
// 主导资源维度 (Dominant Dimension)
// ==========================================
// 装载预览的降序排序依据: 有限且更紧的容量维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DominantDimension {
    Weight, // 以重量 (吨) 为主导
    Volume, // 以体积 (m³) 为主导
}

impl fmt::Display for DominantDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DominantDimension::Weight => write!(f, "WEIGHT"),
            DominantDimension::Volume => write!(f, "VOLUME"),
        }
    }
}
