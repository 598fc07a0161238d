// ==========================================
// 海运航次配载系统 - 建议文本边界 (文本生成协作方)
// ==========================================
// 职责: 定义建议文本生成 trait,实现依赖倒置
// 说明: Engine 层定义 trait,外部服务适配层实现
// 红线: 协作方故障必须降级为确定性兜底文本,
//       绝不让确定性配载结果因建议文本失败而报错
// ==========================================

use crate::domain::ledger::{CapacityHeadroom, VoyageLoad};
use crate::domain::shipment::Shipment;
use crate::domain::voyage::Voyage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// 错误类型
// ==========================================

/// 建议文本协作方错误
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("建议服务不可用: {0}")]
    Unavailable(String),

    #[error("建议服务超时")]
    Timeout,

    #[error("建议服务配额耗尽: {0}")]
    QuotaExceeded(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// AdvisoryContext - 建议请求上下文
// ==========================================

/// 建议上下文中的候选航次摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryCandidate {
    pub voyage_code: String,
    pub origin: String,
    pub destination: String,
    pub depart_at: Option<String>, // RFC 3339
    pub arrive_by: Option<String>,
    pub remaining_weight_t: Option<f64>, // None = 不限量
    pub remaining_volume_m3: Option<f64>,
}

impl AdvisoryCandidate {
    pub fn from_voyage(voyage: &Voyage, load: &VoyageLoad) -> Self {
        Self {
            voyage_code: voyage.voyage_code.clone(),
            origin: voyage.origin.clone(),
            destination: voyage.destination.clone(),
            depart_at: voyage.depart_at.map(|t| t.to_rfc3339()),
            arrive_by: voyage.arrive_by.map(|t| t.to_rfc3339()),
            remaining_weight_t: finite_or_none(load.remaining_weight_t()),
            remaining_volume_m3: finite_or_none(load.remaining_volume_m3()),
        }
    }
}

/// 建议上下文中的滞留运单 (无直达可行航次)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryShipment {
    pub shipment_code: String,
    pub origin: String,
    pub destination: String,
    pub ship_date: Option<String>,
    pub transit_days: i32,
    pub weight_t: f64,
    pub volume_m3: f64,
    pub candidates: Vec<AdvisoryCandidate>, // 临近候选 (降级匹配)
}

impl AdvisoryShipment {
    pub fn from_shipment(shipment: &Shipment, candidates: Vec<AdvisoryCandidate>) -> Self {
        Self {
            shipment_code: shipment.shipment_code.clone(),
            origin: shipment.origin.clone(),
            destination: shipment.destination.clone(),
            ship_date: shipment.ship_date.map(|t| t.to_rfc3339()),
            transit_days: shipment.transit_days,
            weight_t: shipment.effective_weight_t(),
            volume_m3: shipment.effective_volume_m3(),
            candidates,
        }
    }
}

/// 多段中转建议的结构化上下文
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisoryContext {
    pub shipments: Vec<AdvisoryShipment>,
}

impl AdvisoryContext {
    pub fn is_empty(&self) -> bool {
        self.shipments.is_empty()
    }

    /// 渲染为紧凑文本块 (每票一段: 运单行 + 候选航次行)
    pub fn render(&self) -> String {
        let mut blocks = Vec::with_capacity(self.shipments.len());
        for s in &self.shipments {
            let mut lines = vec![format!(
                "SHP {} | from={} to={} | ship_date={} | transit_days={} | weight_t={} | volume_m3={}",
                s.shipment_code,
                s.origin,
                s.destination,
                s.ship_date.as_deref().unwrap_or("missing"),
                s.transit_days,
                s.weight_t,
                s.volume_m3
            )];
            if s.candidates.is_empty() {
                lines.push("(no close voyages)".to_string());
            } else {
                for c in &s.candidates {
                    lines.push(format!(
                        "- {}: {}→{} | dep {} | arr {} | rem_w {} | rem_v {}",
                        c.voyage_code,
                        c.origin,
                        c.destination,
                        c.depart_at.as_deref().unwrap_or("missing"),
                        c.arrive_by.as_deref().unwrap_or("missing"),
                        fmt_rem(c.remaining_weight_t),
                        fmt_rem(c.remaining_volume_m3)
                    ));
                }
            }
            blocks.push(lines.join("\n"));
        }
        blocks.join("\n\n")
    }
}

// ==========================================
// 建议文本 Trait
// ==========================================

/// 建议文本生成协作方
///
/// Engine 层定义,外部服务适配层实现。
/// 输出仅为建议文本 (多段中转提示、装载解说),
/// 绝不自动提交任何配载: 外部提案必须经
/// `SuggestionGate` 重新验证后才可能落库。
#[async_trait]
pub trait RouteAdvisor: Send + Sync {
    /// 生成建议文本
    ///
    /// # 参数
    /// - `context`: 结构化上下文
    ///
    /// # 返回
    /// - Ok(String): 建议文本 (逐行)
    /// - Err: 协作方故障,调用方降级为兜底文本
    async fn advise(&self, context: &AdvisoryContext) -> Result<String, AdvisorError>;
}

/// 空操作建议方
///
/// 用于不接入外部服务的场景 (如单元测试),恒返回"不可用",
/// 驱动调用方走兜底文本路径。
#[derive(Debug, Clone, Default)]
pub struct NoOpAdvisor;

#[async_trait]
impl RouteAdvisor for NoOpAdvisor {
    async fn advise(&self, _context: &AdvisoryContext) -> Result<String, AdvisorError> {
        Err(AdvisorError::Unavailable("advisor not configured".to_string()))
    }
}

/// 确定性兜底文本 (每票一行)
pub fn fallback_hint(shipment_code: &str) -> String {
    format!(
        "HINT {}: no direct lane; consider multi-leg via nearby ports within time window and capacity",
        shipment_code
    )
}

// ==========================================
// 辅助函数
// ==========================================

fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn fmt_rem(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => "unlimited".to_string(),
    }
}
