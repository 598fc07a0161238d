// ==========================================
// 海运航次配载系统 - 配载操作接口
// ==========================================
// 职责: 面向外层 (Web 处理器) 的单票配载操作:
//       自动选船、移动、解除、双向建议,以及最小化的实体录入
// 约定: 自动提交路径经由完整可行性检查,操作员指定目标的
//       移动至少经由容量校验;落库一律走原子移动。
//       本层只做编排与错误转换,不实现规则

// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AssignConfigReader;
use crate::domain::ledger::{CapacityHeadroom, VoyageLoad};
use crate::domain::shipment::Shipment;
use crate::domain::types::{ScoringMode, ShipmentStatus};
use crate::domain::voyage::Voyage;
use crate::engine::assigner::ShipmentAssigner;
use crate::engine::feasibility::FeasibilityChecker;
use crate::engine::scoring::{CandidateVoyage, ScoringPolicy};
use crate::repository::store::SqliteAssignmentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

// ==========================================
// 输入/输出结构
// ==========================================

/// 运单录入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShipment {
    pub shipment_code: String,
    pub origin: String,
    pub destination: String,
    pub is_priority: bool,
    pub ship_date: Option<DateTime<Utc>>,
    pub transit_days: i32,
    pub weight_t: Option<f64>,
    pub volume_m3: Option<f64>,
}

/// 航次录入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoyage {
    pub voyage_code: String,
    pub vessel_name: String,
    pub origin: String,
    pub destination: String,
    pub depart_at: Option<DateTime<Utc>>,
    pub arrive_by: Option<DateTime<Utc>>,
    pub weight_cap_t: Option<f64>,
    pub volume_cap_m3: Option<f64>,
}

/// 单票自动配载结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssignOutcome {
    /// 已在册,不重复配载
    AlreadyAssigned { voyage_code: String },
    /// 选中并提交
    Assigned { voyage_code: String },
    /// 无可行航次 (航线/时间窗/容量),未提交任何配载
    NoFeasibleVoyage,
}

/// 单票的候选航次建议 (只读)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoyageSuggestion {
    pub voyage_code: String,
    pub vessel_name: String,
    pub origin: String,
    pub destination: String,
    pub depart_at: Option<DateTime<Utc>>,
    pub arrive_by: Option<DateTime<Utc>>,
    pub assigned_count: usize,
    pub remaining_weight_t: Option<f64>, // None = 不限量
    pub remaining_volume_m3: Option<f64>,
    pub utilization_weight_pct: Option<i64>, // None = 不限量,利用率无定义
    pub utilization_volume_pct: Option<i64>,
}

/// 航次补位建议中的单票
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentPick {
    pub shipment_code: String,
    pub is_priority: bool,
    pub weight_t: f64,
    pub volume_m3: f64,
}

/// 航次补位建议 (只读,贪心填充剩余容量)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoyageFillSuggestion {
    pub voyage_code: String,
    pub picks: Vec<ShipmentPick>,
    pub remaining_weight_t: Option<f64>, // 全部装入后的余量,None = 不限量
    pub remaining_volume_m3: Option<f64>,
}

// ==========================================
// AssignmentApi - 配载操作接口
// ==========================================
pub struct AssignmentApi<C>
where
    C: AssignConfigReader,
{
    store: Arc<SqliteAssignmentStore>,
    config: Arc<C>,
}

impl<C> AssignmentApi<C>
where
    C: AssignConfigReader,
{
    /// 构造函数
    pub fn new(store: Arc<SqliteAssignmentStore>, config: Arc<C>) -> Self {
        Self { store, config }
    }

    /// 按配置组装提交口径的可行性检查引擎
    async fn build_checker(&self) -> ApiResult<FeasibilityChecker> {
        let slack = self
            .config
            .get_depart_slack_hours()
            .await
            .map_err(ApiError::from_config)?;
        Ok(FeasibilityChecker::new(slack))
    }

    // ==========================================
    // 单票自动配载
    // ==========================================

    /// 为一票运单自动选择最优航次并提交
    ///
    /// 已在册的运单直接返回 AlreadyAssigned;
    /// 无可行航次返回 NoFeasibleVoyage,绝不凭空编造配载。
    #[instrument(skip(self))]
    pub async fn assign_shipment_auto(&self, shipment_code: &str) -> ApiResult<AssignOutcome> {
        let shipment = self.require_shipment(shipment_code)?;
        if !shipment.status.is_assignable() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "运单状态 {} 不允许配载",
                shipment.status
            )));
        }

        // 已在册直接返回
        if let Some(existing) = self
            .store
            .assignment_repo()
            .find_by_shipment(&shipment.id)?
        {
            let voyage_code = self
                .store
                .voyage_repo()
                .find_by_id(&existing.voyage_id)?
                .map(|v| v.voyage_code)
                .unwrap_or_else(|| existing.voyage_id.clone());
            return Ok(AssignOutcome::AlreadyAssigned { voyage_code });
        }

        let checker = self.build_checker().await?;
        let mode = self
            .config
            .get_scoring_mode()
            .await
            .map_err(ApiError::from_config)?;
        let max_voyages = self
            .config
            .get_max_candidate_voyages()
            .await
            .map_err(ApiError::from_config)?;

        let voyages_with = self
            .store
            .voyage_repo()
            .list_with_assignments(max_voyages)?;
        let ledger = crate::domain::ledger::CapacityLedger::build(&voyages_with);
        let voyages: Vec<Voyage> = voyages_with.into_iter().map(|v| v.voyage).collect();

        let assigner = ShipmentAssigner::new(checker, ScoringPolicy::new(mode));
        match assigner.assign(&shipment, &voyages, &ledger) {
            Some(decision) => {
                self.store
                    .assignment_repo()
                    .create_move(&shipment.id, &decision.voyage_id)?;
                info!(
                    shipment_code = %shipment.shipment_code,
                    voyage_code = %decision.voyage_code,
                    "单票自动配载提交"
                );
                Ok(AssignOutcome::Assigned {
                    voyage_code: decision.voyage_code,
                })
            }
            None => Ok(AssignOutcome::NoFeasibleVoyage),
        }
    }

    // ==========================================
    // 移动与解除
    // ==========================================

    /// 将运单移动到指定航次 (操作员指定目标)
    ///
    /// 先校验目标航次余量,不足返回 CapacityExceeded;
    /// 通过后执行原子移动 (同事务删旧插新)。
    #[instrument(skip(self))]
    pub async fn move_shipment(
        &self,
        shipment_code: &str,
        voyage_code: &str,
    ) -> ApiResult<String> {
        let shipment = self.require_shipment(shipment_code)?;
        let voyage = self.require_voyage(voyage_code)?;

        let load = self
            .store
            .voyage_repo()
            .load_for_voyage(&voyage.id)?
            .ok_or_else(|| ApiError::NotFound(format!("Voyage(id={})不存在", voyage.id)))?;

        let need_w = shipment.effective_weight_t();
        let need_v = shipment.effective_volume_m3();
        if !load.can_take(need_w, need_v) {
            return Err(ApiError::CapacityExceeded {
                voyage_code: voyage.voyage_code.clone(),
                detail: format!(
                    "need_w={:.3}, rem_w={}, need_v={:.3}, rem_v={}",
                    need_w,
                    fmt_rem(load.remaining_weight_t()),
                    need_v,
                    fmt_rem(load.remaining_volume_m3())
                ),
            });
        }

        self.store
            .assignment_repo()
            .create_move(&shipment.id, &voyage.id)?;
        info!(
            shipment_code = %shipment.shipment_code,
            voyage_code = %voyage.voyage_code,
            "运单移动提交"
        );
        Ok(voyage.voyage_code)
    }

    /// 解除配载
    ///
    /// # 返回
    /// - Ok(true): 解除了一条配载
    /// - Ok(false): 该航次上没有这票运单
    pub fn unassign(&self, voyage_code: &str, shipment_code: &str) -> ApiResult<bool> {
        let shipment = self.require_shipment(shipment_code)?;
        let voyage = self.require_voyage(voyage_code)?;
        Ok(self
            .store
            .assignment_repo()
            .delete(&voyage.id, &shipment.id)?)
    }

    // ==========================================
    // 双向建议 (只读)
    // ==========================================

    /// 为一票运单列出可行航次建议
    ///
    /// 口径: 航线严格匹配、离港不早于起运日期、余量充足;
    /// 排序用 TIGHT_PACK (早离港、少在册、余量小者优先)。
    pub async fn suggest_voyages(
        &self,
        shipment_code: &str,
        k: usize,
    ) -> ApiResult<Vec<VoyageSuggestion>> {
        let shipment = self.require_shipment(shipment_code)?;
        let checker = self.build_checker().await?;
        let max_voyages = self
            .config
            .get_max_candidate_voyages()
            .await
            .map_err(ApiError::from_config)?;

        let voyages = self.store.voyage_repo().list_lane_voyages(
            &shipment.origin,
            &shipment.destination,
            shipment.ship_date,
            max_voyages,
        )?;

        // 现算每个候选的占用,过滤可行者
        let mut feasible: Vec<(Voyage, VoyageLoad)> = Vec::new();
        for voyage in voyages {
            let Some(load) = self.store.voyage_repo().load_for_voyage(&voyage.id)? else {
                continue;
            };
            if checker.fits(&shipment, &voyage, &load) {
                feasible.push((voyage, load));
            }
        }

        let policy = ScoringPolicy::new(ScoringMode::TightPack);
        let candidates: Vec<CandidateVoyage<'_>> = feasible
            .iter()
            .map(|(voyage, load)| CandidateVoyage { voyage, load })
            .collect();
        let ranked = policy.rank_voyages(&shipment, candidates);

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|c| VoyageSuggestion {
                voyage_code: c.voyage.voyage_code.clone(),
                vessel_name: c.voyage.vessel_name.clone(),
                origin: c.voyage.origin.clone(),
                destination: c.voyage.destination.clone(),
                depart_at: c.voyage.depart_at,
                arrive_by: c.voyage.arrive_by,
                assigned_count: c.load.assigned_count,
                remaining_weight_t: finite_or_none(c.load.remaining_weight_t()),
                remaining_volume_m3: finite_or_none(c.load.remaining_volume_m3()),
                utilization_weight_pct: c.load.utilization_weight_pct(),
                utilization_volume_pct: c.load.utilization_volume_pct(),
            })
            .collect())
    }

    /// 为一个航次列出补位运单建议 (贪心填充剩余容量)
    ///
    /// 候选口径: 航线匹配、状态可配载、起运不晚于离港、未在该航次在册;
    /// 排序用 PRIORITY_WEIGHTED (优先货压倒一切,其后按填充率)。
    pub async fn suggest_shipments_for_voyage(
        &self,
        voyage_code: &str,
        k: usize,
    ) -> ApiResult<VoyageFillSuggestion> {
        let voyage = self.require_voyage(voyage_code)?;
        let mut load = self
            .store
            .voyage_repo()
            .load_for_voyage(&voyage.id)?
            .ok_or_else(|| ApiError::NotFound(format!("Voyage(id={})不存在", voyage.id)))?;

        let max_candidates = self
            .config
            .get_max_batch_shipments()
            .await
            .map_err(ApiError::from_config)?;
        let candidates = self.store.shipment_repo().list_lane_candidates(
            &voyage.origin,
            &voyage.destination,
            voyage.depart_at,
            &voyage.id,
            max_candidates,
        )?;

        let policy = ScoringPolicy::new(ScoringMode::PriorityWeighted);
        let ranked = policy.rank_shipments_for_voyage(&voyage, candidates.iter().collect());

        let mut picks = Vec::new();
        for shipment in ranked {
            let w = shipment.effective_weight_t();
            let v = shipment.effective_volume_m3();
            if !load.can_take(w, v) {
                continue; // 装不下就看下一票 (贪心)
            }
            load.add_cargo(w, v);
            picks.push(ShipmentPick {
                shipment_code: shipment.shipment_code.clone(),
                is_priority: shipment.is_priority,
                weight_t: w,
                volume_m3: v,
            });
            if picks.len() >= k {
                break;
            }
        }

        Ok(VoyageFillSuggestion {
            voyage_code: voyage.voyage_code,
            picks,
            remaining_weight_t: finite_or_none(load.remaining_weight_t()),
            remaining_volume_m3: finite_or_none(load.remaining_volume_m3()),
        })
    }

    // ==========================================
    // 实体录入 (最小化的外围管道)
    // ==========================================

    /// 录入运单
    pub fn create_shipment(&self, input: NewShipment) -> ApiResult<Shipment> {
        if input.shipment_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("shipment_code 不能为空".to_string()));
        }
        let now = Utc::now();
        let shipment = Shipment {
            id: Uuid::new_v4().to_string(),
            shipment_code: input.shipment_code,
            origin: input.origin,
            destination: input.destination,
            status: ShipmentStatus::Created,
            is_priority: input.is_priority,
            ship_date: input.ship_date,
            transit_days: input.transit_days,
            weight_t: input.weight_t,
            volume_m3: input.volume_m3,
            created_at: now,
            updated_at: now,
        };
        self.store.shipment_repo().insert(&shipment)?;
        Ok(shipment)
    }

    /// 录入航次
    pub fn create_voyage(&self, input: NewVoyage) -> ApiResult<Voyage> {
        if input.voyage_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("voyage_code 不能为空".to_string()));
        }
        let now = Utc::now();
        let voyage = Voyage {
            id: Uuid::new_v4().to_string(),
            voyage_code: input.voyage_code,
            vessel_name: input.vessel_name,
            origin: input.origin,
            destination: input.destination,
            depart_at: input.depart_at,
            arrive_by: input.arrive_by,
            weight_cap_t: input.weight_cap_t,
            volume_cap_m3: input.volume_cap_m3,
            created_at: now,
            updated_at: now,
        };
        self.store.voyage_repo().insert(&voyage)?;
        Ok(voyage)
    }

    /// 查询运单
    pub fn get_shipment(&self, shipment_code: &str) -> ApiResult<Shipment> {
        self.require_shipment(shipment_code)
    }

    /// 列出运单 (创建时间倒序,限量)
    pub fn list_shipments(&self, limit: u32) -> ApiResult<Vec<Shipment>> {
        Ok(self.store.shipment_repo().list_all(limit)?)
    }

    /// 更新运单状态
    pub fn update_shipment_status(
        &self,
        shipment_code: &str,
        status: ShipmentStatus,
    ) -> ApiResult<bool> {
        Ok(self
            .store
            .shipment_repo()
            .update_status(shipment_code, status)?)
    }

    /// 删除运单 (历史事件成为孤儿,本域可接受)
    pub fn delete_shipment(&self, shipment_code: &str) -> ApiResult<bool> {
        Ok(self.store.shipment_repo().delete(shipment_code)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn require_shipment(&self, shipment_code: &str) -> ApiResult<Shipment> {
        self.store
            .shipment_repo()
            .find_by_code(shipment_code)?
            .ok_or_else(|| ApiError::NotFound(format!("Shipment(code={})不存在", shipment_code)))
    }

    fn require_voyage(&self, voyage_code: &str) -> ApiResult<Voyage> {
        self.store
            .voyage_repo()
            .find_by_code(voyage_code)?
            .ok_or_else(|| ApiError::NotFound(format!("Voyage(code={})不存在", voyage_code)))
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn fmt_rem(value: f64) -> String {
    if value.is_finite() {
        format!("{:.3}", value)
    } else {
        "unlimited".to_string()
    }
}
