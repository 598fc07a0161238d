// ==========================================
// 批量自动配载端到端测试
// ==========================================
// 测试目标: 验证提交式批量运行的完整链路
// 覆盖范围: 容量不变量、优先货顺序、部分失败容忍、
//           建议文本降级、重复运行幂等
// ==========================================


use std::sync::Arc;
use test_helpers::{create_test_store, ts, ShipmentBuilder, VoyageBuilder};
use voyage_assign::domain::{CapacityHeadroom, ScoringMode};
use voyage_assign::engine::{
    AutoAssignEngine, AutoAssignLimits, FeasibilityChecker, NoOpAdvisor, RouteAdvisor,
    ScoringPolicy,
};
use voyage_assign::repository::SqliteAssignmentStore;

fn create_engine(
    store: Arc<SqliteAssignmentStore>,
    advisor: Option<Arc<dyn RouteAdvisor>>,
) -> AutoAssignEngine<SqliteAssignmentStore> {
    AutoAssignEngine::new(
        store,
        FeasibilityChecker::default(),
        ScoringPolicy::new(ScoringMode::SpreadLoad),
        advisor,
        AutoAssignLimits::default(),
    )
}

// ==========================================
// 测试用例 1: 顺序消耗容量 (场景: S1 装入后 S2 因重量被跳过)
// ==========================================

#[tokio::test]
async fn test_sequential_capacity_consumption() {
    let (_tmp, store, _conn) = create_test_store().unwrap();

    let voyage = VoyageBuilder::new("VOY-001")
        .weight_cap(20.0)
        .volume_cap(40.0)
        .build();
    store.voyage_repo().insert(&voyage).unwrap();

    // S1: 12.5t/28m³ 可行; S2: 15t 但 S1 装入后仅余 7.5t
    let s1 = ShipmentBuilder::new("SHP-101")
        .ship_date(Some(ts(2025, 8, 1)))
        .weight(12.5)
        .volume(28.0)
        .build();
    let s2 = ShipmentBuilder::new("SHP-102")
        .ship_date(Some(ts(2025, 8, 2)))
        .weight(15.0)
        .volume(5.0)
        .build();
    store.shipment_repo().insert(&s1).unwrap();
    store.shipment_repo().insert(&s2).unwrap();

    let result = create_engine(store.clone(), None).run().await.unwrap();

    assert_eq!(result.processed, 2);
    assert_eq!(result.assigned, 1);
    assert_eq!(result.pairs.len(), 1);
    assert_eq!(result.pairs[0].shipment_code, "SHP-101");
    assert!(result
        .messages
        .iter()
        .any(|m| m.starts_with("SKIPPED: SHP-102")));

    // 容量不变量: 在册配载之和不超过上限
    let load = store
        .voyage_repo()
        .load_for_voyage(&voyage.id)
        .unwrap()
        .unwrap();
    assert!(load.used_weight_t <= 20.0);
    assert!(load.used_volume_m3 <= 40.0);
}

// ==========================================
// 测试用例 2: 同一决策点优先货必胜 (单舱位)
// ==========================================

#[tokio::test]
async fn test_priority_wins_single_slot() {
    let (_tmp, store, _conn) = create_test_store().unwrap();

    // 单舱位: 剩余重量恰好 5t
    let voyage = VoyageBuilder::new("VOY-001")
        .weight_cap(5.0)
        .volume_cap(100.0)
        .build();
    store.voyage_repo().insert(&voyage).unwrap();

    // 普通货起运更早,但优先货必须先被尝试
    let normal = ShipmentBuilder::new("SHP-201")
        .ship_date(Some(ts(2025, 8, 1)))
        .weight(5.0)
        .volume(1.0)
        .build();
    let priority = ShipmentBuilder::new("SHP-202")
        .priority()
        .ship_date(Some(ts(2025, 8, 5)))
        .weight(5.0)
        .volume(1.0)
        .build();
    store.shipment_repo().insert(&normal).unwrap();
    store.shipment_repo().insert(&priority).unwrap();

    let result = create_engine(store.clone(), None).run().await.unwrap();

    assert_eq!(result.assigned, 1);
    assert_eq!(result.pairs[0].shipment_code, "SHP-202"); // 优先货拿到舱位
    assert!(result
        .messages
        .iter()
        .any(|m| m.starts_with("SKIPPED: SHP-201")));
}

// ==========================================
// 测试用例 3: 部分失败容忍 (单票不可行不中止整批)
// ==========================================

#[tokio::test]
async fn test_partial_failure_does_not_abort_batch() {
    let (_tmp, store, _conn) = create_test_store().unwrap();

    let voyage = VoyageBuilder::new("VOY-001")
        .weight_cap(100.0)
        .volume_cap(100.0)
        .build();
    store.voyage_repo().insert(&voyage).unwrap();

    // 中间一票航线不匹配,前后两票均应正常配载
    let ok_1 = ShipmentBuilder::new("SHP-301")
        .ship_date(Some(ts(2025, 8, 1)))
        .weight(1.0)
        .build();
    let off_lane = ShipmentBuilder::new("SHP-302")
        .lane("Goa", "Kochi")
        .ship_date(Some(ts(2025, 8, 2)))
        .weight(1.0)
        .build();
    let ok_2 = ShipmentBuilder::new("SHP-303")
        .ship_date(Some(ts(2025, 8, 3)))
        .weight(1.0)
        .build();
    for s in [&ok_1, &off_lane, &ok_2] {
        store.shipment_repo().insert(s).unwrap();
    }

    let result = create_engine(store.clone(), None).run().await.unwrap();

    assert_eq!(result.processed, 3);
    assert_eq!(result.assigned, 2);
    let assigned_codes: Vec<&str> = result
        .pairs
        .iter()
        .map(|p| p.shipment_code.as_str())
        .collect();
    assert!(assigned_codes.contains(&"SHP-301"));
    assert!(assigned_codes.contains(&"SHP-303"));
}

// ==========================================
// 测试用例 4: 建议文本降级 (协作方故障 → 兜底提示)
// ==========================================

#[tokio::test]
async fn test_advisor_failure_degrades_to_fallback_hint() {
    let (_tmp, store, _conn) = create_test_store().unwrap();

    // 没有任何航次 → 整批滞留
    let stranded = ShipmentBuilder::new("SHP-401").weight(1.0).build();
    store.shipment_repo().insert(&stranded).unwrap();
    // 一个航线不同的航次,作为临近候选素材
    let voyage = VoyageBuilder::new("VOY-001")
        .lane("Mumbai", "Kochi")
        .build();
    store.voyage_repo().insert(&voyage).unwrap();

    let advisor: Arc<dyn RouteAdvisor> = Arc::new(NoOpAdvisor);
    let result = create_engine(store.clone(), Some(advisor)).run().await.unwrap();

    assert_eq!(result.assigned, 0);
    // 确定性结果不受协作方故障影响,仍返回结构化结果 + 兜底提示
    assert!(result
        .messages
        .iter()
        .any(|m| m.starts_with("HINT SHP-401")));
}

#[tokio::test]
async fn test_no_advisor_means_no_hint_phase() {
    let (_tmp, store, _conn) = create_test_store().unwrap();

    let stranded = ShipmentBuilder::new("SHP-402").weight(1.0).build();
    store.shipment_repo().insert(&stranded).unwrap();

    let result = create_engine(store.clone(), None).run().await.unwrap();

    assert!(result.messages.iter().all(|m| !m.starts_with("HINT")));
}

// ==========================================
// 测试用例 5: 重复运行幂等 (已配载不重复处理)
// ==========================================

#[tokio::test]
async fn test_second_run_is_noop() {
    let (_tmp, store, _conn) = create_test_store().unwrap();

    let voyage = VoyageBuilder::new("VOY-001")
        .weight_cap(100.0)
        .volume_cap(100.0)
        .build();
    store.voyage_repo().insert(&voyage).unwrap();
    let shipment = ShipmentBuilder::new("SHP-501").weight(10.0).volume(10.0).build();
    store.shipment_repo().insert(&shipment).unwrap();

    let first = create_engine(store.clone(), None).run().await.unwrap();
    assert_eq!(first.assigned, 1);

    let second = create_engine(store.clone(), None).run().await.unwrap();
    assert_eq!(second.processed, 0); // 已配载,不再入池
    assert_eq!(second.assigned, 0);

    // 台账占用没有被重复计入
    let load = store
        .voyage_repo()
        .load_for_voyage(&voyage.id)
        .unwrap()
        .unwrap();
    assert_eq!(load.used_weight_t, 10.0);
    assert_eq!(load.assigned_count, 1);
}

// ==========================================
// 测试用例 6: 多航次多运单的容量不变量
// ==========================================

#[tokio::test]
async fn test_capacity_invariant_across_pool() {
    let (_tmp, store, _conn) = create_test_store().unwrap();

    let voyages = vec![
        VoyageBuilder::new("VOY-001")
            .window(Some(ts(2025, 8, 10)), Some(ts(2025, 8, 20)))
            .weight_cap(18.0)
            .volume_cap(30.0)
            .build(),
        VoyageBuilder::new("VOY-002")
            .window(Some(ts(2025, 8, 12)), Some(ts(2025, 8, 22)))
            .weight_cap(12.0)
            .volume_cap(25.0)
            .build(),
    ];
    for v in &voyages {
        store.voyage_repo().insert(v).unwrap();
    }

    // 总载量超过两个航次合计容量,必然有跳过
    for i in 0..8u32 {
        let shipment = ShipmentBuilder::new(&format!("SHP-6{:02}", i))
            .ship_date(Some(ts(2025, 8, 1 + i)))
            .transit_days(3)
            .weight(6.0)
            .volume(9.0)
            .build();
        store.shipment_repo().insert(&shipment).unwrap();
    }

    let result = create_engine(store.clone(), None).run().await.unwrap();
    assert!(result.assigned < result.processed);

    // 每个航次的在册之和都不超过上限
    for v in &voyages {
        let load = store.voyage_repo().load_for_voyage(&v.id).unwrap().unwrap();
        assert!(
            load.remaining_weight_t() >= 0.0 && load.used_weight_t <= load.cap_weight_t,
            "voyage {} 重量超限: used={}",
            v.voyage_code,
            load.used_weight_t
        );
        assert!(load.used_volume_m3 <= load.cap_volume_m3);
    }
}
