// ==========================================
// 排考全流程集成测试
// ==========================================
// 职责: 基于临时 SQLite 库验证 加载 → 排考 → 落库 → 审计 的完整链路
// 场景: 覆盖/追加模式、共享学生跨天、监考耗尽、固定种子复现、数据完整性
// ==========================================


use chrono::{NaiveDate, Utc};
use exam_scheduler::config::ConfigManager;
use exam_scheduler::domain::types::{PersistMode, RoomKind, StudentId, TimeSlot};
use exam_scheduler::repository::{GenerationRunEntity, RepositoryError, SessionRepository};
use exam_scheduler::{
    logging, ExamScheduler, ExamSession, GenerationRequest, RoomAssignment, SchedulerConfig,
    SchedulerError,
};
use rusqlite::params;
use std::collections::{HashMap, HashSet};
use test_helpers::*;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

fn scheduler_for(db_path: &str) -> (ExamScheduler, SessionRepository) {
    logging::init_test();

    let conn = open_shared(db_path);
    let config = ConfigManager::from_connection(conn.clone())
        .load_scheduler_config()
        .unwrap();
    (
        ExamScheduler::from_connection(conn.clone(), config),
        SessionRepository::new(conn),
    )
}

fn campus_db() -> (tempfile::NamedTempFile, String) {
    let (temp_file, db_path) = create_test_db().unwrap();
    seed_campus(&open_shared(&db_path).lock().unwrap());
    (temp_file, db_path)
}

// ==========================================
// 覆盖模式
// ==========================================

#[test]
fn test_overwrite_run_places_every_nonempty_module() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);

    let report = scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite).with_seed(7))
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.modules_placed, 4);
    assert_eq!(report.skipped_empty, 1);
    assert_eq!(report.skipped_already_placed, 0);
    // 101 → 阶梯教室 1 间; 301/102/201 → 各 2 间小教室
    assert_eq!(report.sessions_created, 7);
    assert_eq!(sessions.count_session_rows().unwrap(), 7);

    assert!(scheduler.audit().unwrap().is_empty());

    let runs = sessions.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, report.run_id);
    assert_eq!(runs[0].sessions_created, 7);
}

#[test]
fn test_modules_sharing_students_land_on_different_days() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);

    scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite).with_seed(1))
        .unwrap();

    let stored = sessions.load_sessions().unwrap();
    let date_of = |module_id: i64| {
        stored
            .iter()
            .find(|s| s.module_id == module_id)
            .map(|s| s.date)
            .unwrap()
    };
    assert_eq!(date_of(101), day(1));
    assert_eq!(date_of(102), day(2));
    assert_eq!(date_of(201), day(1));
    assert_eq!(date_of(301), day(1));
}

#[test]
fn test_every_enrolled_student_is_seated_once_within_capacity() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);

    scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite).with_seed(3))
        .unwrap();

    let stored = sessions.load_sessions().unwrap();
    let large = stored.iter().find(|s| s.module_id == 101).unwrap();
    assert_eq!(large.assignments.len(), 1);
    assert_eq!(large.assignments[0].room_id, 5);

    for session in &stored {
        let seated: Vec<StudentId> = session.seated_students().collect();
        let unique: HashSet<StudentId> = seated.iter().copied().collect();
        assert_eq!(seated.len(), unique.len(), "模块 {} 名单有重复", session.module_id);
        for assignment in &session.assignments {
            assert!(assignment.session_id.is_some());
            assert!(assignment.students.len() <= if assignment.room_id == 5 { 120 } else { 20 });
        }
    }
    let seated_101: HashSet<StudentId> = large.seated_students().collect();
    assert_eq!(seated_101, (1..=60).collect());
}

#[test]
fn test_overwrite_rerun_replaces_previous_sessions() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);
    let request = GenerationRequest::new(day(1), day(5), PersistMode::Overwrite);

    scheduler.generate(&request).unwrap();
    scheduler.generate(&request).unwrap();

    assert_eq!(sessions.count_session_rows().unwrap(), 7);
    assert_eq!(sessions.list_runs().unwrap().len(), 2);
    assert!(scheduler.audit().unwrap().is_empty());

    // 名单随场次一起被清理
    assert_eq!(roster_count(&db_path), 60 + 30 + 25 + 40);
}

#[test]
fn test_same_seed_reproduces_rosters() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);
    let request = GenerationRequest::new(day(1), day(5), PersistMode::Overwrite).with_seed(2026);

    let snapshot = |sessions: &SessionRepository| {
        sessions
            .load_sessions()
            .unwrap()
            .into_iter()
            .flat_map(|s| {
                s.assignments.into_iter().map(move |a| {
                    (s.module_id, s.date, s.slot, a.room_id, a.proctor_id, a.students)
                })
            })
            .collect::<Vec<_>>()
    };

    scheduler.generate(&request).unwrap();
    let first = snapshot(&sessions);
    scheduler.generate(&request).unwrap();
    let second = snapshot(&sessions);

    assert_eq!(first, second);
}

// ==========================================
// 追加模式
// ==========================================

#[test]
fn test_append_keeps_existing_sessions_and_skips_placed_modules() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);

    let first = scheduler
        .generate(
            &GenerationRequest::new(day(1), day(5), PersistMode::Overwrite)
                .with_formations(vec![1]),
        )
        .unwrap();
    assert_eq!(first.modules_placed, 2);
    assert_eq!(first.sessions_created, 3);

    let before = sessions.load_sessions().unwrap();
    assert!(before.iter().all(|s| s.assignments.iter().all(|a| a.session_id.is_some())));

    let second = scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Append))
        .unwrap();
    assert_eq!(second.skipped_already_placed, 2);
    assert_eq!(second.modules_placed, 2);
    assert_eq!(second.sessions_created, 4);

    assert_eq!(sessions.count_session_rows().unwrap(), 7);
    assert!(scheduler.audit().unwrap().is_empty());

    // 历史场次原样保留: 行 id、考场、监考、名单顺序均不变
    let after = sessions.load_sessions().unwrap();
    for old in &before {
        let kept = after
            .iter()
            .find(|s| s.module_id == old.module_id)
            .unwrap_or_else(|| panic!("模块 {} 的场次丢失", old.module_id));
        assert_eq!(kept, old);
    }
    assert_eq!(after.len(), before.len() + 2);
}

#[test]
fn test_append_respects_students_of_existing_sessions() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);

    scheduler
        .generate(
            &GenerationRequest::new(day(1), day(1), PersistMode::Overwrite)
                .with_formations(vec![1]),
        )
        .unwrap();
    // 单日窗口: 102 与 101 共享学生, 只能排 101
    let stored = sessions.load_sessions().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].module_id, 101);

    // 追加到第 2 天: 历史占用的第 1 天不可再用
    let report = scheduler
        .generate(
            &GenerationRequest::new(day(1), day(2), PersistMode::Append).with_formations(vec![1]),
        )
        .unwrap();
    assert_eq!(report.modules_placed, 1);
    let stored = sessions.load_sessions().unwrap();
    let reseaux = stored.iter().find(|s| s.module_id == 102).unwrap();
    assert_eq!(reseaux.date, day(2));
}

// ==========================================
// 非致命失败与致命错误
// ==========================================

#[test]
fn test_exhausted_proctor_leaves_module_unscheduled() {
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let shared = open_shared(&db_path);
        let conn = shared.lock().unwrap();
        insert_department(&conn, 1, "Info");
        insert_formation(&conn, 1, "L1", Some(1));
        for (module_id, size) in [(1, 10), (2, 9), (3, 8), (4, 7)] {
            insert_module(&conn, module_id, &format!("M{}", module_id), 1);
            let base = module_id * 100;
            enroll_students(&conn, module_id, base + 1..=base + size);
        }
        insert_room(&conn, 1, 30, "ROOM");
        insert_proctor(&conn, 1, Some(1));
    }
    let (scheduler, sessions) = scheduler_for(&db_path);

    let report = scheduler
        .generate(&GenerationRequest::new(day(1), day(1), PersistMode::Overwrite))
        .unwrap();

    assert_eq!(report.modules_placed, 3);
    assert_eq!(report.unscheduled.len(), 1);
    let miss = &report.unscheduled[0];
    assert_eq!(miss.module_id, 4);
    assert_eq!(miss.enrolled, 7);
    assert_eq!(miss.slots_short_of_rooms, 3);
    assert_eq!(miss.slots_short_of_proctors, 1);

    assert_eq!(sessions.count_session_rows().unwrap(), 3);
    assert_eq!(sessions.list_runs().unwrap()[0].unscheduled_count, 1);
    assert!(scheduler.audit().unwrap().is_empty());
}

#[test]
fn test_module_without_department_aborts_before_writing() {
    let (_tmp, db_path) = campus_db();
    {
        let shared = open_shared(&db_path);
        let conn = shared.lock().unwrap();
        insert_formation(&conn, 9, "Orpheline", None);
        insert_module(&conn, 901, "Sans departement", 9);
        enroll_students(&conn, 901, 1..=3);
    }
    let (scheduler, sessions) = scheduler_for(&db_path);

    let err = scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite))
        .unwrap_err();

    match err {
        SchedulerError::DataIntegrity { entity, id, .. } => {
            assert_eq!(entity, "module");
            assert_eq!(id, "901");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sessions.count_session_rows().unwrap(), 0);
    assert!(sessions.list_runs().unwrap().is_empty());
}

#[test]
fn test_integrity_failure_keeps_previous_schedule() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);
    scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite))
        .unwrap();

    open_shared(&db_path)
        .lock()
        .unwrap()
        .execute("UPDATE rooms SET capacity = 0 WHERE id = ?1", params![3])
        .unwrap();

    assert!(scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite))
        .is_err());
    assert_eq!(sessions.count_session_rows().unwrap(), 7);
}

fn roster_count(db_path: &str) -> i64 {
    open_shared(db_path)
        .lock()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM exam_rosters", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_persist_failure_midway_rolls_back_overwrite() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);
    scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite).with_seed(5))
        .unwrap();
    let before = sessions.load_sessions().unwrap();

    // 同一考场名单内学生重复 → exam_rosters 主键冲突, 发生在删除与场次插入之后
    let broken = ExamSession {
        module_id: 101,
        date: day(9),
        slot: TimeSlot::default_day()[0],
        assignments: vec![RoomAssignment {
            session_id: None,
            room_id: 1,
            proctor_id: 1,
            students: vec![1, 1],
        }],
    };
    let run = GenerationRunEntity {
        run_id: "broken-run".to_string(),
        mode: PersistMode::Overwrite,
        start_date: day(9),
        end_date: day(9),
        sessions_created: 1,
        modules_placed: 1,
        unscheduled_count: 0,
        created_at: Utc::now().naive_utc(),
    };

    let err = sessions
        .persist(&[broken], PersistMode::Overwrite, Some(&run))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

    assert_eq!(sessions.load_sessions().unwrap(), before);
    assert_eq!(sessions.count_session_rows().unwrap(), 7);
    assert_eq!(roster_count(&db_path), 60 + 30 + 25 + 40);
    let runs = sessions.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs.iter().all(|r| r.run_id != "broken-run"));
}

#[test]
fn test_generate_surfaces_persistence_error_and_keeps_schedule() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);
    scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite).with_seed(5))
        .unwrap();
    let before = sessions.load_sessions().unwrap();

    // 学生 30 同时选了 101 与 102, 写名单时必然触发
    open_shared(&db_path)
        .lock()
        .unwrap()
        .execute_batch(
            r#"
            CREATE TRIGGER reject_roster BEFORE INSERT ON exam_rosters
            WHEN NEW.student_id = 30
            BEGIN
                SELECT RAISE(ABORT, 'roster rejected');
            END;
            "#,
        )
        .unwrap();

    let err = scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite).with_seed(6))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Persistence(_)));

    assert_eq!(sessions.load_sessions().unwrap(), before);
    assert_eq!(roster_count(&db_path), 60 + 30 + 25 + 40);
    assert_eq!(sessions.list_runs().unwrap().len(), 1);
}

#[test]
fn test_reversed_window_is_rejected() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, _) = scheduler_for(&db_path);

    let err = scheduler
        .generate(&GenerationRequest::new(day(5), day(1), PersistMode::Overwrite))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidRequest(_)));
}

#[test]
fn test_empty_catalog_produces_empty_report() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (scheduler, sessions) = scheduler_for(&db_path);

    let report = scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite))
        .unwrap();
    assert_eq!(report.sessions_created, 0);
    assert!(report.is_complete());
    assert_eq!(sessions.list_runs().unwrap().len(), 1);
}

// ==========================================
// 配置与统计
// ==========================================

#[test]
fn test_configured_slots_drive_placement() {
    let (_tmp, db_path) = campus_db();
    let conn = open_shared(&db_path);
    ConfigManager::from_connection(conn.clone())
        .set_global_config_value("exam.time_slots", r#"[["09:00","12:00"]]"#)
        .unwrap();
    let config = ConfigManager::from_connection(conn.clone())
        .load_scheduler_config()
        .unwrap();
    assert_eq!(config.time_slots, vec![TimeSlot::parse("09:00", "12:00").unwrap()]);

    let scheduler = ExamScheduler::from_connection(conn.clone(), config);
    scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite))
        .unwrap();

    let stored = SessionRepository::new(conn).load_sessions().unwrap();
    assert!(stored.iter().all(|s| s.slot.start_str() == "09:00"));
}

#[test]
fn test_room_kind_usage_after_generation() {
    let (_tmp, db_path) = campus_db();
    let (scheduler, sessions) = scheduler_for(&db_path);
    scheduler
        .generate(&GenerationRequest::new(day(1), day(5), PersistMode::Overwrite))
        .unwrap();

    let usage: HashMap<RoomKind, (usize, f64)> = sessions
        .room_kind_usage()
        .unwrap()
        .into_iter()
        .map(|u| (u.kind, (u.session_count, u.avg_capacity)))
        .collect();

    assert_eq!(usage[&RoomKind::Amphi], (1, 120.0));
    assert_eq!(usage[&RoomKind::Room], (6, 20.0));
}

#[test]
fn test_default_config_when_nothing_stored() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (scheduler, _) = scheduler_for(&db_path);
    assert_eq!(scheduler.config(), &SchedulerConfig::default());
}
