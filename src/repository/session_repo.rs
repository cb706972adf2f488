// ==========================================
// 期末考试排考系统 - 考试场次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: exam_sessions (每考场一行) / exam_rosters / generation_runs
// 约束: 单次运行的删除 + 写入在同一事务内提交, 场次与名单同生共灭
// ==========================================

use crate::domain::report::RoomKindUsage;
use crate::domain::session::{ExamSession, RoomAssignment};
use crate::domain::types::{
    ModuleId, PersistMode, RoomKind, StudentId, TimeSlot, SLOT_TIME_FORMAT,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 排考运行记录 (generation_runs 表)
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRunEntity {
    pub run_id: String,
    pub mode: PersistMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sessions_created: usize,
    pub modules_placed: usize,
    pub unscheduled_count: usize,
    pub created_at: NaiveDateTime,
}

/// exam_sessions 原始行
struct SessionRow {
    id: i64,
    module_id: ModuleId,
    proctor_id: i64,
    room_id: i64,
    date: NaiveDate,
    slot: TimeSlot,
}

// ==========================================
// SessionRepository - 考试场次仓储
// ==========================================
pub struct SessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SessionRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取全部已落库场次（按 模块+日期+时间段 聚合为 ExamSession）
    ///
    /// # 返回
    /// 按 (exam_date, slot_start, module_id) 排序的场次列表, 名单按 seat_number 排序
    pub fn load_sessions(&self) -> RepositoryResult<Vec<ExamSession>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, module_id, proctor_id, room_id, exam_date, slot_start, slot_end
            FROM exam_sessions
            ORDER BY exam_date, slot_start, module_id, id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    module_id: row.get(1)?,
                    proctor_id: row.get(2)?,
                    room_id: row.get(3)?,
                    date: row.get(4)?, // rusqlite chrono: ISO 日期
                    slot: TimeSlot::new(parse_time(row, 5)?, parse_time(row, 6)?),
                })
            })?
            .collect::<SqliteResult<Vec<SessionRow>>>()?;

        let mut roster_stmt = conn.prepare(
            "SELECT session_id, student_id FROM exam_rosters ORDER BY session_id, seat_number",
        )?;
        let mut rosters: HashMap<i64, Vec<StudentId>> = HashMap::new();
        let roster_rows = roster_stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, StudentId>(1)?)))?
            .collect::<SqliteResult<Vec<(i64, StudentId)>>>()?;
        for (session_id, student_id) in roster_rows {
            rosters.entry(session_id).or_default().push(student_id);
        }

        let mut sessions: Vec<ExamSession> = Vec::new();
        let mut index: HashMap<(ModuleId, NaiveDate, NaiveTime), usize> = HashMap::new();
        for row in rows {
            let assignment = RoomAssignment {
                session_id: Some(row.id),
                room_id: row.room_id,
                proctor_id: row.proctor_id,
                students: rosters.remove(&row.id).unwrap_or_default(),
            };
            let key = (row.module_id, row.date, row.slot.start);
            match index.get(&key) {
                Some(&i) => sessions[i].assignments.push(assignment),
                None => {
                    index.insert(key, sessions.len());
                    sessions.push(ExamSession {
                        module_id: row.module_id,
                        date: row.date,
                        slot: row.slot,
                        assignments: vec![assignment],
                    });
                }
            }
        }

        Ok(sessions)
    }

    /// 统计场次行数
    pub fn count_session_rows(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM exam_sessions", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// 写入场次与名单（单事务）
    ///
    /// # 参数
    /// - `sessions`: 新场次
    /// - `mode`: Overwrite 先清空 exam_rosters / exam_sessions; Append 仅追加
    /// - `run`: 可选的运行记录, 与场次同事务写入
    ///
    /// # 返回
    /// - Ok(usize): 写入的场次行数 (每考场一行)
    /// - Err: 任一步失败则整体回滚
    pub fn persist(
        &self,
        sessions: &[ExamSession],
        mode: PersistMode,
        run: Option<&GenerationRunEntity>,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        if mode == PersistMode::Overwrite {
            let rosters = tx.execute("DELETE FROM exam_rosters", [])?;
            let rows = tx.execute("DELETE FROM exam_sessions", [])?;
            debug!(
                deleted_sessions = rows,
                deleted_rosters = rosters,
                "覆盖模式: 已清空历史场次"
            );
        }

        let mut written = 0;
        {
            let mut insert_session = tx.prepare(
                r#"
                INSERT INTO exam_sessions (module_id, proctor_id, room_id, exam_date, slot_start, slot_end)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            let mut insert_roster = tx.prepare(
                "INSERT INTO exam_rosters (session_id, student_id, seat_number) VALUES (?1, ?2, ?3)",
            )?;

            for session in sessions {
                let start_str = session.slot.start_str();
                let end_str = session.slot.end_str();

                for assignment in &session.assignments {
                    let session_id = insert_session.insert(params![
                        session.module_id,
                        assignment.proctor_id,
                        assignment.room_id,
                        session.date,
                        start_str,
                        end_str,
                    ])?;
                    for (seat, student_id) in assignment.students.iter().enumerate() {
                        insert_roster.execute(params![session_id, student_id, seat as i64 + 1])?;
                    }
                    written += 1;
                }
            }
        }

        if let Some(run) = run {
            tx.execute(
                r#"
                INSERT INTO generation_runs (
                    run_id, mode, start_date, end_date, sessions_created,
                    modules_placed, unscheduled_count, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    run.run_id,
                    run.mode.to_string(),
                    run.start_date,
                    run.end_date,
                    run.sessions_created as i64,
                    run.modules_placed as i64,
                    run.unscheduled_count as i64,
                    run.created_at,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(written)
    }

    /// 查询运行记录（按创建时间升序）
    pub fn list_runs(&self) -> RepositoryResult<Vec<GenerationRunEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, mode, start_date, end_date, sessions_created,
                   modules_placed, unscheduled_count, created_at
            FROM generation_runs
            ORDER BY created_at, rowid
            "#,
        )?;

        let runs = stmt
            .query_map([], |row| {
                let mode_str: String = row.get(1)?;
                Ok(GenerationRunEntity {
                    run_id: row.get(0)?,
                    mode: PersistMode::from_append_flag(mode_str == "APPEND"),
                    start_date: row.get(2)?,
                    end_date: row.get(3)?,
                    sessions_created: row.get::<_, i64>(4)? as usize,
                    modules_placed: row.get::<_, i64>(5)? as usize,
                    unscheduled_count: row.get::<_, i64>(6)? as usize,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<GenerationRunEntity>>>()?;

        Ok(runs)
    }

    /// 按考场类型统计场次行数与平均容量
    pub fn room_kind_usage(&self) -> RepositoryResult<Vec<RoomKindUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.kind, COUNT(e.id), AVG(r.capacity)
            FROM exam_sessions e
            JOIN rooms r ON e.room_id = r.id
            GROUP BY r.kind
            ORDER BY r.kind
            "#,
        )?;

        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?
            .collect::<SqliteResult<Vec<(String, i64, f64)>>>()?;

        raw.into_iter()
            .map(|(kind, count, avg)| {
                let kind = kind
                    .parse::<RoomKind>()
                    .map_err(|message| RepositoryError::FieldValueError {
                        field: "rooms.kind".to_string(),
                        message,
                    })?;
                Ok(RoomKindUsage {
                    kind,
                    session_count: count as usize,
                    avg_capacity: avg,
                })
            })
            .collect()
    }
}

fn parse_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    // 兼容手工录入的 HH:MM:SS
    NaiveTime::parse_from_str(&raw, SLOT_TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn repo() -> (Arc<Mutex<Connection>>, SessionRepository) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        (conn.clone(), SessionRepository::new(conn))
    }

    #[test]
    fn test_dates_stored_as_iso_text_and_read_back() {
        let (conn, repo) = repo();
        let date = NaiveDate::from_ymd_opt(2026, 6, 3).unwrap();
        let session = ExamSession {
            module_id: 7,
            date,
            slot: TimeSlot::default_day()[2],
            assignments: vec![RoomAssignment {
                session_id: None,
                room_id: 1,
                proctor_id: 2,
                students: vec![30, 10, 20],
            }],
        };
        let run = GenerationRunEntity {
            run_id: "run-1".to_string(),
            mode: PersistMode::Append,
            start_date: date,
            end_date: date,
            sessions_created: 1,
            modules_placed: 1,
            unscheduled_count: 0,
            created_at: date.and_hms_opt(9, 15, 0).unwrap(),
        };

        assert_eq!(repo.persist(&[session], PersistMode::Append, Some(&run)).unwrap(), 1);

        let (raw_date, raw_start): (String, String) = conn
            .lock()
            .unwrap()
            .query_row("SELECT exam_date, slot_start FROM exam_sessions", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(raw_date, "2026-06-03");
        assert_eq!(raw_start, "13:00");

        let loaded = repo.load_sessions().unwrap();
        assert_eq!(loaded[0].date, date);
        assert_eq!(loaded[0].assignments[0].students, vec![30, 10, 20]);
        assert_eq!(repo.list_runs().unwrap(), vec![run]);
    }
}
