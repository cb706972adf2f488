// ==========================================
// 期末考试排考系统 - 基础数据仓储 (只读)
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 读取模块/考场/监考/选课快照, 完整性判定交由引擎层
// ==========================================

use crate::domain::types::{DepartmentId, FormationId, ModuleId, ProctorId, RoomId, StudentId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

/// 模块行 (LEFT JOIN 专业与院系, 缺失时为 None)
#[derive(Debug, Clone)]
pub struct ModuleEntity {
    pub module_id: ModuleId,
    pub name: String,
    pub formation_ref: Option<FormationId>, // modules.formation_id 原值
    pub formation_id: Option<FormationId>,  // 关联到的 formations.id
    pub department_id: Option<DepartmentId>, // 关联到的 departments.id
}

/// 考场行
#[derive(Debug, Clone)]
pub struct RoomEntity {
    pub room_id: RoomId,
    pub name: String,
    pub capacity: i64,
    pub kind: String,
}

/// 监考教师行
#[derive(Debug, Clone)]
pub struct ProctorEntity {
    pub proctor_id: ProctorId,
    pub last_name: String,
    pub first_name: String,
    pub department_id: Option<DepartmentId>,
}

// ==========================================
// CatalogRepository - 基础数据仓储
// ==========================================
pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
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

    /// 查询全部模块（按 id 升序, 作为排序时的稳定输入顺序）
    pub fn list_modules(&self) -> RepositoryResult<Vec<ModuleEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT m.id, m.name, m.formation_id, f.id, d.id
            FROM modules m
            LEFT JOIN formations f ON m.formation_id = f.id
            LEFT JOIN departments d ON f.dept_id = d.id
            ORDER BY m.id
            "#,
        )?;

        let modules = stmt
            .query_map([], |row| {
                Ok(ModuleEntity {
                    module_id: row.get(0)?,
                    name: row.get(1)?,
                    formation_ref: row.get(2)?,
                    formation_id: row.get(3)?,
                    department_id: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<ModuleEntity>>>()?;

        Ok(modules)
    }

    /// 查询全部考场
    pub fn list_rooms(&self) -> RepositoryResult<Vec<RoomEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name, capacity, kind FROM rooms ORDER BY id")?;

        let rooms = stmt
            .query_map([], |row| {
                Ok(RoomEntity {
                    room_id: row.get(0)?,
                    name: row.get(1)?,
                    capacity: row.get(2)?,
                    kind: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<RoomEntity>>>()?;

        Ok(rooms)
    }

    /// 查询全部监考教师
    pub fn list_proctors(&self) -> RepositoryResult<Vec<ProctorEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, last_name, first_name, dept_id FROM proctors ORDER BY id",
        )?;

        let proctors = stmt
            .query_map([], |row| {
                Ok(ProctorEntity {
                    proctor_id: row.get(0)?,
                    last_name: row.get(1)?,
                    first_name: row.get(2)?,
                    department_id: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<ProctorEntity>>>()?;

        Ok(proctors)
    }

    /// 查询全部选课关系 (module_id, student_id)
    pub fn list_enrollments(&self) -> RepositoryResult<Vec<(ModuleId, StudentId)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT module_id, student_id FROM enrollments ORDER BY module_id, student_id",
        )?;

        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<Vec<(ModuleId, StudentId)>>>()?;

        Ok(pairs)
    }
}
