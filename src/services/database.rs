// 数据库服务模块
// 提供 SQLite 课程存储与学习进度追踪

use crate::error::StoreError;
use crate::models::{Course, CourseProgress, CourseSummary};
use crate::services::store::CourseStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

macro_rules! progress_params {
    ($p:expr) => {
        params![
            Uuid::new_v4().to_string(),
            $p.user_id,
            $p.course_id,
            $p.current_page,
            $p.total_pages,
            $p.percentage,
            $p.completed,
            $p.highest_quiz_score,
            $p.updated_at.to_rfc3339(),
        ]
    };
}

const PROGRESS_COLUMNS: &str = "user_id, course_id, current_page, total_pages, percentage, \
     completed, highest_quiz_score, updated_at";

/// SQLite 课程存储
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// 打开（必要时创建）数据库文件
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        // 确保数据目录存在
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        let store = Self {
            pool: Arc::new(Mutex::new(conn)),
            db_path: Some(db_path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            pool: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// 初始化数据库表结构
    pub fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS courses (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_course_progress (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                course_id TEXT NOT NULL,
                current_page INTEGER NOT NULL DEFAULT 1,
                total_pages INTEGER NOT NULL DEFAULT 1,
                percentage INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                highest_quiz_score INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, course_id),
                FOREIGN KEY (course_id) REFERENCES courses(id)
            );

            CREATE INDEX IF NOT EXISTS idx_courses_status ON courses(status);
            CREATE INDEX IF NOT EXISTS idx_progress_user_id ON user_course_progress(user_id);",
        )?;

        Ok(())
    }

    // ==================== 课程管理 ====================

    /// 添加或替换课程
    pub fn add_course(&self, course: &Course) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO courses (id, name, description, content, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                course.id,
                course.name,
                course.description,
                course.content,
                course.status,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_course(&self, id: &str) -> Result<Option<Course>, StoreError> {
        let conn = self.conn()?;
        let course = conn
            .query_row(
                "SELECT id, name, description, content, status FROM courses WHERE id = ?1",
                params![id],
                Self::row_to_course,
            )
            .optional()?;
        Ok(course)
    }

    pub fn open_courses(&self) -> Result<Vec<CourseSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description FROM courses WHERE status = 'open' ORDER BY name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CourseSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        })?;

        let mut courses = Vec::new();
        for row in rows {
            courses.push(row?);
        }
        Ok(courses)
    }

    // ==================== 学习进度 ====================

    pub fn get_progress(&self, user_id: &str, course_id: &str) -> Result<Option<CourseProgress>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM user_course_progress WHERE user_id = ?1 AND course_id = ?2",
            PROGRESS_COLUMNS
        );
        let progress = conn
            .query_row(&sql, params![user_id, course_id], Self::row_to_progress)
            .optional()?;
        Ok(progress)
    }

    pub fn progress_for_user(&self, user_id: &str) -> Result<Vec<CourseProgress>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM user_course_progress WHERE user_id = ?1 ORDER BY updated_at",
            PROGRESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], Self::row_to_progress)?;

        let mut progress = Vec::new();
        for row in rows {
            progress.push(row?);
        }
        Ok(progress)
    }

    pub fn save_progress(&self, progress: &CourseProgress) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO user_course_progress (id, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(user_id, course_id) DO UPDATE SET
                current_page = excluded.current_page,
                total_pages = excluded.total_pages,
                percentage = excluded.percentage,
                completed = excluded.completed,
                highest_quiz_score = excluded.highest_quiz_score,
                updated_at = excluded.updated_at",
            PROGRESS_COLUMNS
        );
        conn.execute(&sql, progress_params!(progress))?;
        Ok(())
    }

    pub fn create_progress(&self, progress: &CourseProgress) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO user_course_progress (id, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(user_id, course_id) DO NOTHING",
            PROGRESS_COLUMNS
        );
        let inserted = conn.execute(&sql, progress_params!(progress))?;
        Ok(inserted > 0)
    }

    // ==================== 辅助方法 ====================

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.pool.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// 从数据库行转换为 Course
    fn row_to_course(row: &Row) -> Result<Course, rusqlite::Error> {
        Ok(Course {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            content: row.get(3)?,
            status: row.get(4)?,
        })
    }

    /// 从数据库行转换为 CourseProgress
    fn row_to_progress(row: &Row) -> Result<CourseProgress, rusqlite::Error> {
        let updated_at: String = row.get(7)?;
        let updated_at = updated_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

        Ok(CourseProgress {
            user_id: row.get(0)?,
            course_id: row.get(1)?,
            current_page: row.get(2)?,
            total_pages: row.get(3)?,
            percentage: row.get(4)?,
            completed: row.get(5)?,
            highest_quiz_score: row.get(6)?,
            updated_at,
        })
    }
}

#[async_trait]
impl CourseStore for SqliteStore {
    async fn fetch_course(&self, course_id: &str) -> Result<Course, StoreError> {
        self.get_course(course_id)?
            .ok_or_else(|| StoreError::NotFound(format!("course {}", course_id)))
    }

    async fn list_open_courses(&self) -> Result<Vec<CourseSummary>, StoreError> {
        self.open_courses()
    }

    async fn fetch_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<CourseProgress>, StoreError> {
        self.get_progress(user_id, course_id)
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<CourseProgress>, StoreError> {
        self.progress_for_user(user_id)
    }

    async fn upsert_progress(&self, progress: &CourseProgress) -> Result<(), StoreError> {
        self.save_progress(progress)
    }

    async fn insert_progress_if_absent(&self, progress: &CourseProgress) -> Result<bool, StoreError> {
        self.create_progress(progress)
    }
}
