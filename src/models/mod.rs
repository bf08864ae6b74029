// 数据模型
// 分页内容、测验题目、课程与学习进度

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 阅读页
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub content: String,
}

impl AsRef<str> for Page {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

/// 选择题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

impl QuizQuestion {
    /// 正确选项文本
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }

    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_answer
    }
}

/// 课程（含原始讲稿）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub status: String,
}

/// 课程列表项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            name: course.name.clone(),
            description: course.description.clone(),
        }
    }
}

/// 用户课程进度，(user_id, course_id) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub user_id: String,
    pub course_id: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub percentage: u32,
    pub completed: bool,
    pub highest_quiz_score: u32,
    pub updated_at: DateTime<Utc>,
}

impl CourseProgress {
    /// 首次打开课程时的初始进度
    pub fn initial(user_id: &str, course_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            current_page: 1,
            total_pages: 1,
            percentage: 1,
            completed: false,
            highest_quiz_score: 0,
            updated_at: Utc::now(),
        }
    }

    /// 完成测验后的进度记录
    pub fn completed(user_id: &str, course_id: &str, total_pages: u32, highest_quiz_score: u32) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            current_page: total_pages,
            total_pages,
            percentage: 100,
            completed: true,
            highest_quiz_score,
            updated_at: Utc::now(),
        }
    }
}
