// 服务模块
// 提供核心业务逻辑服务

pub mod attempt;
pub mod database;
pub mod markdown;
pub mod paginator;
pub mod progress;
pub mod quiz;
pub mod remote;
pub mod session;
pub mod store;

pub use attempt::QuizAttempt;

pub use database::SqliteStore;

pub use paginator::{
    paginate,
    ContentPaginator,
    DEFAULT_PAGE_SIZE,
    DEFAULT_START_MARKER,
};

pub use progress::{
    continue_learning,
    filter_courses,
    open_course,
    pick_continue_learning,
};

pub use quiz::{
    fallback_question,
    generate_one,
    generate_set,
    QuizSynthesizer,
    DEFAULT_QUESTION_COUNT,
};

pub use remote::{RestIdentity, RestStore};

pub use session::{result_message, Advance, QuizSession, QuizState};

pub use store::{CourseStore, IdentityProvider, StaticIdentity};
