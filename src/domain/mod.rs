//! 领域模型模块
//!
//! 纯数据结构与校验规则，不依赖 axum/tokio

pub mod assignment;
pub mod certificate;
pub mod course;
pub mod course_module;
pub mod enrollment;
pub mod forum;
pub mod learning_path;
pub mod lesson;
pub mod notification;
pub mod pagination;
pub mod quiz;
pub mod user;
pub mod validation;

// Re-exports for convenience
pub use assignment::{Submission, SubmissionStatus};
pub use certificate::Certificate;
pub use course::{Course, CourseLevel};
pub use course_module::CourseModule;
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use forum::{Comment, ForumPost};
pub use learning_path::LearningPath;
pub use lesson::{Lesson, LessonContent, LessonKind};
pub use notification::{Notification, NotificationKind};
pub use pagination::{Page, PageQuery};
pub use quiz::{Question, QuestionType, Quiz};
pub use user::{PublicUser, Role, Session, User};
pub use validation::{FieldError, ValidationErrors};
