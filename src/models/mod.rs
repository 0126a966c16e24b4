pub mod conversation;
pub mod lesson_plan;
pub mod message;

pub use conversation::Conversation;
pub use lesson_plan::LessonPlan;
pub use message::{Message, Sender};
