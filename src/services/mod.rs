pub mod conversation_thread;
pub mod lesson_plan_assembler;

pub use conversation_thread::ConversationThread;
pub use lesson_plan_assembler::{GenerateParams, LessonPlanAssembler};
