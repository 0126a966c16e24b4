pub mod chat;
pub mod lesson_plans;
