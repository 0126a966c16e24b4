mod chat;
mod lesson_plan;

pub use chat::*;
pub use lesson_plan::*;
