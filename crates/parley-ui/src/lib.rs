pub mod bubble;
pub mod room;

pub use bubble::{BubbleController, BubbleState};
pub use room::{ChatRoomSession, sort_for_display};
