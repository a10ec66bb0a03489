pub mod events;
pub mod models;

pub use events::ChatEvent;
pub use models::{Chat, Message, Multimedia, MultimediaKind, Reaction, ThemeMode, User, UserStatus};
