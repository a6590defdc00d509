mod event;
mod subtitle;

pub use self::event::Event;
pub use self::subtitle::{Subtitle, subtitle_id};
