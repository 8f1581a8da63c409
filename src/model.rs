pub mod live_event;
pub mod stop;

pub use live_event::*;
pub use stop::*;
