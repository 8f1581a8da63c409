//! Client for the myrapidbus real-time vehicle location feed
pub mod decode;
pub mod emitter;
pub mod reload_timer;
pub mod session;
pub mod socket;

pub use decode::*;
pub use emitter::*;
pub use reload_timer::*;
pub use session::*;
pub use socket::*;
