//! Authentication: credential decoding, navigation gating and the session.

pub mod guard;
pub mod session;
pub mod token;

pub use guard::{Decision, RouteGuard, Verdict};
pub use session::{Session, SessionStore};
pub use token::{decode_token, Claim};
