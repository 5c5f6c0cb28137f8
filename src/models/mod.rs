pub mod booking;
pub mod class_session;
pub mod member;

pub use booking::Booking;
pub use class_session::ClassSession;
pub use member::{Member, PlanType};
