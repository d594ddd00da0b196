pub mod act;
pub mod event;
pub mod status;

pub use act::{transform_act, ActCore};
pub use event::{transform_events, EventTransformResult, RejectionReason};
pub use status::derive_status;
