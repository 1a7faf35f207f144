//! Room membership and broadcast

pub mod registry;

pub use registry::{BroadcastError, OutboundFrame, RoomId, RoomRegistry};
