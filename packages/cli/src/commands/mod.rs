pub mod apply;
pub mod inspect;

pub use apply::{apply, ApplyArgs};
pub use inspect::{inspect, InspectArgs};
