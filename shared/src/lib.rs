pub mod models;
pub mod networks;

pub use models::*;
pub use networks::*;
