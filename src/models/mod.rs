pub mod enums;
pub mod patient;
pub mod record;
pub mod report;
pub mod timestamp;
pub mod user;

pub use enums::*;
pub use patient::*;
pub use record::*;
pub use report::*;
pub use user::*;
