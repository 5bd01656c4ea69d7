pub mod category;
pub mod event;
pub mod event_creation;
pub mod purchase;
pub mod user;

pub use category::{Category, CategorySummary, NewCategory};
pub use event::{Event, EventUpdate, NewEvent};
pub use event_creation::EventCreation;
pub use purchase::{Purchase, Quantity};
pub use user::UserId;
