pub mod catalog;
pub mod chat;
pub mod job;
pub mod notification;
pub mod review;
pub mod user;

pub use catalog::{ProviderAvailability, ServiceCategory, ServiceProvider};
pub use chat::{Conversation, Message, MessageReadStatus};
pub use job::{Job, JobApplication, JobUpdate};
pub use notification::Notification;
pub use review::Review;
pub use user::User;
