pub mod auth_service;
pub mod catalog_service;
pub mod chat_service;
pub mod job_service;
pub mod notification_service;
pub mod review_service;
