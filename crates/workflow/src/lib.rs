pub mod mail;
pub mod service;
pub mod templates;

pub use mail::LoggingMailSender;
pub use service::ReviewService;
pub use templates::{NotificationTemplates, RenderedNotification};
