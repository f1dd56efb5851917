pub mod api;
pub mod auth;
pub mod blog;
pub mod config;
pub mod error;
pub mod forms;
pub mod geo;
pub mod media;
pub mod page;
pub mod payment;
pub mod sanitize;
pub mod schedule;
pub mod site;

pub use config::{load_config, AppConfig, ApiConfig, PaymentsConfig, SiteConfig};
pub use error::{SiteError, SiteResult};
pub use page::{Notification, NotificationKind, Page};
pub use payment::{PaymentController, SubmitOutcome};
pub use site::Site;
