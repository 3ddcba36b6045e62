pub mod health;
pub use self::health::health;

pub mod confirm;
pub use self::confirm::{confirm_api, confirm_page, open_app, retry_page};
