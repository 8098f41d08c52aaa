pub mod error;
pub mod widget;

pub use error::WidgetError;
pub use widget::{CacheControl, Envelope, WidgetRequest, WidgetResult, WidgetStatus};
