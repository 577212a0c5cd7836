//! Maps service errors to kerala_core::AppError for consistent user-facing messages.

pub(crate) mod weather;
