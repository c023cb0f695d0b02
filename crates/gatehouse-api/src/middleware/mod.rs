//! Middleware: the authorization guards and request logging.

pub mod guard;
pub mod logging;
