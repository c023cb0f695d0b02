//! Role emulation lifecycle.

pub mod service;

pub use service::EmulationService;
