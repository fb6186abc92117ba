//! # coral-printer
//!
//! Printer endpoint boundary - delivery capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW a receipt reaches the printer:
//! - The [`PrinterEndpoint`] trait: one `print` call, one `health` call
//! - An HTTP bridge implementation for network print servers
//!
//! Business logic (WHEN to print, retries, queueing) stays in application
//! code - the delivery queue and dispatcher live in `coral-station`.
//!
//! ## Example
//!
//! ```ignore
//! use coral_printer::{HttpPrinterEndpoint, PrinterEndpoint};
//!
//! let printer = HttpPrinterEndpoint::new("http://192.168.1.50:9180")?;
//! printer.print(&order).await?;
//! ```

mod endpoint;
mod error;

// Re-exports
pub use endpoint::{HttpPrinterEndpoint, PrinterEndpoint, PrinterHealth};
pub use error::{PrintError, PrintResult};
