//! Core systems for plait.
//!
//! This crate provides the infrastructure the sequence layer is built on:
//!
//! - **Signal/Slot System**: Synchronous, reentrancy-safe observer dispatch
//! - **Errors**: The `OutOfRange` taxonomy and fatal invariant checks
//! - **Logging**: `tracing` targets, macros and performance spans
//! - **Thread Checks**: Owner-thread affinity assertions
//!
//! # Signal/Slot Example
//!
//! ```
//! use plait_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod error;
pub mod logging;
pub mod signal;
pub mod thread_check;

pub use error::{PlaitError, Result, check_position, check_range};
pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
