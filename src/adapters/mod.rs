//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements | Connects to                   |
//! |------------|------------|-------------------------------|
//! | `cdev`     | GpioPort   | `/dev/gpiochip*` (Linux)      |
//! | `sim`      | GpioPort   | in-memory bench               |
//! | `log_sink` | EventSink  | `log` facade                  |
//! | `http`     | —          | axum router over `Dispatcher` |

#[cfg(feature = "cdev")]
pub mod cdev;
pub mod http;
pub mod log_sink;
pub mod sim;
