//! IO modules - external system interfaces
//!
//! - `link` - Traits the session uses to talk to the sensor and alert devices
//! - `serial` - tokio-serial implementation of those traits, port enumeration
//! - `event_channel` - Bounded channel carrying session events to the front end

pub mod event_channel;
pub mod link;
pub mod serial;

// Re-export commonly used types
pub use event_channel::{create_event_channel, EventSender};
pub use link::{AlertSink, LineSource, LinkError, LinkOpener};
pub use serial::{list_ports, SerialLinks, BAUD_CHOICES};
