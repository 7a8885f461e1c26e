//! pwire runtime - connection, pending calls and object registry
//!
//! This crate drives an out-of-process automation engine over a pipe:
//!
//! - **Transport**: NUL-delimited JSON frames over the engine's stdio
//! - **Connection**: request id allocation, response correlation, the single
//!   inbound dispatch loop
//! - **Object registry**: proxies for engine-owned objects, keyed by guid
//! - **Channel**: per-object call addressing and event listeners
//! - **Driver**: launching and reaping the engine process
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │    pwire     │  Typed proxies (Browser, Page, ...)
//! └──────┬───────┘
//!        │ implements ObjectFactory
//! ┌──────▼───────┐
//! │ pwire-runtime│  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  Correlation + dispatch loop
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Pipe transport
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Driver │  │  Process management
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod channel;
pub mod channel_owner;
pub mod connection;
pub mod driver;
pub mod error;
pub mod transport;

pub use channel::{Channel, Listener, ListenerId, Payload, Subscription};
pub use channel_owner::{ChannelOwner, ChannelOwnerImpl, OpaqueObject};
pub use connection::{
	Connection, ConnectionLike, ConnectionState, ObjectFactory, ObjectStore, PendingCalls,
	PendingResult,
};
pub use driver::{DriverCommand, DriverProcess};
pub use error::{Error, Result};
pub use transport::{FrameReceiver, FrameSender, PipeTransport};
