//! Client library for the steelcode watchdog service.
//!
//! A watchdog is a named liveness record held by the remote service. Clients
//! periodically renew it (`kick`) or mark it failed (`fault`); operators
//! administer namespaces by prefix (`auth`, `status`, `retire`, `clear`).
//! Every operation signs its target with a shared 32-byte secret and runs
//! one failover pass over an ordered list of service replicas.
//!
//! ```rust,ignore
//! use watchdog_client::WatchdogClient;
//!
//! let client = WatchdogClient::from_env()?;
//! client.kick("myhost.sd.etcd", 600).await?;
//! client.fault("myhost.memory", "130.52 MB available").await?;
//! ```

pub mod error;
pub mod name;
pub mod sign;
pub mod status;
pub mod token;
pub mod transport;

mod client;

pub use client::{Reporter, WatchdogClient, DEFAULT_KICK_TTL};
pub use error::{Result, WatchdogError};
pub use name::{ensure_valid, is_valid_name};
pub use status::{StatusRow, STATUS_GOOD};
pub use token::{SecretToken, TokenSource};
pub use transport::{EndpointPool, DEFAULT_ENDPOINTS};
