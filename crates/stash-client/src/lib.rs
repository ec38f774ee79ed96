//! Client side of Stash: a typed HTTP client, token persistence, and the
//! dashboard state the `stash` CLI drives.

pub mod api;
pub mod board;
pub mod dashboard;
pub mod session;

pub use api::{ApiClient, ClientError};
pub use board::Board;
pub use dashboard::Dashboard;
pub use session::TokenStore;
