//! REST API module
//!
//! Read-only HTTP access to chain state for dashboards. The chain is
//! reloaded from disk on each request, so changes made through the CLI show
//! up without restarting the server.
//!
//! # Endpoints
//!
//! - `GET /health` - Status and counters
//! - `GET /api/contracts` - List deployed contracts
//! - `GET /api/contracts/:address` - Raw contract state
//! - `GET /api/wallets/:address` - Owners, threshold, nonce and balance
//! - `GET /api/wallets/:address/transactions` - Transactions, filtered with
//!   `from`, `to`, `pending` and `executed` query parameters
//! - `GET /api/wallets/:address/transactions/:id` - One transaction with its
//!   confirmations
//! - `GET /api/registries/:address/resolve/:name` - Resolve a name

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::{create_router, serve, ApiConfig};
