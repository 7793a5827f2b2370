//! Clinic Registry Backend Service
//!
//! HTTP gateway in front of the registry engine. Exposes the registry's
//! mutation endpoints (register / approve / revoke) and read endpoints over
//! the live on-chain state.
//!
//! ## Architecture
//!
//! **Components:**
//! - `config`: environment-driven configuration
//! - `api`: REST endpoints and error-to-status mapping
//! - `mock_node`: deterministic in-memory ledger for development/testing
//! - `blockfrost_client`: chain provider against a Blockfrost-style indexer
//! - `signer`: mock and remote signing collaborators
//!
//! **Data Flow:**
//! 1. A mutation request arrives with a clinic id and acting identity
//! 2. The engine coordinator fetches the live registry UTxO, validates and
//!    applies the operation, and drafts the replacement transaction
//! 3. The signer signs the draft, the chain provider submits it
//! 4. On a spent-input conflict the coordinator retries against the updated
//!    registry; the caller receives the final transaction hash or a
//!    structured error

pub mod api;
pub mod blockfrost_client;
pub mod config;
pub mod mock_node;
pub mod signer;

// Re-export commonly used types
pub use blockfrost_client::BlockfrostClient;
pub use config::Config;
pub use mock_node::MockNode;
pub use signer::{MockSigner, RemoteSigner};
