//! Clinic Registry Engine
//!
//! State-transition engine for the on-chain clinic registry. The registry is
//! a single map of approved clinics stored in the datum of one UTxO at the
//! registry script address; every mutation consumes that UTxO and produces a
//! replacement carrying the updated map.
//!
//! ## Architecture
//!
//! **Components:**
//! - `plutus`: Plutus Data model and canonical CBOR codec
//! - `state`: in-memory registry state and pure operation transitions
//! - `datum`: registry state to on-chain datum bytes and back
//! - `authorize`: authority policy mirroring the on-chain validator
//! - `builder`: unsigned consume-and-replace transaction drafts
//! - `provider`: traits for the external ledger and signing collaborators
//! - `coordinator`: fetch/build/sign/submit cycle with contention retry
//!
//! **Data Flow:**
//! 1. Coordinator fetches the live registry UTxO from the chain provider
//! 2. Datum codec decodes the current map, policy authorizes the operation
//! 3. Pure transition produces the next state, codec re-encodes it
//! 4. Builder drafts the replacement transaction, signer signs it
//! 5. Provider submits; a spent-input conflict restarts the cycle against
//!    the freshly updated registry

pub mod authorize;
pub mod builder;
pub mod coordinator;
pub mod datum;
pub mod plutus;
pub mod provider;
pub mod state;

// Re-export commonly used types
pub use authorize::{AuthError, AuthPolicy, RegistrationPolicy};
pub use builder::{BuildError, BuildParams, UnsignedTxDraft};
pub use coordinator::{Coordinator, CoordinatorError, CoordinatorSettings};
pub use datum::DecodeError;
pub use provider::{ChainError, ChainProvider, RegistryUtxo, SignedTx, SigningError, SubmitError, TxSigner};
pub use state::{apply, ApplyError, ClinicEntry, Operation, RegistryState};
