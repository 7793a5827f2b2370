pub mod clinic;
pub mod keys;
pub mod tx;

pub use clinic::ClinicId;
pub use keys::KeyHash;
pub use tx::{OutputRef, TxHash};
