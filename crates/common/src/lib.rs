/**
 * Source of "now" for every timestamp and
 *  expiry decision in the core.
 */
pub mod clock;
/**
 * Undo log for mutations that span the
 *  metadata store and the ciphertext store.
 */
pub mod compensation;
/**
 * Per-operation deadline and cancellation.
 */
pub mod context;
/**
 * Cryptographic types and operations.
 *  - Shared random generator
 *  - Per-user envelope keys
 *  - Password verifiers and token signing keys
 */
pub mod crypto;
pub mod error;
/**
 * Access control: bearer token in,
 *  bound caller identity out.
 */
pub mod gate;
/**
 * Share relations, logical shares and
 *  the resolver converting between them.
 */
pub mod share;
/**
 * Storage capabilities the core consumes,
 *  plus in-memory implementations.
 */
pub mod store;
pub mod testkit;
pub mod token;
pub mod types;
pub mod validation;
/**
 * The lifecycle manager exposing every
 *  user, secret and share operation.
 */
pub mod vault;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::context::{CancelHandle, Context};
    pub use crate::crypto::{Crypto, PasswordCost, SigningKey};
    pub use crate::error::{Result, VaultError};
    pub use crate::gate::{Caller, Session};
    pub use crate::share::{Expiry, Share, ShareRequest};
    pub use crate::store::{CiphertextStore, MetadataStore, StoreError};
    pub use crate::types::{Identity, Profile, Secret};
    pub use crate::vault::Vault;
    pub use crate::version::build_info;
}
