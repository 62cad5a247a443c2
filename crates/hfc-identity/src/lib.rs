//! # HFC Identity
//!
//! Signing identities and crypto suites for ledger clients.
//!
//! An [`Identity`] pairs an enrolled certificate with its MSP id and private
//! key. A [`CryptoSuite`] hashes and signs on its behalf; the default
//! [`EcdsaP256Sha256`] suite produces the low-S DER signatures peers and
//! orderers expect.
//!
//! ## Example
//!
//! ```rust
//! use hfc_identity::{CryptoSuite, EcdsaP256Sha256, Identity, PrivateKey, TransactionId};
//!
//! let identity = Identity::new(b"-----BEGIN CERTIFICATE-----".to_vec(), "Org1MSP", PrivateKey::generate());
//! let suite = EcdsaP256Sha256;
//!
//! let txid = TransactionId::new(identity.creator(), &suite);
//! assert_eq!(txid.id().len(), 64);
//!
//! let signature = suite.sign(b"payload", identity.private_key()).unwrap();
//! assert!(!signature.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod identity;
mod key;
mod suite;
mod txid;

pub use error::{IdentityError, Result};
pub use identity::Identity;
pub use key::PrivateKey;
pub use suite::{suite_for, CryptoSuite, EcdsaP256Sha256};
pub use txid::{TransactionId, NONCE_SIZE};
