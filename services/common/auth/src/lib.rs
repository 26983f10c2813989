pub mod claims;
pub mod codec;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod roles;
pub mod store;

pub use claims::Claims;
pub use codec::{IssuedToken, TokenCodec};
pub use config::{CookieSameSite, SessionConfig};
pub use error::{AuthError, AuthResult};
pub use extractors::Identity;
pub use guards::{ensure_owner, ensure_role, GuardError};
pub use roles::Role;
pub use store::{AccountRecord, AccountStore, MemoryAccountStore, StoreError};
