//! 도메인 모델.

mod claims;
mod session;
mod user;

pub use claims::{
    AccessClaims, RefreshClaims, TokenClaims, TokenKind, UntrustedClaims, VerifiedToken,
    WireClaims,
};
pub use session::{IssuedSession, SessionId, TokenPair};
pub use user::UserIdentity;
