// ==============
// backend-lib/src/metrics.rs

//! Central place for metric keys
pub const USER_REGISTERED: &str = "accounts.user.registered";
pub const USER_DELETED: &str = "accounts.user.deleted";
pub const LOGIN_SUCCEEDED: &str = "accounts.login.succeeded";
pub const LOGIN_FAILED: &str = "accounts.login.failed";
pub const TOKEN_REJECTED: &str = "accounts.token.rejected";
pub const CODE_ISSUED: &str = "accounts.code.issued";
pub const CODE_VERIFIED: &str = "accounts.code.verified";
pub const CODE_REJECTED: &str = "accounts.code.rejected";
pub const MAIL_FAILED: &str = "accounts.mail.failed";
