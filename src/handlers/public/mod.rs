// handlers/public/mod.rs - Handlers that accept anonymous callers
//
// Identity is still attached when a bearer token is present: user creation
// places the new account below whoever creates it.

pub mod auth;
pub mod users;
