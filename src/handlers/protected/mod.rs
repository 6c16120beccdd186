// handlers/protected/mod.rs - Gated handlers
//
// Each handler asks a gate first and only then looks at its inputs, so an
// anonymous caller sees 401 and an unqualified one 403 regardless of body.

pub mod auth;
pub mod hattra;
pub mod layanan;
pub mod org;
pub mod users;
