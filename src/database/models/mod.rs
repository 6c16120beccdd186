pub mod hattra;
pub mod layanan;
pub mod org;
pub mod stats;
pub mod user;

pub use hattra::Hattra;
pub use layanan::Layanan;
pub use org::{Kestrad, Kota, Provinsi, Puskesmas};
pub use stats::OrgStats;
pub use user::{User, UserSummary};
