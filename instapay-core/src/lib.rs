pub mod amount;
pub mod error;
pub mod format;
pub mod payee;
pub mod primitives;
pub mod qr;
pub mod uri;
