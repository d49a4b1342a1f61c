pub mod backup;
pub mod ident;
pub mod migrator;
pub mod sequence;
