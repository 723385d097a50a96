//! Parsers for the line-oriented configuration formats touched during
//! P2V fixup: the mount table, the init table, and the shadow database.

pub mod fstab;
pub mod inittab;
pub mod shadow;
