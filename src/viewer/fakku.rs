//! FAKKU reader: pages are cut into shuffled 128px tiles and the geometry
//! needed to put them back ships in an XOR-encrypted descriptor.

pub mod crypto;
pub mod data;
pub mod pipeline;
pub mod solver;
pub mod source;
pub mod spread;
