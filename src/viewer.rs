#[cfg(feature = "fakku")]
pub mod fakku;
