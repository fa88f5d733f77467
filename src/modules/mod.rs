//! Infrastructure adapters used by the features layer.

pub mod storage;
