// Adapters layer: concrete implementations for external systems (source, storage, warehouse).

pub mod source;
pub mod storage;
pub mod warehouse;
