//! Shared types for the firmament sky renderer.
//!
//! Backend handles are plain indices: the backend owns the objects they
//! name, the sky only holds the handles.

mod colour;
mod types;

pub use colour::Colour;
pub use types::{BillboardSetId, EntityId, MaterialId, NodeId, Transform};

pub fn crate_info() -> &'static str {
    "firmament-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
