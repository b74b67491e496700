// src/translate.rs
//! Optional text-translation seam. The pipeline calls `translate` per ranked
//! item when a translator is configured; the core ships only the identity
//! implementation, real backends live outside this crate.

pub trait Translate: Send + Sync {
    /// Pure text-to-text mapping. Must not fail; a backend that cannot
    /// translate should return the input unchanged.
    fn translate(&self, text: &str) -> String;
}

/// Pass-through translator.
pub struct Identity;

impl Translate for Identity {
    fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_returns_input_unchanged() {
        assert_eq!(Identity.translate("convex relaxation"), "convex relaxation");
    }
}
