//! Script normalization
//!
//! The index is built from Simplified Chinese, so traditional characters in
//! corpus files and follow-up questions are converted before they are
//! embedded or rewritten.

use zhconv::{zhconv, Variant};

/// Convert Traditional Chinese characters to Simplified; other text passes
/// through unchanged
pub fn to_simplified(text: &str) -> String {
    zhconv(text, Variant::ZhHans)
}
