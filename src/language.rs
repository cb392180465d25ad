use whatlang::Lang;

use crate::models::Language;

/// Classify `text` as Vietnamese or English.
///
/// Empty, ambiguous or unreliable input yields `fallback` (Vietnamese when
/// no fallback is given). Any detected language other than Vietnamese maps
/// to English.
pub fn detect(text: &str, fallback: Option<Language>) -> Language {
    let fallback = fallback.unwrap_or_default();

    match whatlang::detect(text.trim()) {
        Some(info) if info.is_reliable() => {
            if info.lang() == Lang::Vie {
                Language::Vi
            } else {
                Language::En
            }
        }
        Some(info) => {
            tracing::debug!(
                "Unreliable language guess {:?} (confidence {:.2}), using {}",
                info.lang(),
                info.confidence(),
                fallback
            );
            fallback
        }
        None => fallback,
    }
}
