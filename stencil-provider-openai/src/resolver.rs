//! Which structured-output technique each OpenAI model supports.

use stencil_structured::Capability;

/// Model prefixes with no structured output at all. Checked first.
const UNSUPPORTED: &[&str] = &["o1-mini", "o1-preview"];

/// Model prefixes that accept `text.format = json_schema`.
const NATIVE: &[&str] = &["gpt-4o", "gpt-4.1", "gpt-5", "o1", "o3", "o4-mini"];

/// Capability of `model` for `StructuredMode::Auto` resolution.
///
/// Unknown models fall back to JSON mode, which every chat model accepts.
///
/// ```
/// use stencil_provider_openai::capability_for_model;
/// use stencil_structured::Capability;
///
/// assert_eq!(capability_for_model("gpt-4o-2024-08-06"), Capability::NativeStructured);
/// assert_eq!(capability_for_model("o1-mini"), Capability::Unsupported);
/// assert_eq!(capability_for_model("gpt-3.5-turbo"), Capability::JsonMode);
/// ```
#[must_use]
pub fn capability_for_model(model: &str) -> Capability {
    if UNSUPPORTED.iter().any(|p| model.starts_with(p)) {
        Capability::Unsupported
    } else if NATIVE.iter().any(|p| model.starts_with(p)) {
        Capability::NativeStructured
    } else {
        Capability::JsonMode
    }
}
