//! Post-processing of raw OCR output into a captcha answer.

/// Strip everything but ASCII digits from recognized text.
///
/// OCR output for a captcha often carries stray punctuation, whitespace, or
/// misread letters around the digits; only the digits are the answer. An
/// empty result means the engine found no digits at all, which callers
/// report as an outcome rather than an error.
pub fn extract_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}
