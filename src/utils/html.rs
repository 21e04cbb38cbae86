// src/utils/html.rs

/// Sanitizes admin-authored rich text (question statements, explanations).
///
/// Whitelist-based: formatting tags such as <b>, <p>, <sub> survive, while
/// <script>, <iframe> and event-handler attributes are stripped.
pub fn sanitize_rich_text(input: &str) -> String {
    ammonia::clean(input)
}

/// Strips every tag, keeping only text. Used for titles and answer options,
/// which are rendered as plain labels.
pub fn sanitize_plain(input: &str) -> String {
    ammonia::Builder::empty().clean(input).to_string()
}
