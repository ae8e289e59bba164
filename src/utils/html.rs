use ammonia;

/// Clean teacher-authored HTML content using the ammonia library.
///
/// Question text, answer options, explanations and exam instructions are
/// written by teachers and rendered verbatim to students, so they pass
/// through a whitelist-based sanitizer: safe tags (like <b>, <p>) survive,
/// dangerous tags (like <script>) and event attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
