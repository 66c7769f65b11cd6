use ammonia;

/// Clean user-authored content (question prompts, option text, explanations)
/// using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) survive, dangerous
/// tags (like <script>, <iframe>) and attributes (like onclick) are stripped.
/// Quiz content is authored by teachers but rendered to every student in the
/// class, so it gets the same treatment as any other stored user input.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
