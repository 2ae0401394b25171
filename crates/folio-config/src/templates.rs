//! Configuration template for `folio init`.
//!
//! The template is valid TOML listing every key with its default, and is
//! written out commented so an untouched file behaves like no file.

/// Default configuration template (valid TOML).
const TEMPLATE: &str = r#"# folio configuration.
# Relative paths are resolved against the directory holding this file.

[library]
# Directory containing the PDF files to index.
data_dir = "data"
# Directory holding the search index (created on first use).
index_dir = "index"

[search]
# Hit counts above this use the fast manual highlighter.
fast_highlight_threshold = 200
# Number of books per streamed batch event.
batch_size = 10

[titles]
# Number of PDF titles kept in memory.
cache_capacity = 1000

[server]
# Address for `folio serve`.
bind = "127.0.0.1:8087"
"#;

/// Returns the configuration template as a commented-out example.
pub fn config_template() -> String {
    comment_template(TEMPLATE)
}

/// Converts a valid TOML template into a commented-out example config.
///
/// Lines that are already comments are preserved as-is. Non-comment, non-empty
/// lines get a "# " prefix. Empty lines are preserved.
fn comment_template(template: &str) -> String {
    let mut result = String::with_capacity(template.len() + template.lines().count() * 2);
    for line in template.lines() {
        if !line.is_empty() && !line.starts_with('#') {
            result.push_str("# ");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}
