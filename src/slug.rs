//! Slug generation utilities, used for human-friendly session directory
//! names and reporting.

/// Maximum length for generated slugs (directory names).
const MAX_SLUG_LENGTH: usize = 30;

/// Convert a string to a URL-friendly slug (basic conversion).
///
/// Does NOT truncate - use `slugify_truncate` for length-limited slugs.
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    let mut result = String::new();
    let mut prev_dash = true;
    for c in slug.chars() {
        if c == '-' {
            if !prev_dash {
                result.push(c);
            }
            prev_dash = true;
        } else {
            result.push(c);
            prev_dash = false;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Convert a string to a URL-friendly slug with truncation at word
/// boundaries, staying under `MAX_SLUG_LENGTH`.
pub fn slugify_truncate(task: &str) -> String {
    let mut result = slugify(task);

    if result.len() > MAX_SLUG_LENGTH {
        if let Some(pos) = result[..MAX_SLUG_LENGTH].rfind('-') {
            result.truncate(pos);
        } else {
            result.truncate(MAX_SLUG_LENGTH);
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Validate and normalize a caller-supplied slug (e.g. an explicit
/// `--slug` flag or a session id fragment).
pub fn validate_slug(raw: &str) -> Result<String, String> {
    let cleaned = raw.trim_matches('"').trim_matches('\'').trim();
    let slug = slugify(cleaned);

    if slug.is_empty() {
        return Err("slug is empty after normalization".to_string());
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(format!("slug too long: {} chars (max {MAX_SLUG_LENGTH})", slug.len()));
    }

    Ok(slug)
}
