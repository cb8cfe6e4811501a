use std::path::{Component, Path};

/// Convert to a lowercase ASCII slug. Alphanumerics and underscores
/// survive; every other run of characters (after `deunicode`
/// transliteration) collapses into a single interior hyphen.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut gap = false;
    for ch in input.chars() {
        for byte in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if gap && !slug.is_empty() {
                        slug.push('-');
                    }

                    gap = false;
                    slug.push(byte.to_ascii_lowercase() as char);
                }
                _ => gap = true,
            }
        }
    }

    slug
}

/// The `/`-separated snapshot key for a relative path. Only normal
/// components survive, so `./a/b` and `a/b` map to the same key.
pub fn path_key<P: AsRef<Path>>(path: P) -> String {
    let mut key = String::new();
    for component in path.as_ref().components() {
        if let Component::Normal(part) = component {
            if !key.is_empty() {
                key.push('/');
            }

            key.push_str(&part.to_string_lossy());
        }
    }

    key
}

/// The final segment of a snapshot key.
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// The extension of a key's final segment, if any.
pub fn extension(key: &str) -> Option<&str> {
    basename(key).rsplit_once('.').map(|(_, ext)| ext)
}

/// Swap (or add) the extension of a key's final segment.
pub fn with_extension(key: &str, ext: &str) -> String {
    let (dir, name) = match key.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, key),
    };

    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    match dir {
        Some(dir) => format!("{dir}/{stem}.{ext}"),
        None => format!("{stem}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Spaced   out  "), "spaced-out");
        assert_eq!(slugify("under_score kept"), "under_score-kept");
        assert_eq!(slugify("Çirçé & Друг"), "circe-drug");
        assert_eq!(slugify("!!leading junk"), "leading-junk");
        assert_eq!(slugify("2021: A Year"), "2021-a-year");
    }

    #[test]
    fn test_path_key() {
        assert_eq!(path_key("a/b/c.md"), "a/b/c.md");
        assert_eq!(path_key("./a/b"), "a/b");
        assert_eq!(path_key(Path::new("solo.txt")), "solo.txt");
    }

    #[test]
    fn test_key_parts() {
        assert_eq!(basename("a/b/c.md"), "c.md");
        assert_eq!(basename("c.md"), "c.md");
        assert_eq!(extension("a/b/c.md"), Some("md"));
        assert_eq!(extension("a.b/c"), None);
        assert_eq!(with_extension("a/b/c.md", "html"), "a/b/c.html");
        assert_eq!(with_extension("a.b/c", "html"), "a.b/c.html");
        assert_eq!(with_extension("plain", "css"), "plain.css");
    }
}
