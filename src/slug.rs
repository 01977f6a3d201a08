//! Slug generation for output file names and URLs.

/// Lower-cased `text` keeping only `[a-z0-9-]`. May be empty.
pub fn slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Join a URL prefix and a slug into a pretty URL with a trailing slash.
pub fn url_for(prefix: &str, slug: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("/{}/", slug)
    } else if prefix.starts_with('/') {
        format!("{}/{}/", prefix, slug)
    } else {
        format!("/{}/{}/", prefix, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_simple() {
        assert_eq!(slug("macos"), "macos");
        assert_eq!(slug("Amazon-Linux"), "amazon-linux");
    }

    #[test]
    fn slug_strips_punctuation() {
        assert_eq!(slug("raspbian_os"), "raspbianos");
        assert_eq!(slug("nix.os"), "nixos");
        assert_eq!(slug("docker-compose"), "docker-compose");
        assert_eq!(slug("Amazon Linux 2"), "amazonlinux2");
    }

    #[test]
    fn slug_drops_non_ascii() {
        assert_eq!(slug("débian"), "dbian");
        assert_eq!(slug("+++"), "");
    }

    #[test]
    fn url_joins_with_single_slashes() {
        assert_eq!(url_for("/docs/setup/", "macos"), "/docs/setup/macos/");
        assert_eq!(url_for("docs/setup", "macos"), "/docs/setup/macos/");
        assert_eq!(url_for("", "macos"), "/macos/");
    }
}
