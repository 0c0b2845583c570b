//! Conversion between `file://` URLs and paths.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use url::Url;

/// Convert a `file://` URL to a path, decoding percent-escapes.
#[must_use]
pub fn url_to_path(url: &Url) -> Option<Utf8PathBuf> {
    if url.scheme() != "file" {
        return None;
    }

    let path = percent_encoding::percent_decode_str(url.path())
        .decode_utf8()
        .ok()?;

    #[cfg(windows)]
    let path = {
        // Remove leading '/' for paths like /C:/...
        path.strip_prefix('/').unwrap_or(&path)
    };

    Some(Utf8PathBuf::from(path.as_ref()))
}

/// Convert an absolute path to a `file://` URL.
#[must_use]
pub fn path_to_url(path: &Utf8Path) -> Option<Url> {
    Url::from_file_path(path.as_std_path()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_to_path_basic() {
        let url = Url::parse("file:///home/user/App.vue").unwrap();
        assert_eq!(url_to_path(&url).unwrap(), Utf8PathBuf::from("/home/user/App.vue"));
    }

    #[test]
    fn test_url_to_path_with_spaces() {
        let url = Url::parse("file:///home/user/my%20app/App.vue").unwrap();
        assert_eq!(
            url_to_path(&url).unwrap(),
            Utf8PathBuf::from("/home/user/my app/App.vue")
        );
    }

    #[test]
    fn test_url_to_path_non_file_scheme() {
        let url = Url::parse("https://example.com/App.vue").unwrap();
        assert!(url_to_path(&url).is_none());
    }

    #[test]
    fn test_relative_path_has_no_url() {
        assert!(path_to_url(Utf8Path::new("src/App.vue")).is_none());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_round_trip() {
        let path = Utf8PathBuf::from("/home/user/test file & more!.vue");
        let url = path_to_url(&path).unwrap();
        assert!(url.as_str().contains("%20"));
        assert_eq!(url_to_path(&url).unwrap(), path);
    }
}
