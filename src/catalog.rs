//! The built-in style reference catalog.

use std::path::PathBuf;

use crate::image::ImageSource;

/// A selectable reference style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleOption {
    pub label: &'static str,
    pub url: &'static str,
}

/// Styles shipped with the tool, mirroring the hosted picker.
pub const STYLES: &[StyleOption] = &[
    StyleOption {
        label: "Ghibli 1",
        url: "/styles/ghibli1.jpg",
    },
    StyleOption {
        label: "Ghibli 2",
        url: "/styles/ghibli2.jpg",
    },
    StyleOption {
        label: "Cartoon",
        url: "/styles/cartoon1.jpg",
    },
    StyleOption {
        label: "Starry",
        url: "/styles/starry.jpg",
    },
    StyleOption {
        label: "Mosaic",
        url: "/styles/mosaic.jpg",
    },
    StyleOption {
        label: "Wave",
        url: "/styles/wave.jpg",
    },
    StyleOption {
        label: "Sketch",
        url: "/styles/sketch.jpg",
    },
];

/// Look up a catalog entry by its display label, case-insensitively.
#[must_use]
pub fn find(label: &str) -> Option<&'static StyleOption> {
    STYLES
        .iter()
        .find(|style| style.label.eq_ignore_ascii_case(label))
}

/// Turn a style reference into a fetchable source.
///
/// `http(s)` references are fetched over the network; anything else is
/// treated as a local path, with a leading `/` stripped so catalog entries
/// resolve relative to the working directory.
#[must_use]
pub fn resolve(reference: &str) -> ImageSource {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        ImageSource::Url(reference.to_string())
    } else {
        ImageSource::Path(PathBuf::from(reference.trim_start_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_case_insensitively() {
        assert_eq!(find("mosaic").unwrap().url, "/styles/mosaic.jpg");
        assert_eq!(find("Mosaic").unwrap().url, "/styles/mosaic.jpg");
        assert!(find("not-a-style").is_none());
    }

    #[test]
    fn http_references_become_urls() {
        let source = resolve("https://example.com/wave.jpg");
        assert!(matches!(source, ImageSource::Url(url) if url == "https://example.com/wave.jpg"));
    }

    #[test]
    fn catalog_references_become_relative_paths() {
        let source = resolve("/styles/mosaic.jpg");
        assert!(
            matches!(source, ImageSource::Path(path) if path == PathBuf::from("styles/mosaic.jpg"))
        );
    }
}
