use std::path::{Component, Path};

/// Compute download progress as a percentage.
#[must_use]
pub fn progress_percent(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32) * 100.0,
        _ => 0.0,
    }
}

/// Remote location of an asset: the package URL is a plain prefix.
#[must_use]
pub fn asset_url(package_url: &str, path: &str) -> String {
    format!("{package_url}{path}")
}

/// Whether a relative path stays inside the directory it is joined onto.
#[must_use]
pub fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|part| matches!(part, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculates_progress_percent() {
        assert_eq!(progress_percent(0, Some(10)), 0.0);
        assert_eq!(progress_percent(5, Some(10)), 50.0);
        assert_eq!(progress_percent(10, Some(10)), 100.0);
        assert_eq!(progress_percent(5, None), 0.0);
        assert_eq!(progress_percent(5, Some(0)), 0.0);
    }

    #[test]
    fn asset_url_is_prefix_concatenation() {
        assert_eq!(
            asset_url("http://host/packageUrl/", "img/1.png"),
            "http://host/packageUrl/img/1.png"
        );
    }

    #[test]
    fn contained_paths_stay_relative() {
        assert!(is_contained("res/img/1.png"));
        assert!(is_contained("./a.txt"));
        assert!(!is_contained("../outside.txt"));
        assert!(!is_contained("res/../../outside.txt"));
        assert!(!is_contained("/etc/passwd"));
        assert!(!is_contained(""));
    }
}
