//! Local-to-server path translation
//!
//! The watcher sees host paths; Plex sees the paths its container
//! mounts. The mapping is not configured anywhere, so it is inferred by
//! longest-suffix matching on path components: the server root whose
//! trailing components align with the longest run of components inside
//! the local path wins, and the local path's remaining components are
//! appended to it.

use crate::plex::types::SectionRoot;

/// Split a path into components, treating both `/` and `\` as
/// delimiters and dropping empty and `.` components.
pub(crate) fn split_components(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}

/// Normalize a server-reported path: single forward slashes, no
/// trailing separator, leading slash preserved.
pub(crate) fn normalize(path: &str) -> String {
    let parts = split_components(path);
    let joined = parts.join("/");
    if path.starts_with('/') || path.starts_with('\\') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Map a local filesystem path to the Plex-visible path, using longest
/// suffix matching on path components (case-insensitive).
///
/// Returns the mapped path (forward-slashed, preserving the root's and
/// the children's original casing) together with the matched root, or
/// `None` when no root shares a suffix component with the local path.
pub fn map_to_plex_path<'a>(
    local_path: &str,
    roots: &'a [SectionRoot],
) -> Option<(String, &'a SectionRoot)> {
    let local_parts = split_components(local_path);
    if local_parts.is_empty() {
        return None;
    }
    let local_lower: Vec<String> = local_parts.iter().map(|p| p.to_lowercase()).collect();

    let mut best_k = 0;
    let mut best_children: Vec<&str> = Vec::new();
    let mut best_root: Option<&SectionRoot> = None;

    for root in roots {
        if root.root_path.is_empty() {
            continue;
        }
        let root_parts = split_components(&root.root_path);
        if root_parts.is_empty() {
            continue;
        }
        let root_lower: Vec<String> = root_parts.iter().map(|p| p.to_lowercase()).collect();

        // slide the last-k components of the root across the local path,
        // longest window first
        for k in (1..=root_lower.len()).rev() {
            if k > local_lower.len() {
                continue;
            }
            let suffix = &root_lower[root_lower.len() - k..];
            let matched_at = (0..=local_lower.len() - k)
                .find(|&idx| local_lower[idx..idx + k] == *suffix);
            if let Some(idx) = matched_at {
                if k > best_k {
                    best_k = k;
                    best_children = local_parts[idx + k..].to_vec();
                    best_root = Some(root);
                }
                // longest possible k for this root; move to the next root
                break;
            }
        }
    }

    let root = best_root?;
    let mut mapped = normalize(&root.root_path);
    for child in best_children {
        mapped.push('/');
        mapped.push_str(child);
    }
    Some((mapped, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plex::types::MediaKind;

    fn root(path: &str, kind: MediaKind) -> SectionRoot {
        SectionRoot {
            key: 1,
            title: path.to_string(),
            kind,
            root_path: path.to_string(),
        }
    }

    fn movie_roots() -> Vec<SectionRoot> {
        vec![
            root("/media/movies", MediaKind::Movie),
            root("/media/tv", MediaKind::Show),
        ]
    }

    #[test]
    fn test_suffix_match_maps_into_matched_root() {
        let roots = movie_roots();
        let (mapped, matched) =
            map_to_plex_path("/mnt/disk/library/movies/Dune/Dune.mkv", &roots).unwrap();
        assert_eq!(mapped, "/media/movies/Dune/Dune.mkv");
        assert_eq!(matched.root_path, "/media/movies");
    }

    #[test]
    fn test_no_shared_suffix_returns_none() {
        let roots = movie_roots();
        assert!(map_to_plex_path("/srv/downloads/file.mkv", &roots).is_none());
    }

    #[test]
    fn test_match_is_case_insensitive_but_preserves_case() {
        let roots = vec![root("/Media/Movies", MediaKind::Movie)];
        let (mapped, _) = map_to_plex_path("/mnt/MOVIES/Dune/Dune.mkv", &roots).unwrap();
        assert_eq!(mapped, "/Media/Movies/Dune/Dune.mkv");
    }

    #[test]
    fn test_longest_suffix_wins_across_roots() {
        let roots = vec![
            root("/media/movies", MediaKind::Movie),
            root("/library/movies", MediaKind::Movie),
        ];
        // two components of the second root appear in the local path
        let (mapped, matched) =
            map_to_plex_path("/mnt/library/movies/Dune/Dune.mkv", &roots).unwrap();
        assert_eq!(matched.root_path, "/library/movies");
        assert_eq!(mapped, "/library/movies/Dune/Dune.mkv");
    }

    #[test]
    fn test_mixed_separators() {
        let roots = movie_roots();
        let (mapped, _) =
            map_to_plex_path(r"C:\mnt\storage\movies\Dune\Dune.mkv", &roots).unwrap();
        assert_eq!(mapped, "/media/movies/Dune/Dune.mkv");
    }

    #[test]
    fn test_empty_and_separator_paths() {
        let roots = movie_roots();
        assert!(map_to_plex_path("", &roots).is_none());
        assert!(map_to_plex_path("/", &roots).is_none());
    }

    #[test]
    fn test_roots_with_empty_paths_are_skipped() {
        let roots = vec![root("", MediaKind::Movie), root("/media/tv", MediaKind::Show)];
        let (mapped, matched) =
            map_to_plex_path("/mnt/tv/Show/S01E01.mkv", &roots).unwrap();
        assert_eq!(matched.root_path, "/media/tv");
        assert_eq!(mapped, "/media/tv/Show/S01E01.mkv");
    }

    #[test]
    fn test_remapping_mapped_path_is_stable() {
        let roots = movie_roots();
        let (mapped, matched) =
            map_to_plex_path("/mnt/disk/library/movies/Dune/Dune.mkv", &roots).unwrap();
        let (remapped, rematched) = map_to_plex_path(&mapped, &roots).unwrap();
        assert_eq!(remapped, mapped);
        assert_eq!(rematched.root_path, matched.root_path);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/media//movies/"), "/media/movies");
        assert_eq!(normalize(r"\media\movies"), "/media/movies");
        assert_eq!(normalize("media/movies"), "media/movies");
    }
}
