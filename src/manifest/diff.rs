use std::collections::BTreeMap;

use super::{Asset, Manifest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Modified,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDiff {
    pub kind: DiffKind,
    pub asset: Asset,
}

/// Per-asset differences turning `local` into `remote`.
///
/// Added and modified entries snapshot the remote asset, deleted entries the
/// local one. Deleted entries are informational and never downloaded.
pub fn diff(local: &Manifest, remote: &Manifest) -> BTreeMap<String, AssetDiff> {
    let mut changes = BTreeMap::new();

    for (key, local_asset) in local.assets() {
        match remote.asset(key) {
            None => {
                changes.insert(
                    key.clone(),
                    AssetDiff {
                        kind: DiffKind::Deleted,
                        asset: local_asset.clone(),
                    },
                );
            }
            Some(remote_asset) if local_asset.content_differs(remote_asset) => {
                changes.insert(
                    key.clone(),
                    AssetDiff {
                        kind: DiffKind::Modified,
                        asset: remote_asset.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }

    for (key, remote_asset) in remote.assets() {
        if local.asset(key).is_none() {
            changes.insert(
                key.clone(),
                AssetDiff {
                    kind: DiffKind::Added,
                    asset: remote_asset.clone(),
                },
            );
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(assets: &[(&str, u64, &str)]) -> Manifest {
        let mut manifest = Manifest::empty();
        for (key, size, checksum) in assets {
            manifest.insert_asset(*key, Asset::new(*key, *size, *checksum));
        }
        manifest
    }

    #[test]
    fn classifies_added_modified_deleted() {
        let local = manifest(&[("a", 1, "a1"), ("b", 1, "b1")]);
        let remote = manifest(&[("a", 1, "a2"), ("c", 4, "c1")]);

        let changes = diff(&local, &remote);
        let kinds: Vec<_> = changes
            .iter()
            .map(|(key, change)| (key.as_str(), change.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("a", DiffKind::Modified),
                ("b", DiffKind::Deleted),
                ("c", DiffKind::Added),
            ]
        );
        assert_eq!(changes["a"].asset.checksum, "a2");
        assert_eq!(changes["b"].asset.checksum, "b1");
    }

    #[test]
    fn identical_manifests_have_no_diff() {
        let local = manifest(&[("a", 1, "x"), ("b", 2, "")]);
        let remote = manifest(&[("a", 1, "X"), ("b", 2, "")]);
        assert!(diff(&local, &remote).is_empty());
    }

    #[test]
    fn falls_back_to_size_without_checksums() {
        let local = manifest(&[("a", 1, ""), ("b", 2, "")]);
        let remote = manifest(&[("a", 5, ""), ("b", 2, "")]);
        let changes = diff(&local, &remote);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["a"].kind, DiffKind::Modified);
    }

    #[test]
    fn key_set_is_union_of_changed_keys() {
        let local = manifest(&[("shared", 1, "s"), ("gone", 1, "g"), ("edit", 1, "e")]);
        let remote = manifest(&[("shared", 1, "s"), ("new", 1, "n"), ("edit", 1, "E2")]);
        let keys: Vec<_> = diff(&local, &remote).into_keys().collect();
        assert_eq!(keys, vec!["edit", "gone", "new"]);
    }
}
