//! Name-based reconciliation between a source and a target listing.
//!
//! Everything here is pure: no I/O, no clients. The pipeline feeds in two
//! catalogs and gets back a plan saying which targets already exist and
//! which must be created, then later asks which visibilities disagree.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::platform::{Repository, Visibility};

/// What the target side holds for one source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "repository", rename_all = "snake_case")]
pub enum TargetSlot {
    /// A target repository with the same name already exists.
    Existing(Repository),
    /// No match; this placeholder must be created first.
    Create(Repository),
}

impl TargetSlot {
    /// The target repository, existing or planned.
    pub fn repository(&self) -> &Repository {
        match self {
            TargetSlot::Existing(repo) | TargetSlot::Create(repo) => repo,
        }
    }

    pub fn needs_create(&self) -> bool {
        matches!(self, TargetSlot::Create(_))
    }
}

/// One source repository and its target slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub source: Repository,
    pub target: TargetSlot,
}

/// Result of [`reconcile`]: one entry per source repository, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub entries: Vec<PlanEntry>,
}

impl ReconcilePlan {
    /// Placeholders that must be created, in plan order.
    pub fn pending_creates(&self) -> Vec<&Repository> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.target {
                TargetSlot::Create(repo) => Some(repo),
                TargetSlot::Existing(_) => None,
            })
            .collect()
    }

    /// Number of source repositories that already have a target.
    pub fn existing_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.target.needs_create())
            .count()
    }

    /// Resolve the plan into a mapping once creates are done.
    ///
    /// `created` maps a placeholder name to the repository the create call
    /// produced. Placeholders with no entry stay as planned (dry run).
    pub fn into_mapping(self, created: &HashMap<String, Repository>) -> ReconciliationMapping {
        self.entries
            .into_iter()
            .map(|entry| {
                let target = match entry.target {
                    TargetSlot::Existing(repo) => repo,
                    TargetSlot::Create(placeholder) => created
                        .get(&placeholder.name)
                        .cloned()
                        .unwrap_or(placeholder),
                };
                MirrorPair {
                    source: entry.source,
                    target,
                }
            })
            .collect()
    }
}

/// A source repository paired with its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorPair {
    pub source: Repository,
    pub target: Repository,
}

impl MirrorPair {
    pub fn visibility_differs(&self) -> bool {
        self.source.visibility != self.target.visibility
    }
}

/// Source/target pairs, one per source repository, in source order.
pub type ReconciliationMapping = Vec<MirrorPair>;

/// The source listing cannot be paired by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Several source repositories (under different owners) share a name,
    /// so they would all land in one target repository.
    #[error("source repository names are not unique: {}", describe_collisions(.0))]
    DuplicateNames(BTreeMap<String, Vec<String>>),
}

impl ReconcileError {
    /// Colliding names mapped to the `owner/name` of every source using them.
    pub fn collisions(&self) -> &BTreeMap<String, Vec<String>> {
        match self {
            ReconcileError::DuplicateNames(collisions) => collisions,
        }
    }
}

fn describe_collisions(collisions: &BTreeMap<String, Vec<String>>) -> String {
    collisions
        .iter()
        .map(|(name, sources)| format!("'{name}' ({})", sources.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Pair every source repository with a target by exact name.
///
/// The first target with an equal name (case-sensitive, owner ignored) is
/// reused. Unmatched names get a placeholder owned by `target_owner` with the
/// source's visibility. Source names must be unique: two sources sharing a
/// name would be pushed into the same target, so the plan is refused.
pub fn reconcile(
    source: &[Repository],
    target: &[Repository],
    target_owner: &str,
) -> Result<ReconcilePlan, ReconcileError> {
    let mut by_source_name: HashMap<&str, Vec<String>> = HashMap::with_capacity(source.len());
    for repo in source {
        by_source_name
            .entry(repo.name.as_str())
            .or_default()
            .push(repo.full_name());
    }
    let collisions: BTreeMap<String, Vec<String>> = by_source_name
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(name, sources)| (name.to_string(), sources))
        .collect();
    if !collisions.is_empty() {
        return Err(ReconcileError::DuplicateNames(collisions));
    }

    let mut by_name: HashMap<&str, &Repository> = HashMap::with_capacity(target.len());
    for repo in target {
        by_name.entry(repo.name.as_str()).or_insert(repo);
    }

    let entries = source
        .iter()
        .map(|src| {
            let slot = match by_name.get(src.name.as_str()) {
                Some(existing) => TargetSlot::Existing((*existing).clone()),
                None => TargetSlot::Create(Repository::placeholder_for(src, target_owner)),
            };
            PlanEntry {
                source: src.clone(),
                target: slot,
            }
        })
        .collect();

    Ok(ReconcilePlan { entries })
}

/// Pairs whose target visibility must change, with the visibility to set.
pub fn visibility_updates(mapping: &[MirrorPair]) -> Vec<(usize, Visibility)> {
    mapping
        .iter()
        .enumerate()
        .filter(|(_, pair)| pair.visibility_differs())
        .map(|(index, pair)| (index, pair.source.visibility))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(owner: &str, name: &str, visibility: Visibility, id: Option<i64>) -> Repository {
        Repository {
            platform_id: id,
            owner: owner.to_string(),
            name: name.to_string(),
            visibility,
        }
    }

    fn src(name: &str, visibility: Visibility) -> Repository {
        repo("alice", name, visibility, Some(1))
    }

    #[test]
    fn test_every_source_gets_one_entry_with_same_name() {
        let source = vec![
            src("a", Visibility::Public),
            src("b", Visibility::Private),
            src("c", Visibility::Public),
        ];
        let target = vec![repo("al", "b", Visibility::Private, Some(20))];

        let plan = reconcile(&source, &target, "al").unwrap();

        assert_eq!(plan.entries.len(), 3);
        for (entry, source) in plan.entries.iter().zip(&source) {
            assert_eq!(&entry.source, source);
            assert_eq!(entry.target.repository().name, source.name);
        }
        assert_eq!(plan.existing_count(), 1);
    }

    #[test]
    fn test_existing_match_is_reused_unchanged() {
        let existing = repo("someone-else", "tool", Visibility::Public, Some(99));
        let plan =
            reconcile(&[src("tool", Visibility::Private)], &[existing.clone()], "al").unwrap();

        assert_eq!(plan.entries[0].target, TargetSlot::Existing(existing));
        assert!(plan.pending_creates().is_empty());
    }

    #[test]
    fn test_unmatched_source_gets_placeholder() {
        let plan = reconcile(&[src("notes", Visibility::Private)], &[], "al").unwrap();

        let creates = plan.pending_creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].owner, "al");
        assert_eq!(creates[0].name, "notes");
        assert_eq!(creates[0].visibility, Visibility::Private);
        assert_eq!(creates[0].platform_id, None);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let target = vec![repo("al", "Tool", Visibility::Public, Some(5))];
        let plan = reconcile(&[src("tool", Visibility::Public)], &target, "al").unwrap();
        assert!(plan.entries[0].target.needs_create());
    }

    #[test]
    fn test_first_target_match_wins() {
        let target = vec![
            repo("org", "dup", Visibility::Public, Some(1)),
            repo("al", "dup", Visibility::Private, Some(2)),
        ];
        let plan = reconcile(&[src("dup", Visibility::Public)], &target, "al").unwrap();
        assert_eq!(plan.entries[0].target.repository().platform_id, Some(1));
    }

    #[test]
    fn test_duplicate_source_names_are_refused() {
        let source = vec![
            repo("alice", "shared", Visibility::Public, Some(1)),
            src("solo", Visibility::Public),
            repo("alice-org", "shared", Visibility::Private, Some(2)),
        ];

        let err = reconcile(&source, &[], "al").unwrap_err();

        let collisions = err.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(
            collisions["shared"],
            vec!["alice/shared".to_string(), "alice-org/shared".to_string()]
        );
        assert_eq!(
            err.to_string(),
            "source repository names are not unique: 'shared' (alice/shared, alice-org/shared)"
        );
    }

    #[test]
    fn test_duplicate_source_names_are_refused_even_with_a_target_match() {
        let source = vec![
            repo("alice", "shared", Visibility::Public, Some(1)),
            repo("alice-org", "shared", Visibility::Private, Some(2)),
        ];
        let target = vec![repo("al", "shared", Visibility::Public, Some(9))];
        assert!(reconcile(&source, &target, "al").is_err());
    }

    #[test]
    fn test_empty_source_plans_nothing() {
        let target = vec![repo("al", "orphan", Visibility::Public, Some(3))];
        let plan = reconcile(&[], &target, "al").unwrap();
        assert!(plan.entries.is_empty());
        assert!(plan.into_mapping(&HashMap::new()).is_empty());
    }

    #[test]
    fn test_into_mapping_uses_created_repositories() {
        let plan = reconcile(
            &[src("new", Visibility::Public), src("old", Visibility::Public)],
            &[repo("al", "old", Visibility::Public, Some(7))],
            "al",
        )
        .unwrap();
        let mut created = HashMap::new();
        created.insert(
            "new".to_string(),
            repo("al", "new", Visibility::Public, Some(8)),
        );

        let mapping = plan.into_mapping(&created);

        assert_eq!(mapping[0].target.platform_id, Some(8));
        assert_eq!(mapping[1].target.platform_id, Some(7));
    }

    #[test]
    fn test_visibility_updates_lists_only_differences() {
        let mapping = vec![
            MirrorPair {
                source: src("a", Visibility::Private),
                target: repo("al", "a", Visibility::Public, Some(1)),
            },
            MirrorPair {
                source: src("b", Visibility::Public),
                target: repo("al", "b", Visibility::Public, Some(2)),
            },
        ];

        assert_eq!(visibility_updates(&mapping), vec![(0, Visibility::Private)]);
    }

    #[test]
    fn test_created_targets_never_need_visibility_updates() {
        let plan = reconcile(&[src("fresh", Visibility::Private)], &[], "al").unwrap();
        let mapping = plan.into_mapping(&HashMap::new());
        assert!(visibility_updates(&mapping).is_empty());
    }
}
