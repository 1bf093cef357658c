use crate::expansion::ExpandedSet;
use crate::model::{Entity, EntityId};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashMap, HashSet};

/// id -> record lookup over the flat list. Reads parent links directly and
/// does not need a built forest.
pub struct ParentIndex<'a> {
    by_id: HashMap<EntityId, &'a Entity>,
}

impl<'a> ParentIndex<'a> {
    pub fn new(entities: &'a [Entity]) -> Self {
        let mut by_id = HashMap::with_capacity(entities.len());
        for entity in entities {
            by_id.entry(entity.id).or_insert(entity);
        }
        Self { by_id }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Ancestors of `id`, nearest first, excluding `id`. Stops at a missing
    /// or self parent, and at the first id seen twice.
    pub fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        if !self.contains(id) {
            return chain;
        }
        let mut seen = HashSet::from([id]);
        let mut cursor = id;
        while let Some(parent) = self
            .by_id
            .get(&cursor)
            .and_then(|entity| entity.manager_id())
            .filter(|parent| self.contains(*parent))
        {
            if !seen.insert(parent) {
                tracing::debug!(target_id = id, repeated = parent, "parent chain loops");
                break;
            }
            chain.push(parent);
            cursor = parent;
        }
        chain
    }

    pub fn path_to_root(&self, id: EntityId) -> BTreeSet<EntityId> {
        if !self.contains(id) {
            return BTreeSet::new();
        }
        let mut path: BTreeSet<EntityId> = self.ancestors(id).into_iter().collect();
        path.insert(id);
        path
    }
}

/// Ids from `target_id` up to its root, inclusive. Empty if the target is
/// not in `entities`.
pub fn highlight_path(entities: &[Entity], target_id: EntityId) -> BTreeSet<EntityId> {
    ParentIndex::new(entities).path_to_root(target_id)
}

/// Copy of `expanded` with every ancestor of `target_id` added, so the
/// target becomes visible. The target itself is left as it was.
pub fn ensure_visible(
    entities: &[Entity],
    expanded: &ExpandedSet,
    target_id: EntityId,
) -> ExpandedSet {
    let mut next = expanded.clone();
    next.extend(ParentIndex::new(entities).ancestors(target_id));
    next
}

fn search_pattern(query: &str) -> Option<Regex> {
    let needle = query.trim();
    if needle.is_empty() {
        return None;
    }
    match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            tracing::warn!(error = %err, "search query rejected");
            None
        }
    }
}

fn entity_matches(entity: &Entity, pattern: &Regex) -> bool {
    if pattern.is_match(&entity.name) {
        return true;
    }
    if entity
        .title
        .as_deref()
        .is_some_and(|title| pattern.is_match(title))
    {
        return true;
    }
    entity
        .fields
        .values()
        .filter_map(|value| value.as_str())
        .any(|text| pattern.is_match(text))
}

/// Case-insensitive literal search over name, title and text fields.
/// Matches come back in input order. Only the first record per id is
/// searched, the same record the tree keeps.
pub fn search(entities: &[Entity], query: &str) -> Vec<EntityId> {
    let Some(pattern) = search_pattern(query) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    entities
        .iter()
        .filter(|entity| seen.insert(entity.id))
        .filter(|entity| entity_matches(entity, &pattern))
        .map(|entity| entity.id)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReveal {
    pub matches: Vec<EntityId>,
    /// Input expanded set plus the ancestors of every match.
    pub expanded: ExpandedSet,
    /// Union of the highlight paths of every match.
    pub highlighted: BTreeSet<EntityId>,
}

/// Runs a search and makes every hit visible and highlighted.
pub fn reveal_matches(entities: &[Entity], expanded: &ExpandedSet, query: &str) -> SearchReveal {
    let matches = search(entities, query);
    let index = ParentIndex::new(entities);
    let mut next = expanded.clone();
    let mut highlighted = BTreeSet::new();
    for id in &matches {
        let ancestors = index.ancestors(*id);
        next.extend(ancestors.iter().copied());
        highlighted.extend(ancestors);
        highlighted.insert(*id);
    }
    tracing::debug!(query, hits = matches.len(), "search revealed matches");
    SearchReveal {
        matches,
        expanded: next,
        highlighted,
    }
}
