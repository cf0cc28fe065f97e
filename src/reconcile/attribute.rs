use std::collections::HashSet;

use crate::directory::{AttributeChange, Attributes, ChangeOp, ChangeSet, EntryKind};

/// What to do with one directory entry, derived purely from the source
/// attributes and the destination lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    None,
    Add(Attributes),
    Modify(ChangeSet),
    Error(String),
}

/// How an empty or non-empty changeset maps onto the NONE/MODIFY outcome.
///
/// The original tool inverted the mapping for domains (empty changeset
/// reported MODIFY, non-empty reported NONE), so domains were effectively
/// never updated in place. Until the intended behavior is confirmed both
/// mappings stay available and the choice is explicit configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionPolicy {
    /// Empty changeset means NONE, non-empty means MODIFY.
    #[default]
    Consistent,
    /// The historical domain-level inversion, kept bug-for-bug.
    LegacyInverted,
}

/// Asymmetric, non-destructive attribute diff. Only attributes named in
/// `allow_list` are considered; attributes present only in the destination
/// are left alone unless `delete_missing` is set.
pub fn diff_attributes(
    source: &Attributes,
    destination: &Attributes,
    allow_list: &[&str],
    delete_missing: bool,
) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (attribute, src_values) in source {
        if !allow_list.contains(&attribute.as_str()) {
            continue;
        }
        match destination.get(attribute) {
            None => {
                changes.push(AttributeChange::new(
                    ChangeOp::Add,
                    attribute,
                    src_values.clone(),
                ));
            }
            Some(dst_values) => {
                if !values_equal(src_values, dst_values) {
                    changes.push(AttributeChange::new(
                        ChangeOp::Replace,
                        attribute,
                        src_values.clone(),
                    ));
                }
            }
        }
    }

    if delete_missing {
        for attribute in destination.keys() {
            if allow_list.contains(&attribute.as_str()) && !source.contains_key(attribute) {
                changes.push(AttributeChange::new(ChangeOp::Delete, attribute, Vec::new()));
            }
        }
    }

    changes
}

/// Order-insensitive value-set comparison.
fn values_equal(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

/// Decide whether the entry must be created, updated or left alone.
/// `destination` is the result of the destination lookup by natural key;
/// `None` means the entry does not exist there yet.
pub fn decide(
    kind: EntryKind,
    source: &Attributes,
    destination: Option<&Attributes>,
    policy: DecisionPolicy,
    delete_missing: bool,
) -> SyncDecision {
    let allow_list = kind.sync_attrs();
    let Some(destination) = destination else {
        let attributes: Attributes = source
            .iter()
            .filter(|(name, _)| allow_list.contains(&name.as_str()))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        return SyncDecision::Add(attributes);
    };

    let changes = diff_attributes(source, destination, allow_list, delete_missing);
    match policy {
        DecisionPolicy::Consistent => {
            if changes.is_empty() {
                SyncDecision::None
            } else {
                SyncDecision::Modify(changes)
            }
        }
        DecisionPolicy::LegacyInverted => {
            if changes.is_empty() {
                SyncDecision::Modify(changes)
            } else {
                SyncDecision::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn attrs(pairs: &[(&str, &[&str])]) -> Attributes {
        pairs
            .iter()
            .map(|(name, values)| {
                (
                    (*name).to_string(),
                    values.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    #[fixture]
    fn source() -> Attributes {
        attrs(&[
            ("mail", &["john@example.com"]),
            ("cn", &["John Doe"]),
            ("enabledService", &["mail", "imap", "pop3"]),
            ("secretInternal", &["nope"]),
        ])
    }

    #[rstest]
    fn test_missing_destination_attribute_yields_add(source: Attributes) {
        let destination = attrs(&[("mail", &["john@example.com"])]);
        let changes = diff_attributes(
            &source,
            &destination,
            EntryKind::User.sync_attrs(),
            false,
        );

        let ops: Vec<_> = changes
            .iter()
            .map(|c| (c.op(), c.attribute().to_string()))
            .collect();
        assert_contains!(ops, &(ChangeOp::Add, "cn".to_string()));
        assert_contains!(ops, &(ChangeOp::Add, "enabledService".to_string()));
    }

    #[rstest]
    fn test_multivalued_comparison_is_order_insensitive(source: Attributes) {
        let destination = attrs(&[
            ("mail", &["john@example.com"]),
            ("cn", &["John Doe"]),
            ("enabledService", &["pop3", "mail", "imap"]),
        ]);
        let changes = diff_attributes(
            &source,
            &destination,
            EntryKind::User.sync_attrs(),
            false,
        );
        assert!(changes.is_empty(), "reordered values must not diff");
    }

    #[rstest]
    fn test_changed_single_value_yields_replace(source: Attributes) {
        let destination = attrs(&[
            ("mail", &["john@example.com"]),
            ("cn", &["Old Name"]),
            ("enabledService", &["mail", "imap", "pop3"]),
        ]);
        let changes = diff_attributes(
            &source,
            &destination,
            EntryKind::User.sync_attrs(),
            false,
        );
        assert_eq!(1, changes.len());
        let change = changes.iter().next().unwrap();
        assert_eq!(ChangeOp::Replace, change.op());
        assert_eq!("cn", change.attribute());
        assert_eq!(&["John Doe".to_string()], change.values());
    }

    #[rstest]
    fn test_changes_never_reference_attributes_outside_allow_list(source: Attributes) {
        let destination = Attributes::new();
        let changes =
            diff_attributes(&source, &destination, EntryKind::User.sync_attrs(), false);
        for change in changes.iter() {
            assert_contains!(EntryKind::User.sync_attrs(), &change.attribute());
        }
    }

    #[rstest]
    fn test_destination_only_attribute_is_kept_unless_deletion_enabled(source: Attributes) {
        let mut destination = source.clone();
        destination.insert("title".to_string(), vec!["ancient".to_string()]);

        let kept = diff_attributes(&source, &destination, EntryKind::User.sync_attrs(), false);
        assert!(kept.is_empty());

        let deleted =
            diff_attributes(&source, &destination, EntryKind::User.sync_attrs(), true);
        assert_eq!(1, deleted.len());
        let change = deleted.iter().next().unwrap();
        assert_eq!(ChangeOp::Delete, change.op());
        assert_eq!("title", change.attribute());
    }

    #[rstest]
    fn test_decide_add_restricts_to_allow_list(source: Attributes) {
        let decision = decide(
            EntryKind::User,
            &source,
            None,
            DecisionPolicy::Consistent,
            false,
        );
        let SyncDecision::Add(attributes) = decision else {
            panic!("missing destination entry must yield ADD");
        };
        assert_none!(attributes.get("secretInternal"));
        assert_some!(attributes.get("cn"));
    }

    #[rstest]
    fn test_decide_is_idempotent_after_apply(source: Attributes) {
        // Applying the ADD result and deciding again must yield NONE.
        let SyncDecision::Add(applied) = decide(
            EntryKind::User,
            &source,
            None,
            DecisionPolicy::Consistent,
            false,
        ) else {
            panic!("expected ADD");
        };
        let second = decide(
            EntryKind::User,
            &source,
            Some(&applied),
            DecisionPolicy::Consistent,
            false,
        );
        assert_eq!(SyncDecision::None, second);
    }

    #[rstest]
    fn test_consistent_policy_maps_nonempty_changeset_to_modify() {
        let destination = attrs(&[("cn", &["Old Name"])]);
        let decision = decide(
            EntryKind::Domain,
            &attrs(&[("cn", &["New Name"])]),
            Some(&destination),
            DecisionPolicy::Consistent,
            false,
        );
        assert_matches!(decision, SyncDecision::Modify(_));
    }

    #[rstest]
    fn test_legacy_inverted_policy_swaps_none_and_modify() {
        let source = attrs(&[("cn", &["New Name"])]);
        let same = attrs(&[("cn", &["New Name"])]);
        let different = attrs(&[("cn", &["Old Name"])]);

        let on_diff = decide(
            EntryKind::Domain,
            &source,
            Some(&different),
            DecisionPolicy::LegacyInverted,
            false,
        );
        assert_eq!(SyncDecision::None, on_diff);

        let on_equal = decide(
            EntryKind::Domain,
            &source,
            Some(&same),
            DecisionPolicy::LegacyInverted,
            false,
        );
        let SyncDecision::Modify(changes) = on_equal else {
            panic!("legacy policy reports MODIFY for an empty changeset");
        };
        assert!(changes.is_empty());
    }
}
