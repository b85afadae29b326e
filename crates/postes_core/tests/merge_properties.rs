use std::collections::HashSet;

use postes_core::{
    group_options, import_suggestions, validate, EstablishmentId, JobCatalog, JobLabel, LabelId,
    MergeRecord, MergeSet, OptionMode, SuggestionEntry,
};
use pretty_assertions::assert_eq;

fn establishment() -> EstablishmentId {
    EstablishmentId::new("12345678900011")
}

fn catalog(ids: &[LabelId]) -> JobCatalog {
    JobCatalog::new(ids.iter().map(|&id| JobLabel::new(id, format!("Poste {id}"))))
}

fn labels(catalog: &JobCatalog, ids: &[LabelId]) -> Vec<JobLabel> {
    ids.iter().map(|&id| catalog.get(id).unwrap().clone()).collect()
}

fn member_ids(merges: &MergeSet) -> Vec<Vec<LabelId>> {
    merges.groups().iter().map(|group| group.member_ids()).collect()
}

#[test]
fn accepted_sets_have_pairwise_disjoint_groups() {
    let catalog = catalog(&[1, 2, 3, 4, 5, 6]);
    let layouts: Vec<Vec<Vec<LabelId>>> = vec![
        vec![vec![1, 2], vec![3, 4], vec![5, 6]],
        vec![vec![1, 2, 3], vec![3, 4]],
        vec![vec![6, 1], vec![2], vec![1, 5]],
        vec![vec![4, 5, 6, 1]],
    ];

    for layout in layouts {
        let mut merges = MergeSet::new(establishment());
        for group in &layout {
            merges.create_group_with(labels(&catalog, group));
        }
        if validate(&merges).is_ok() {
            let sets: Vec<HashSet<LabelId>> = merges
                .groups()
                .iter()
                .map(|group| group.member_ids().into_iter().collect())
                .collect();
            for (i, a) in sets.iter().enumerate() {
                for b in sets.iter().skip(i + 1) {
                    assert!(a.is_disjoint(b), "layout {layout:?} accepted with overlap");
                }
            }
        }
    }
}

#[test]
fn persisted_record_round_trips_against_unchanged_catalog() {
    let catalog = catalog(&[1, 2, 3, 4, 5]);
    let mut merges = MergeSet::new(establishment());
    merges.create_group_with(labels(&catalog, &[3, 1]));
    merges.create_group_with(labels(&catalog, &[5, 2, 4]));

    let text = merges.to_record().to_json_string();
    let restored = MergeRecord::from_json_str(&text).hydrate(establishment(), &catalog);

    assert_eq!(member_ids(&restored), member_ids(&merges));
    assert_eq!(
        restored.groups()[0].canonical_text(),
        merges.groups()[0].canonical_text()
    );
}

#[test]
fn hydration_drops_only_the_missing_id() {
    let record = MergeRecord::new(vec![vec![1, 2, 3], vec![4, 5]]);
    let restored = record.hydrate(establishment(), &catalog(&[1, 3, 4, 5]));
    assert_eq!(member_ids(&restored), vec![vec![1, 3], vec![4, 5]]);
}

#[test]
fn hydration_drops_group_left_with_one_member() {
    let record = MergeRecord::new(vec![vec![1, 2], vec![4, 5]]);
    let restored = record.hydrate(establishment(), &catalog(&[1, 2, 4]));
    assert_eq!(member_ids(&restored), vec![vec![1, 2]]);
}

#[test]
fn stored_record_with_unresolvable_group_hydrates_remaining_groups() {
    // [[1,2],[4]] against {1,2,3}
    let record = MergeRecord::from_json_str("[[1,2],[4]]");
    let restored = record.hydrate(establishment(), &catalog(&[1, 2, 3]));
    assert_eq!(member_ids(&restored), vec![vec![1, 2]]);
}

#[test]
fn colliding_suggestion_leaves_set_unchanged() {
    let catalog = catalog(&[1, 2, 3, 4]);
    let mut merges = MergeSet::new(establishment());
    merges.create_group_with(labels(&catalog, &[1, 2]));
    let before = merges.clone();

    let suggestions = import_suggestions(
        vec![vec![SuggestionEntry::new(3, "x"), SuggestionEntry::new(2, "y")]],
        &catalog,
    );
    let err = merges.accept_suggestion(&suggestions[0]).unwrap_err();

    assert_eq!(err.ids(), &[2]);
    assert_eq!(merges, before);
}

#[test]
fn accepted_suggestion_gets_a_fresh_group() {
    let catalog = catalog(&[1, 2, 3, 4]);
    let mut merges = MergeSet::new(establishment());
    let manual = merges.create_group_with(labels(&catalog, &[1, 2]));

    let suggestions = import_suggestions(
        vec![vec![SuggestionEntry::new(3, "x"), SuggestionEntry::new(4, "y")]],
        &catalog,
    );
    let accepted = merges.accept_suggestion(&suggestions[0]).unwrap();

    assert_ne!(manual, accepted);
    assert_eq!(member_ids(&merges), vec![vec![1, 2], vec![3, 4]]);
    assert!(validate(&merges).is_ok());
}

#[test]
fn hidden_merged_options_never_include_other_groups_labels() {
    let catalog = JobCatalog::new(vec![
        JobLabel::new(1, "A"),
        JobLabel::merged(2, "B"),
        JobLabel::new(3, "C"),
        JobLabel::new(4, "D"),
        JobLabel::merged(5, "E"),
    ]);
    let mut merges = MergeSet::new(establishment());
    let first = merges.create_group_with(labels(&catalog, &[1, 2]));
    let second = merges.create_group_with(labels(&catalog, &[3, 5]));

    for (editing, others) in [
        (Some(first), merges.claimed_ids(Some(first))),
        (Some(second), merges.claimed_ids(Some(second))),
        (None, merges.claimed_ids(None)),
    ] {
        let options = group_options(&catalog, &merges, editing, OptionMode::HideMerged);
        assert!(options.iter().all(|label| !others.contains(&label.id)));
    }
}

#[test]
fn option_filter_does_not_hide_conflicts_from_validator() {
    let catalog = catalog(&[1, 2, 3]);
    let mut merges = MergeSet::new(establishment());
    let first = merges.create_group_with(labels(&catalog, &[1, 2]));
    let second = merges.create_group();
    // Reached without going through the option list.
    merges.add_member(second, catalog.get(2).unwrap().clone()).unwrap();
    merges.add_member(second, catalog.get(3).unwrap().clone()).unwrap();

    let options = group_options(&catalog, &merges, Some(first), OptionMode::All);
    assert!(options.iter().all(|label| label.id != 3));
    assert_eq!(validate(&merges).unwrap_err().ids(), &[2]);
}
