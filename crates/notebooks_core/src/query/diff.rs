//! Section/row diff between two snapshots of a live result set.
//!
//! # Invariants
//! - Row deletes and updates use index paths of the old snapshot; row inserts
//!   use index paths of the new snapshot. Moves carry both.
//! - Records that keep their relative order produce no move; only records
//!   outside the longest increasing run of old positions are reported as
//!   moved, plus any record whose section changed.

use crate::model::Entity;
use crate::query::results::ResultsSection;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

/// Position of a record inside a sectioned result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl Display for IndexPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionChange {
    Insert { index: usize, name: String },
    Delete { index: usize, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Insert { at: IndexPath },
    Delete { at: IndexPath },
    Update { at: IndexPath },
    Move { from: IndexPath, to: IndexPath },
}

/// All changes produced by one refresh of a live result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub sections: Vec<SectionChange>,
    pub rows: Vec<RowChange>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.rows.is_empty()
    }
}

struct Slot<'a, T> {
    path: IndexPath,
    flat: usize,
    section: &'a str,
    record: &'a T,
}

fn index_records<T: Entity>(sections: &[ResultsSection<T>]) -> HashMap<T::Id, Slot<'_, T>> {
    let mut slots = HashMap::new();
    let mut flat = 0;
    for (section_index, section) in sections.iter().enumerate() {
        for (row, record) in section.objects().iter().enumerate() {
            slots.insert(
                record.id(),
                Slot {
                    path: IndexPath::new(section_index, row),
                    flat,
                    section: section.name(),
                    record,
                },
            );
            flat += 1;
        }
    }
    slots
}

/// Computes the batch that turns `old` into `new`.
pub(crate) fn diff_sections<T: Entity + PartialEq>(
    old: &[ResultsSection<T>],
    new: &[ResultsSection<T>],
) -> ChangeBatch {
    let mut batch = ChangeBatch::default();

    let old_names: HashSet<&str> = old.iter().map(ResultsSection::name).collect();
    let new_names: HashSet<&str> = new.iter().map(ResultsSection::name).collect();
    for (index, section) in old.iter().enumerate() {
        if !new_names.contains(section.name()) {
            batch.sections.push(SectionChange::Delete {
                index,
                name: section.name().to_string(),
            });
        }
    }
    for (index, section) in new.iter().enumerate() {
        if !old_names.contains(section.name()) {
            batch.sections.push(SectionChange::Insert {
                index,
                name: section.name().to_string(),
            });
        }
    }

    let old_slots = index_records(old);
    let new_slots = index_records(new);

    for section in old {
        for record in section.objects() {
            if !new_slots.contains_key(&record.id()) {
                batch.rows.push(RowChange::Delete {
                    at: old_slots[&record.id()].path,
                });
            }
        }
    }

    // Surviving records in new order, paired with their old flat position.
    let mut survivors: Vec<(&Slot<'_, T>, &Slot<'_, T>)> = Vec::new();
    for section in new {
        for record in section.objects() {
            let new_slot = &new_slots[&record.id()];
            match old_slots.get(&record.id()) {
                Some(old_slot) => survivors.push((old_slot, new_slot)),
                None => batch.rows.push(RowChange::Insert { at: new_slot.path }),
            }
        }
    }

    // Records that changed section always move; the rest keep their place
    // when they belong to the longest run of increasing old positions.
    let same_section: Vec<usize> = survivors
        .iter()
        .enumerate()
        .filter(|(_, (old_slot, new_slot))| old_slot.section == new_slot.section)
        .map(|(index, _)| index)
        .collect();
    let old_positions: Vec<usize> = same_section
        .iter()
        .map(|&index| survivors[index].0.flat)
        .collect();
    let stable: HashSet<usize> = longest_increasing_run(&old_positions)
        .into_iter()
        .map(|run_index| same_section[run_index])
        .collect();

    for (index, (old_slot, new_slot)) in survivors.iter().enumerate() {
        if !stable.contains(&index) {
            batch.rows.push(RowChange::Move {
                from: old_slot.path,
                to: new_slot.path,
            });
        } else if old_slot.record != new_slot.record {
            batch.rows.push(RowChange::Update { at: old_slot.path });
        }
    }

    batch
}

/// Indices (into `values`) of one longest strictly increasing subsequence.
fn longest_increasing_run(values: &[usize]) -> Vec<usize> {
    // tails[k]: index of the smallest tail of an increasing run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];

    for (index, value) in values.iter().enumerate() {
        let position = tails.partition_point(|&tail| values[tail] < *value);
        if position > 0 {
            previous[index] = Some(tails[position - 1]);
        }
        if position == tails.len() {
            tails.push(index);
        } else {
            tails[position] = index;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        run.push(index);
        cursor = previous[index];
    }
    run.reverse();
    run
}

#[cfg(test)]
mod tests {
    use super::{diff_sections, longest_increasing_run, IndexPath, RowChange, SectionChange};
    use crate::model::notebook::Notebook;
    use crate::query::results::ResultsSection;

    fn single(records: &[&Notebook]) -> Vec<ResultsSection<Notebook>> {
        vec![ResultsSection::new(
            String::new(),
            records.iter().map(|record| (*record).clone()).collect(),
        )]
    }

    #[test]
    fn longest_run_skips_displaced_values() {
        assert_eq!(longest_increasing_run(&[0, 3, 1, 2]), vec![0, 2, 3]);
        assert!(longest_increasing_run(&[]).is_empty());
    }

    #[test]
    fn identical_snapshots_produce_empty_batch() {
        let a = Notebook::new("a", 1);
        let b = Notebook::new("b", 2);
        let batch = diff_sections(&single(&[&a, &b]), &single(&[&a, &b]));
        assert!(batch.is_empty());
    }

    #[test]
    fn insert_and_delete_use_new_and_old_paths() {
        let a = Notebook::new("a", 1);
        let b = Notebook::new("b", 2);
        let c = Notebook::new("c", 3);
        let batch = diff_sections(&single(&[&a, &b]), &single(&[&b, &c]));
        assert_eq!(
            batch.rows,
            vec![
                RowChange::Delete {
                    at: IndexPath::new(0, 0)
                },
                RowChange::Insert {
                    at: IndexPath::new(0, 1)
                },
            ]
        );
    }

    #[test]
    fn reorder_reports_single_move() {
        let a = Notebook::new("a", 1);
        let b = Notebook::new("b", 2);
        let c = Notebook::new("c", 3);
        let batch = diff_sections(&single(&[&a, &b, &c]), &single(&[&c, &a, &b]));
        assert_eq!(
            batch.rows,
            vec![RowChange::Move {
                from: IndexPath::new(0, 2),
                to: IndexPath::new(0, 0),
            }]
        );
    }

    #[test]
    fn changed_record_in_place_is_an_update() {
        let a = Notebook::new("a", 1);
        let mut renamed = a.clone();
        renamed.title = "renamed".to_string();
        let batch = diff_sections(&single(&[&a]), &single(&[&renamed]));
        assert_eq!(
            batch.rows,
            vec![RowChange::Update {
                at: IndexPath::new(0, 0)
            }]
        );
    }

    #[test]
    fn section_changes_are_reported_by_name() {
        let a = Notebook::new("a", 1);
        let b = Notebook::new("b", 2);
        let old = vec![
            ResultsSection::new("x".to_string(), vec![a.clone()]),
            ResultsSection::new("y".to_string(), vec![b.clone()]),
        ];
        let new = vec![
            ResultsSection::new("y".to_string(), vec![b]),
            ResultsSection::new("z".to_string(), vec![a]),
        ];
        let batch = diff_sections(&old, &new);
        assert_eq!(
            batch.sections,
            vec![
                SectionChange::Delete {
                    index: 0,
                    name: "x".to_string()
                },
                SectionChange::Insert {
                    index: 1,
                    name: "z".to_string()
                },
            ]
        );
        assert_eq!(
            batch.rows,
            vec![RowChange::Move {
                from: IndexPath::new(0, 0),
                to: IndexPath::new(1, 0),
            }]
        );
    }
}
