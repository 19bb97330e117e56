//! Live, sectioned result sets that publish incremental change batches.

use crate::context::{ChangeSet, Context, Fetchable};
use crate::query::diff::{diff_sections, ChangeBatch, IndexPath};
use crate::query::request::FetchRequest;
use crate::repo::StoreResult;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::debug;
use std::collections::HashMap;

/// One named group of fetched records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsSection<T> {
    name: String,
    objects: Vec<T>,
}

impl<T> ResultsSection<T> {
    pub(crate) fn new(name: String, objects: Vec<T>) -> Self {
        Self { name, objects }
    }

    /// Section name; empty for unsectioned requests.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &[T] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Keeps the result of a fetch request current and reports how it changed.
///
/// Without a section key the results form exactly one section named `""`.
/// With a section key, sections appear in order of their first record.
pub struct FetchedResultsController<T> {
    request: FetchRequest<T>,
    sections: Vec<ResultsSection<T>>,
    subscribers: Vec<Sender<ChangeBatch>>,
}

impl<T: Fetchable + PartialEq> FetchedResultsController<T> {
    pub fn new(request: FetchRequest<T>) -> Self {
        Self {
            request,
            sections: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn request(&self) -> &FetchRequest<T> {
        &self.request
    }

    /// Loads the initial result set. Publishes nothing.
    pub fn perform_fetch(&mut self, ctx: &Context) -> StoreResult<()> {
        self.sections = self.load_sections(ctx)?;
        Ok(())
    }

    /// Re-fetches, publishes the resulting batch when it is not empty and
    /// returns it.
    pub fn refresh(&mut self, ctx: &Context) -> StoreResult<ChangeBatch> {
        let sections = self.load_sections(ctx)?;
        let batch = diff_sections(&self.sections, &sections);
        self.sections = sections;

        if !batch.is_empty() {
            debug!(
                "event=results_refresh module=query kind={} section_changes={} row_changes={}",
                T::KIND,
                batch.sections.len(),
                batch.rows.len()
            );
            self.subscribers
                .retain(|subscriber| subscriber.send(batch.clone()).is_ok());
        }
        Ok(batch)
    }

    /// Refreshes only when one of `changes` may affect `T`.
    pub fn apply_merged(
        &mut self,
        ctx: &Context,
        changes: &[ChangeSet],
    ) -> StoreResult<Option<ChangeBatch>> {
        if !changes.iter().any(|change| change.touches(T::KIND)) {
            return Ok(None);
        }
        self.refresh(ctx).map(Some)
    }

    /// Receives every non-empty batch published from now on.
    pub fn subscribe(&mut self) -> Receiver<ChangeBatch> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    pub fn sections(&self) -> &[ResultsSection<T>] {
        &self.sections
    }

    /// All records across sections, in display order.
    pub fn fetched_objects(&self) -> Vec<&T> {
        self.sections
            .iter()
            .flat_map(|section| section.objects.iter())
            .collect()
    }

    pub fn object_at(&self, path: IndexPath) -> Option<&T> {
        self.sections
            .get(path.section)
            .and_then(|section| section.objects.get(path.row))
    }

    pub fn index_path_of(&self, id: T::Id) -> Option<IndexPath> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(section_index, section)| {
                section
                    .objects
                    .iter()
                    .position(|record| record.id() == id)
                    .map(|row| IndexPath::new(section_index, row))
            })
    }

    fn load_sections(&self, ctx: &Context) -> StoreResult<Vec<ResultsSection<T>>> {
        let records = ctx.fetch(&self.request)?;
        let Some(key) = self.request.section_key() else {
            return Ok(vec![ResultsSection::new(String::new(), records)]);
        };

        let mut sections: Vec<ResultsSection<T>> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for record in records {
            let name = key.section_name(&record)?;
            let index = *by_name.entry(name.clone()).or_insert_with(|| {
                sections.push(ResultsSection::new(name, Vec::new()));
                sections.len() - 1
            });
            sections[index].objects.push(record);
        }
        Ok(sections)
    }
}
