//! Notebook and note listing use-cases.
//!
//! # Invariants
//! - The notebook list is ordered by title, ascending.
//! - A note list is scoped to one notebook and ordered by creation time.
//! - Note search matches titles case-insensitively inside one notebook and
//!   orders hits by title; blank search text falls back to the note list.

use crate::context::Context;
use crate::model::note::Note;
use crate::model::notebook::Notebook;
use crate::model::photograph::PhotographFault;
use crate::model::NotebookId;
use crate::query::{FetchRequest, Predicate, SortKey};
use crate::repo::StoreResult;

pub fn notebooks_request() -> FetchRequest<Notebook> {
    FetchRequest::new().sort_by(SortKey::Title, true)
}

pub fn notes_request(notebook_id: NotebookId) -> FetchRequest<Note> {
    FetchRequest::new()
        .filter(Predicate::InNotebook(notebook_id))
        .sort_by(SortKey::CreatedAt, true)
}

pub fn note_search_request(notebook_id: NotebookId, text: &str) -> FetchRequest<Note> {
    let text = text.trim();
    if text.is_empty() {
        return notes_request(notebook_id);
    }
    FetchRequest::new()
        .filter(Predicate::InNotebook(notebook_id))
        .filter(Predicate::TitleContains(text.to_string()))
        .sort_by(SortKey::Title, true)
}

/// One row of the notebook list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookSummary {
    pub notebook: Notebook,
    pub note_count: usize,
    pub cover: Option<PhotographFault>,
}

/// Lists notebooks with note counts, as seen by `ctx`.
pub fn notebook_summaries(ctx: &Context) -> StoreResult<Vec<NotebookSummary>> {
    let notebooks = ctx.fetch(&notebooks_request())?;
    let mut summaries = Vec::with_capacity(notebooks.len());
    for notebook in notebooks {
        let note_count = ctx.count(&notes_request(notebook.id))?;
        let cover = ctx.notebook_photo(notebook.id)?;
        summaries.push(NotebookSummary {
            notebook,
            note_count,
            cover,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::{note_search_request, notes_request};
    use crate::model::NotebookId;
    use crate::query::{Predicate, SortKey};

    #[test]
    fn blank_search_falls_back_to_note_list() {
        let notebook_id = NotebookId::new();
        let request = note_search_request(notebook_id, "   ");
        assert_eq!(
            request.predicate(),
            notes_request(notebook_id).predicate()
        );
        assert_eq!(request.sort_descriptors()[0].key, SortKey::CreatedAt);
    }

    #[test]
    fn search_is_scoped_and_sorted_by_title() {
        let notebook_id = NotebookId::new();
        let request = note_search_request(notebook_id, " Milk ");
        assert_eq!(
            request.predicate(),
            Some(&Predicate::And(vec![
                Predicate::InNotebook(notebook_id),
                Predicate::TitleContains("Milk".to_string()),
            ]))
        );
        assert_eq!(request.sort_descriptors()[0].key, SortKey::Title);
    }
}
