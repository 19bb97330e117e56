//! Sample records for first launch, demos and tests.

use crate::context::Context;
use crate::format::now_epoch_ms;
use crate::model::note::Note;
use crate::model::notebook::Notebook;
use crate::model::photograph::{PhotoOwner, Photograph};
use crate::model::NotebookId;
use crate::repo::StoreResult;
use crate::store::{BackgroundTask, DataController};
use log::info;

pub const SAMPLE_NOTEBOOK_TITLES: [&str; 3] = ["notebook1", "notebook2", "notebook3"];
pub const NOTEBOOK_WITH_NOTES_TITLE: &str = "notebook with notes";
pub const SAMPLE_NOTE_TITLES: [&str; 3] = ["note 1", "note 2", "note 3"];
pub const PHOTO_NOTE_TITLE: &str = "note title";

/// Records created by [`seed_notebook_with_notes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededNotebook {
    pub notebook: Notebook,
    pub notes: Vec<Note>,
    pub cover: Option<Photograph>,
}

/// Stages `notebook1`..`notebook3` in `ctx` without saving.
pub fn stage_sample_notebooks(ctx: &mut Context) -> StoreResult<Vec<Notebook>> {
    let created_at = now_epoch_ms();
    SAMPLE_NOTEBOOK_TITLES
        .iter()
        .map(|title| Notebook::create(ctx, *title, created_at))
        .collect()
}

/// Creates one notebook with three notes and an optional cover, then saves.
pub fn seed_notebook_with_notes(
    ctx: &mut Context,
    cover_image: Option<Vec<u8>>,
) -> StoreResult<SeededNotebook> {
    let created_at = now_epoch_ms();
    let notebook = Notebook::create(ctx, NOTEBOOK_WITH_NOTES_TITLE, created_at)?;
    let notes = SAMPLE_NOTE_TITLES
        .iter()
        .map(|title| Note::create(ctx, notebook.id, *title, created_at))
        .collect::<StoreResult<Vec<_>>>()?;

    let cover = match cover_image {
        Some(image_data) => {
            let mut photograph = Photograph::create(ctx, image_data, created_at)?;
            ctx.set_notebook_photo(notebook.id, photograph.id)?;
            photograph.owner = Some(PhotoOwner::Notebook(notebook.id));
            Some(photograph)
        }
        None => None,
    };

    ctx.save()?;
    info!(
        "event=sample_seed module=service status=ok context={} notes={} cover={}",
        ctx.name(),
        notes.len(),
        cover.is_some()
    );
    Ok(SeededNotebook {
        notebook,
        notes,
        cover,
    })
}

/// Runs [`seed_notebook_with_notes`] on the background writer.
pub fn seed_notebook_with_notes_in_background(
    controller: &DataController,
    cover_image: Option<Vec<u8>>,
) -> StoreResult<BackgroundTask<StoreResult<SeededNotebook>>> {
    controller.perform_in_background(move |ctx| seed_notebook_with_notes(ctx, cover_image))
}

/// Adds a note carrying one photograph to an existing notebook on the
/// background writer.
pub fn add_note_with_photo(
    controller: &DataController,
    notebook_id: NotebookId,
    image_data: Vec<u8>,
) -> StoreResult<BackgroundTask<StoreResult<Note>>> {
    controller.perform_in_background(move |ctx| {
        let created_at = now_epoch_ms();
        let photograph = Photograph::create(ctx, image_data, created_at)?;
        let note = Note::create(ctx, notebook_id, PHOTO_NOTE_TITLE, created_at)?;
        ctx.add_note_photo(note.id, photograph.id)?;
        ctx.save()?;
        Ok(note)
    })
}
