use notebooks_core::service::sample_data::{
    add_note_with_photo, seed_notebook_with_notes_in_background, stage_sample_notebooks,
    SAMPLE_NOTEBOOK_TITLES,
};
use notebooks_core::{
    DataController, DbError, FetchRequest, Note, Notebook, PhotographFault, Predicate,
    SortKey, StoreConfig, StoreError,
};
use std::sync::mpsc;
use std::time::Duration;
use tempfile::TempDir;

fn load_store() -> (TempDir, DataController) {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new("Notebooks", dir.path()).unwrap();
    let controller = DataController::load(config).unwrap();
    (dir, controller)
}

fn titles(notebooks: &[Notebook]) -> Vec<&str> {
    notebooks.iter().map(|notebook| notebook.title.as_str()).collect()
}

#[test]
fn unsorted_fetch_returns_insertion_order() {
    let (_dir, mut controller) = load_store();
    let ctx = controller.view_context_mut();
    for title in ["zeta", "alpha", "mid", "beta", "omega"] {
        Notebook::create(ctx, title, 0).unwrap();
    }

    let unsaved = controller.fetch(&FetchRequest::<Notebook>::new()).unwrap();
    assert_eq!(titles(&unsaved), vec!["zeta", "alpha", "mid", "beta", "omega"]);

    controller.save().unwrap();
    let saved = controller.fetch(&FetchRequest::<Notebook>::new()).unwrap();
    assert_eq!(titles(&saved), vec!["zeta", "alpha", "mid", "beta", "omega"]);

    let sorted = controller
        .fetch(&FetchRequest::<Notebook>::new().sort_by(SortKey::Title, true))
        .unwrap();
    assert_eq!(titles(&sorted), vec!["alpha", "beta", "mid", "omega", "zeta"]);
}

#[test]
fn sample_notebooks_filter_and_survive_reset() {
    let (_dir, mut controller) = load_store();
    stage_sample_notebooks(controller.view_context_mut()).unwrap();

    let filtered = controller
        .fetch(
            &FetchRequest::<Notebook>::new()
                .filter(Predicate::TitleEquals("notebook1".to_string())),
        )
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].title, "notebook1");

    controller.save().unwrap();
    controller.reset();
    let all = controller.fetch(&FetchRequest::<Notebook>::new()).unwrap();
    assert_eq!(titles(&all), SAMPLE_NOTEBOOK_TITLES.to_vec());
}

#[test]
fn reset_discards_unsaved_records() {
    let (_dir, mut controller) = load_store();
    stage_sample_notebooks(controller.view_context_mut()).unwrap();
    assert!(controller.view_context().has_changes());

    controller.reset();

    assert!(!controller.view_context().has_changes());
    assert!(controller
        .fetch(&FetchRequest::<Notebook>::new())
        .unwrap()
        .is_empty());
}

#[test]
fn delete_store_empties_store_and_keeps_handle_usable() {
    let (_dir, mut controller) = load_store();
    stage_sample_notebooks(controller.view_context_mut()).unwrap();
    controller.save().unwrap();
    let changes = controller.subscribe();

    controller.delete_store().unwrap();

    assert!(controller
        .fetch(&FetchRequest::<Notebook>::new())
        .unwrap()
        .is_empty());
    assert!(changes.try_recv().unwrap().store_reset);

    Notebook::create(controller.view_context_mut(), "after reset", 1).unwrap();
    controller.save().unwrap();
    assert_eq!(
        controller.fetch(&FetchRequest::<Notebook>::new()).unwrap().len(),
        1
    );
}

#[test]
fn delete_store_without_file_reports_not_found() {
    let (_dir, mut controller) = load_store();
    std::fs::remove_file(controller.store_path()).unwrap();

    assert!(matches!(
        controller.delete_store(),
        Err(DbError::StoreNotFound(_))
    ));
}

#[test]
fn background_tasks_run_in_submission_order() {
    let (_dir, controller) = load_store();
    let tasks: Vec<_> = (0..5)
        .map(|index| {
            controller
                .perform_in_background(move |ctx| {
                    Notebook::create(ctx, format!("bg{index}"), index).unwrap();
                    ctx.save().unwrap();
                    index
                })
                .unwrap()
        })
        .collect();

    let results: Vec<i64> = tasks.into_iter().map(|task| task.wait().unwrap()).collect();
    assert_eq!(results, vec![0, 1, 2, 3, 4]);

    let stored = controller.fetch(&FetchRequest::<Notebook>::new()).unwrap();
    assert_eq!(titles(&stored), vec!["bg0", "bg1", "bg2", "bg3", "bg4"]);
}

#[test]
fn panicking_background_task_is_reported_and_writer_survives() {
    let (_dir, controller) = load_store();
    let failed = controller
        .perform_in_background(|_ctx| -> () { panic!("task failure") })
        .unwrap();
    assert!(matches!(failed.wait(), Err(StoreError::TaskAborted)));

    let next = controller.perform_in_background(|_ctx| 7).unwrap();
    assert_eq!(next.wait().unwrap(), 7);
}

#[test]
fn background_seed_becomes_visible_after_commit() {
    let (_dir, mut controller) = load_store();

    let seeded = seed_notebook_with_notes_in_background(&controller, Some(vec![1, 2, 3]))
        .unwrap()
        .wait()
        .unwrap()
        .unwrap();

    let merged = controller.merge_changes();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].origin, "background");
    assert_eq!(merged[0].notebooks.inserted, vec![seeded.notebook.id]);
    assert_eq!(merged[0].notes.inserted.len(), 3);

    let notes = controller
        .fetch(&FetchRequest::<Note>::new().filter(Predicate::InNotebook(seeded.notebook.id)))
        .unwrap();
    assert_eq!(notes.len(), 3);

    let cover = controller
        .view_context()
        .notebook_photo(seeded.notebook.id)
        .unwrap()
        .unwrap();
    assert_eq!(cover.byte_len, 3);
}

#[test]
fn add_note_with_photo_attaches_photo_in_background() {
    let (_dir, mut controller) = load_store();
    let notebook = Notebook::create(controller.view_context_mut(), "trip", 0).unwrap();
    controller.save().unwrap();

    let note = add_note_with_photo(&controller, notebook.id, vec![9; 16])
        .unwrap()
        .wait()
        .unwrap()
        .unwrap();
    controller.merge_changes();

    let photos = controller.view_context().note_photos(note.id).unwrap();
    assert_eq!(photos.len(), 1);
    let materialized = controller
        .view_context_mut()
        .photograph(photos[0].id)
        .unwrap()
        .unwrap();
    assert_eq!(materialized.image_data, vec![9; 16]);
}

#[test]
fn photographs_list_as_faults_and_batch_fire() {
    let (_dir, mut controller) = load_store();
    let ctx = controller.view_context_mut();
    let notebook = Notebook::create(ctx, "album", 0).unwrap();
    let note = Note::create(ctx, notebook.id, "page", 0).unwrap();
    let mut ids = Vec::new();
    for byte in 1..=3u8 {
        let photo = notebooks_core::Photograph::create(ctx, vec![byte; byte as usize], 0).unwrap();
        ctx.add_note_photo(note.id, photo.id).unwrap();
        ids.push(photo.id);
    }
    controller.save().unwrap();
    controller.reset();

    let faults = controller
        .fetch(&FetchRequest::<PhotographFault>::new().filter(Predicate::OfNote(note.id)))
        .unwrap();
    assert_eq!(
        faults.iter().map(|fault| fault.byte_len).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    ids.reverse();
    let photos = controller.view_context_mut().photographs(&ids).unwrap();
    assert_eq!(
        photos.iter().map(|photo| photo.image_data.clone()).collect::<Vec<_>>(),
        vec![vec![3, 3, 3], vec![2, 2], vec![1]]
    );
}

#[test]
fn load_with_invokes_completion_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new("Notebooks", dir.path()).unwrap();
    let (sender, receiver) = mpsc::channel();

    let handle = DataController::load_with(config, move |result| {
        sender.send(result.map(|controller| controller.store_path().to_path_buf())).unwrap();
    })
    .unwrap();

    let path = receiver
        .recv_timeout(Duration::from_secs(10))
        .unwrap()
        .unwrap();
    handle.join().unwrap();
    assert_eq!(path, dir.path().join("Notebooks.sqlite"));
    assert!(receiver.try_recv().is_err());
}
