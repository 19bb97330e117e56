//! Note rows.

use crate::model::note::Note;
use crate::model::{NoteId, NotebookId};
use crate::query::{Field, FieldValue, Queryable};
use crate::repo::{parse_uuid, SqlRecord, StoreResult};
use rusqlite::{params, Connection, Row};

impl Queryable for Note {
    fn column(field: Field) -> Option<&'static str> {
        match field {
            Field::Title => Some("title"),
            Field::Comment => Some("comment"),
            Field::CreatedAt => Some("created_at"),
            Field::Notebook => Some("notebook_id"),
            Field::Note => Some("id"),
        }
    }

    fn field_value(&self, field: Field) -> Option<FieldValue<'_>> {
        let value = match field {
            Field::Title => FieldValue::Text(&self.title),
            Field::Comment => FieldValue::OptionalText(self.comment.as_deref()),
            Field::CreatedAt => FieldValue::Timestamp(self.created_at),
            Field::Notebook => FieldValue::Reference(Some(self.notebook_id.as_uuid())),
            Field::Note => FieldValue::Reference(Some(self.id.as_uuid())),
        };
        Some(value)
    }
}

impl SqlRecord for Note {
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static str = "id, notebook_id, title, comment, created_at";

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let id_text: String = row.get("id")?;
        let notebook_text: String = row.get("notebook_id")?;
        Ok(Self {
            id: NoteId::from_uuid(parse_uuid(&id_text, "notes.id")?),
            notebook_id: NotebookId::from_uuid(parse_uuid(&notebook_text, "notes.notebook_id")?),
            title: row.get("title")?,
            comment: row.get("comment")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub(crate) fn insert_note(conn: &Connection, note: &Note) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO notes (id, notebook_id, title, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            note.id.to_string(),
            note.notebook_id.to_string(),
            note.title.as_str(),
            note.comment.as_deref(),
            note.created_at,
        ],
    )?;
    Ok(())
}

/// Returns `false` when no row with the note's id exists.
pub(crate) fn update_note(conn: &Connection, note: &Note) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE notes
         SET
            notebook_id = ?2,
            title = ?3,
            comment = ?4,
            created_at = ?5
         WHERE id = ?1;",
        params![
            note.id.to_string(),
            note.notebook_id.to_string(),
            note.title.as_str(),
            note.comment.as_deref(),
            note.created_at,
        ],
    )?;
    Ok(changed > 0)
}

pub(crate) fn delete_note(conn: &Connection, id: NoteId) -> StoreResult<()> {
    conn.execute("DELETE FROM notes WHERE id = ?1;", [id.to_string()])?;
    Ok(())
}

pub(crate) fn note_exists(conn: &Connection, id: NoteId) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
