//! Photograph rows.
//!
//! List loads select `length(image_data)` instead of the blob so fetched
//! photographs stay faults until explicitly materialized.

use crate::model::photograph::{PhotoOwner, Photograph, PhotographFault};
use crate::model::{NoteId, NotebookId, PhotographId};
use crate::query::{Field, FieldValue, Queryable};
use crate::repo::{parse_optional_uuid, parse_uuid, SqlRecord, StoreError, StoreResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

impl Queryable for PhotographFault {
    fn column(field: Field) -> Option<&'static str> {
        match field {
            Field::CreatedAt => Some("created_at"),
            Field::Notebook => Some("notebook_id"),
            Field::Note => Some("note_id"),
            Field::Title | Field::Comment => None,
        }
    }

    fn field_value(&self, field: Field) -> Option<FieldValue<'_>> {
        match field {
            Field::CreatedAt => Some(FieldValue::Timestamp(self.created_at)),
            Field::Notebook => Some(FieldValue::Reference(match self.owner {
                Some(PhotoOwner::Notebook(id)) => Some(id.as_uuid()),
                _ => None,
            })),
            Field::Note => Some(FieldValue::Reference(match self.owner {
                Some(PhotoOwner::Note(id)) => Some(id.as_uuid()),
                _ => None,
            })),
            Field::Title | Field::Comment => None,
        }
    }
}

impl SqlRecord for PhotographFault {
    const TABLE: &'static str = "photographs";
    const COLUMNS: &'static str =
        "id, created_at, notebook_id, note_id, length(image_data) AS byte_len";

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let id_text: String = row.get("id")?;
        let byte_len: i64 = row.get("byte_len")?;
        Ok(Self {
            id: PhotographId::from_uuid(parse_uuid(&id_text, "photographs.id")?),
            created_at: row.get("created_at")?,
            owner: parse_owner(row)?,
            byte_len: usize::try_from(byte_len).map_err(|_| {
                StoreError::InvalidData(format!("negative image length {byte_len}"))
            })?,
        })
    }
}

fn parse_owner(row: &Row<'_>) -> StoreResult<Option<PhotoOwner>> {
    let notebook = parse_optional_uuid(row.get("notebook_id")?, "photographs.notebook_id")?;
    let note = parse_optional_uuid(row.get("note_id")?, "photographs.note_id")?;
    match (notebook, note) {
        (Some(id), None) => Ok(Some(PhotoOwner::Notebook(NotebookId::from_uuid(id)))),
        (None, Some(id)) => Ok(Some(PhotoOwner::Note(NoteId::from_uuid(id)))),
        (None, None) => Ok(None),
        (Some(_), Some(_)) => Err(StoreError::InvalidData(
            "photograph owned by both a notebook and a note".to_string(),
        )),
    }
}

fn owner_columns(owner: Option<PhotoOwner>) -> (Option<String>, Option<String>) {
    match owner {
        Some(PhotoOwner::Notebook(id)) => (Some(id.to_string()), None),
        Some(PhotoOwner::Note(id)) => (None, Some(id.to_string())),
        None => (None, None),
    }
}

pub(crate) fn insert_photograph(conn: &Connection, photograph: &Photograph) -> StoreResult<()> {
    let (notebook_id, note_id) = owner_columns(photograph.owner);
    conn.execute(
        "INSERT INTO photographs (id, image_data, created_at, notebook_id, note_id)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            photograph.id.to_string(),
            photograph.image_data.as_slice(),
            photograph.created_at,
            notebook_id,
            note_id,
        ],
    )?;
    Ok(())
}

/// Returns `false` when no row with the photograph's id exists.
pub(crate) fn update_photograph(conn: &Connection, photograph: &Photograph) -> StoreResult<bool> {
    let (notebook_id, note_id) = owner_columns(photograph.owner);
    let changed = conn.execute(
        "UPDATE photographs
         SET
            image_data = ?2,
            created_at = ?3,
            notebook_id = ?4,
            note_id = ?5
         WHERE id = ?1;",
        params![
            photograph.id.to_string(),
            photograph.image_data.as_slice(),
            photograph.created_at,
            notebook_id,
            note_id,
        ],
    )?;
    Ok(changed > 0)
}

/// Clears both owner columns so owners can be reassigned without tripping
/// the single-cover unique index mid-save.
pub(crate) fn detach_photograph(conn: &Connection, id: PhotographId) -> StoreResult<()> {
    conn.execute(
        "UPDATE photographs SET notebook_id = NULL, note_id = NULL WHERE id = ?1;",
        [id.to_string()],
    )?;
    Ok(())
}

pub(crate) fn delete_photograph(conn: &Connection, id: PhotographId) -> StoreResult<()> {
    conn.execute("DELETE FROM photographs WHERE id = ?1;", [id.to_string()])?;
    Ok(())
}

/// Materializes full photographs (image bytes included) for `ids`.
///
/// Missing ids are skipped; output follows insertion order.
pub(crate) fn load_photographs(
    conn: &Connection,
    ids: &[PhotographId],
) -> StoreResult<Vec<Photograph>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT id, image_data, created_at, notebook_id, note_id
         FROM photographs
         WHERE id IN ({placeholders})
         ORDER BY rowid ASC;"
    );
    let binds: Vec<Value> = ids.iter().map(|id| Value::Text(id.to_string())).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut photographs = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        photographs.push(Photograph {
            id: PhotographId::from_uuid(parse_uuid(&id_text, "photographs.id")?),
            image_data: row.get("image_data")?,
            created_at: row.get("created_at")?,
            owner: parse_owner(row)?,
        });
    }
    Ok(photographs)
}
