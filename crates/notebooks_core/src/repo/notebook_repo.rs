//! Notebook rows.

use crate::model::notebook::Notebook;
use crate::model::NotebookId;
use crate::query::{Field, FieldValue, Queryable};
use crate::repo::{parse_uuid, SqlRecord, StoreResult};
use rusqlite::{params, Connection, Row};

impl Queryable for Notebook {
    fn column(field: Field) -> Option<&'static str> {
        match field {
            Field::Title => Some("title"),
            Field::CreatedAt => Some("created_at"),
            Field::Notebook => Some("id"),
            Field::Comment | Field::Note => None,
        }
    }

    fn field_value(&self, field: Field) -> Option<FieldValue<'_>> {
        match field {
            Field::Title => Some(FieldValue::Text(&self.title)),
            Field::CreatedAt => Some(FieldValue::Timestamp(self.created_at)),
            Field::Notebook => Some(FieldValue::Reference(Some(self.id.as_uuid()))),
            Field::Comment | Field::Note => None,
        }
    }
}

impl SqlRecord for Notebook {
    const TABLE: &'static str = "notebooks";
    const COLUMNS: &'static str = "id, title, created_at";

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let id_text: String = row.get("id")?;
        Ok(Self {
            id: NotebookId::from_uuid(parse_uuid(&id_text, "notebooks.id")?),
            title: row.get("title")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub(crate) fn insert_notebook(conn: &Connection, notebook: &Notebook) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO notebooks (id, title, created_at) VALUES (?1, ?2, ?3);",
        params![
            notebook.id.to_string(),
            notebook.title.as_str(),
            notebook.created_at
        ],
    )?;
    Ok(())
}

/// Returns `false` when no row with the notebook's id exists.
pub(crate) fn update_notebook(conn: &Connection, notebook: &Notebook) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE notebooks SET title = ?2, created_at = ?3 WHERE id = ?1;",
        params![
            notebook.id.to_string(),
            notebook.title.as_str(),
            notebook.created_at
        ],
    )?;
    Ok(changed > 0)
}

/// Deletes one notebook; notes and photographs follow through `ON DELETE CASCADE`.
pub(crate) fn delete_notebook(conn: &Connection, id: NotebookId) -> StoreResult<()> {
    conn.execute("DELETE FROM notebooks WHERE id = ?1;", [id.to_string()])?;
    Ok(())
}

pub(crate) fn notebook_exists(conn: &Connection, id: NotebookId) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM notebooks WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
