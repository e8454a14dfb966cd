//! Module content persistence.
//!
//! # Responsibility
//! - Store items in their per-kind variant tables.
//! - Store `contents` entries that place an item inside a module.
//! - Resolve an entry's `(item_kind, item_id)` pair with an explicit
//!   lookup-by-kind.
//!
//! # Invariants
//! - Contents list by `position ASC, id ASC`.
//! - Deleting an entry also deletes its item once no other entry refers to it.
//!   Course and module deletes apply the same rule to the entries they cascade
//!   over.

use super::order_field::{assign_position, OrderField, Ordered};
use super::{parse_uuid, RepoError, RepoResult};
use crate::model::content::{
    Content, ContentId, ContentItem, ContentKind, ItemBody, ItemId, NewContent,
};
use crate::model::course::ModuleId;
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const CONTENT_SELECT_SQL: &str = "SELECT
    id,
    module_id,
    item_kind,
    item_id,
    position
FROM contents";

/// Content positions are scoped per module.
pub const CONTENT_ORDER: OrderField = OrderField::new("contents", "position", &["module_id"]);

impl Ordered for NewContent {
    const ORDER_FIELD: OrderField = CONTENT_ORDER;

    fn scope_values(&self) -> Vec<Value> {
        vec![Value::Text(self.module_id.to_string())]
    }

    fn position(&self) -> Option<i64> {
        self.position
    }

    fn set_position(&mut self, position: i64) {
        self.position = Some(position);
    }
}

/// Variant table and payload column backing one content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStore {
    pub table: &'static str,
    pub payload_column: &'static str,
}

/// Lookup-by-kind for the variant stores.
pub fn item_store(kind: ContentKind) -> ItemStore {
    match kind {
        ContentKind::Text => ItemStore {
            table: "text_items",
            payload_column: "content",
        },
        ContentKind::File => ItemStore {
            table: "file_items",
            payload_column: "file",
        },
        ContentKind::Image => ItemStore {
            table: "image_items",
            payload_column: "file",
        },
        ContentKind::Video => ItemStore {
            table: "video_items",
            payload_column: "url",
        },
    }
}

/// Repository interface for items and module content entries.
pub trait ContentRepository {
    fn create_item(&self, item: &ContentItem) -> RepoResult<ContentItem>;
    /// Replaces title and payload; the item kind cannot change.
    fn update_item(&self, item: &ContentItem) -> RepoResult<ContentItem>;
    fn get_item(&self, kind: ContentKind, id: ItemId) -> RepoResult<Option<ContentItem>>;

    /// Inserts an entry, assigning the next module-scoped position when unset.
    fn create_content(&self, draft: &mut NewContent) -> RepoResult<Content>;
    /// Inserts an item and appends it to a module in one transaction.
    fn create_item_in_module(
        &self,
        module_id: ModuleId,
        item: &ContentItem,
    ) -> RepoResult<(Content, ContentItem)>;
    fn get_content(&self, id: ContentId) -> RepoResult<Option<Content>>;
    fn find_content_for_item(
        &self,
        module_id: ModuleId,
        kind: ContentKind,
        item_id: ItemId,
    ) -> RepoResult<Option<Content>>;
    fn list_contents(&self, module_id: ModuleId) -> RepoResult<Vec<Content>>;
    /// Deletes an entry and, when unreferenced, its item. Returns the entry.
    fn delete_content(&self, id: ContentId) -> RepoResult<Content>;
    fn set_content_positions(
        &self,
        module_id: ModuleId,
        positions: &[(ContentId, i64)],
    ) -> RepoResult<()>;
    /// Owner of the course a module belongs to.
    fn module_owner(&self, module_id: ModuleId) -> RepoResult<Option<UserId>>;
}

/// SQLite-backed content repository.
pub struct SqliteContentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ContentRepository for SqliteContentRepository<'_> {
    fn create_item(&self, item: &ContentItem) -> RepoResult<ContentItem> {
        insert_item(self.conn, item)?;
        load_required_item(self.conn, item.kind(), item.id)
    }

    fn update_item(&self, item: &ContentItem) -> RepoResult<ContentItem> {
        item.validate()?;
        let store = item_store(item.kind());
        let changed = self.conn.execute(
            &format!(
                "UPDATE {table}
                 SET title = ?2,
                     {payload} = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                table = store.table,
                payload = store.payload_column
            ),
            params![item.id.to_string(), item.title.trim(), item.body.payload()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: store.table,
                id: item.id,
            });
        }
        load_required_item(self.conn, item.kind(), item.id)
    }

    fn get_item(&self, kind: ContentKind, id: ItemId) -> RepoResult<Option<ContentItem>> {
        get_item_in(self.conn, kind, id)
    }

    fn create_content(&self, draft: &mut NewContent) -> RepoResult<Content> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let content = insert_content(&tx, draft)?;
        tx.commit()?;
        Ok(content)
    }

    fn create_item_in_module(
        &self,
        module_id: ModuleId,
        item: &ContentItem,
    ) -> RepoResult<(Content, ContentItem)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_item(&tx, item)?;
        let mut draft = NewContent::for_item(module_id, item);
        let content = insert_content(&tx, &mut draft)?;
        let stored = load_required_item(&tx, item.kind(), item.id)?;
        tx.commit()?;
        Ok((content, stored))
    }

    fn get_content(&self, id: ContentId) -> RepoResult<Option<Content>> {
        self.conn
            .query_row(
                &format!("{CONTENT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_content_columns,
            )
            .optional()?
            .map(into_content)
            .transpose()
    }

    fn find_content_for_item(
        &self,
        module_id: ModuleId,
        kind: ContentKind,
        item_id: ItemId,
    ) -> RepoResult<Option<Content>> {
        self.conn
            .query_row(
                &format!(
                    "{CONTENT_SELECT_SQL}
                     WHERE module_id = ?1
                       AND item_kind = ?2
                       AND item_id = ?3
                     ORDER BY position ASC, id ASC
                     LIMIT 1;"
                ),
                params![
                    module_id.to_string(),
                    kind.model_name(),
                    item_id.to_string()
                ],
                read_content_columns,
            )
            .optional()?
            .map(into_content)
            .transpose()
    }

    fn list_contents(&self, module_id: ModuleId) -> RepoResult<Vec<Content>> {
        list_contents_in(self.conn, module_id)
    }

    fn delete_content(&self, id: ContentId) -> RepoResult<Content> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let content = tx
            .query_row(
                &format!("{CONTENT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_content_columns,
            )
            .optional()?
            .map(into_content)
            .transpose()?
            .ok_or(RepoError::NotFound {
                entity: "content",
                id,
            })?;

        tx.execute("DELETE FROM contents WHERE id = ?1;", [id.to_string()])?;
        delete_unreferenced_items(&tx, &[(content.item_kind, content.item_id)])?;
        tx.commit()?;
        Ok(content)
    }

    fn set_content_positions(
        &self,
        module_id: ModuleId,
        positions: &[(ContentId, i64)],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (content_id, position) in positions {
            let changed = tx.execute(
                "UPDATE contents
                 SET position = ?3
                 WHERE id = ?1
                   AND module_id = ?2;",
                params![content_id.to_string(), module_id.to_string(), position],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "content",
                    id: *content_id,
                });
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn module_owner(&self, module_id: ModuleId) -> RepoResult<Option<UserId>> {
        self.conn
            .query_row(
                "SELECT c.owner_id
                 FROM modules m
                 INNER JOIN courses c ON c.id = m.course_id
                 WHERE m.id = ?1;",
                [module_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|value| parse_uuid(&value, "courses.owner_id"))
            .transpose()
    }
}

/// Items placed in the modules whose `modules.{module_column}` equals `value`.
///
/// Collect these before a cascading delete, then pass them to
/// [`delete_unreferenced_items`].
pub(crate) fn module_item_refs(
    conn: &Connection,
    module_column: &'static str,
    value: Uuid,
) -> RepoResult<Vec<(ContentKind, ItemId)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT ct.item_kind, ct.item_id
         FROM contents ct
         INNER JOIN modules m ON m.id = ct.module_id
         WHERE m.{module_column} = ?1;"
    ))?;
    let rows = stmt.query_map([value.to_string()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut refs = Vec::new();
    for row in rows {
        let (kind, item_id) = row?;
        let kind = ContentKind::from_model_name(&kind).ok_or_else(|| {
            RepoError::InvalidData(format!("unknown item kind `{kind}` in contents.item_kind"))
        })?;
        refs.push((kind, parse_uuid(&item_id, "contents.item_id")?));
    }
    Ok(refs)
}

/// Deletes each referenced item that no `contents` entry points at anymore.
pub(crate) fn delete_unreferenced_items(
    conn: &Connection,
    refs: &[(ContentKind, ItemId)],
) -> RepoResult<usize> {
    let mut deleted = 0;
    for (kind, item_id) in refs {
        let store = item_store(*kind);
        deleted += conn.execute(
            &format!(
                "DELETE FROM {table}
                 WHERE id = ?1
                   AND NOT EXISTS (
                       SELECT 1
                       FROM contents
                       WHERE item_kind = ?2
                         AND item_id = ?1
                   );",
                table = store.table
            ),
            params![item_id.to_string(), kind.model_name()],
        )?;
    }
    Ok(deleted)
}

fn insert_item(conn: &Connection, item: &ContentItem) -> RepoResult<()> {
    item.validate()?;
    let store = item_store(item.kind());
    conn.execute(
        &format!(
            "INSERT INTO {table} (id, owner_id, title, {payload}) VALUES (?1, ?2, ?3, ?4);",
            table = store.table,
            payload = store.payload_column
        ),
        params![
            item.id.to_string(),
            item.owner_id.to_string(),
            item.title.trim(),
            item.body.payload(),
        ],
    )?;
    Ok(())
}

fn insert_content(conn: &Connection, draft: &mut NewContent) -> RepoResult<Content> {
    let module_exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM modules WHERE id = ?1);",
        [draft.module_id.to_string()],
        |row| row.get(0),
    )?;
    if module_exists == 0 {
        return Err(RepoError::NotFound {
            entity: "module",
            id: draft.module_id,
        });
    }
    if get_item_in(conn, draft.item_kind, draft.item_id)?.is_none() {
        return Err(RepoError::NotFound {
            entity: item_store(draft.item_kind).table,
            id: draft.item_id,
        });
    }

    let position = assign_position(conn, draft)?;
    conn.execute(
        "INSERT INTO contents (id, module_id, item_kind, item_id, position)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            draft.id.to_string(),
            draft.module_id.to_string(),
            draft.item_kind.model_name(),
            draft.item_id.to_string(),
            position,
        ],
    )?;

    Ok(Content {
        id: draft.id,
        module_id: draft.module_id,
        item_kind: draft.item_kind,
        item_id: draft.item_id,
        position,
    })
}

fn get_item_in(
    conn: &Connection,
    kind: ContentKind,
    id: ItemId,
) -> RepoResult<Option<ContentItem>> {
    let store = item_store(kind);
    let mut stmt = conn.prepare(&format!(
        "SELECT
            id,
            owner_id,
            title,
            {payload} AS payload,
            created_at,
            updated_at
         FROM {table}
         WHERE id = ?1;",
        table = store.table,
        payload = store.payload_column
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(row, kind)?));
    }
    Ok(None)
}

fn load_required_item(conn: &Connection, kind: ContentKind, id: ItemId) -> RepoResult<ContentItem> {
    get_item_in(conn, kind, id)?.ok_or(RepoError::NotFound {
        entity: item_store(kind).table,
        id,
    })
}

fn list_contents_in(conn: &Connection, module_id: ModuleId) -> RepoResult<Vec<Content>> {
    let mut stmt = conn.prepare(&format!(
        "{CONTENT_SELECT_SQL}
         WHERE module_id = ?1
         ORDER BY position ASC, id ASC;"
    ))?;
    let rows = stmt.query_map([module_id.to_string()], read_content_columns)?;
    let mut contents = Vec::new();
    for row in rows {
        contents.push(into_content(row?)?);
    }
    Ok(contents)
}

fn parse_item_row(row: &Row<'_>, kind: ContentKind) -> RepoResult<ContentItem> {
    let id: String = row.get("id")?;
    let owner_id: String = row.get("owner_id")?;
    Ok(ContentItem {
        id: parse_uuid(&id, "items.id")?,
        owner_id: parse_uuid(&owner_id, "items.owner_id")?,
        title: row.get("title")?,
        body: ItemBody::from_payload(kind, row.get("payload")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

type ContentColumns = (String, String, String, String, i64);

fn read_content_columns(row: &Row<'_>) -> rusqlite::Result<ContentColumns> {
    Ok((
        row.get("id")?,
        row.get("module_id")?,
        row.get("item_kind")?,
        row.get("item_id")?,
        row.get("position")?,
    ))
}

fn into_content(
    (id, module_id, item_kind, item_id, position): ContentColumns,
) -> RepoResult<Content> {
    let item_kind = ContentKind::from_model_name(&item_kind).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid content kind `{item_kind}` in contents.item_kind"
        ))
    })?;
    Ok(Content {
        id: parse_uuid(&id, "contents.id")?,
        module_id: parse_uuid(&module_id, "contents.module_id")?,
        item_kind,
        item_id: parse_uuid(&item_id, "contents.item_id")?,
        position,
    })
}
