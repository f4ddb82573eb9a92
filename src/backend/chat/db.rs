/**
 * Database Operations for Rooms and Messages
 *
 * Durable storage for chat rooms, membership, messages and read receipts.
 * Timestamps are stored as microseconds since the epoch so that a room's
 * `updated_at` can be bumped by exactly one tick when two messages land in
 * the same microsecond.
 *
 * None of these functions use the pool while a transaction on it is open.
 */

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::backend::error::{BackendError, BackendResult};
use crate::shared::messaging::{normalize_members, ChatMessage, ChatRoom, MessageKind, NewMessage};

pub(crate) fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

fn now_micros() -> i64 {
    to_micros(Utc::now())
}

/// Create an ad-hoc (or project-backed) room.
///
/// The name must be non-blank. Members are deduplicated and always include
/// the creator.
pub async fn create_room(
    pool: &SqlitePool,
    name: &str,
    member_ids: &[Uuid],
    creator_id: Uuid,
    project_id: Option<Uuid>,
) -> BackendResult<ChatRoom> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BackendError::validation("Room name is required"));
    }

    let id = Uuid::new_v4();
    let now = now_micros();
    let members = normalize_members(creator_id, member_ids);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO chat_rooms (id, name, project_id, is_project_room, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(project_id)
    .bind(project_id.is_some())
    .bind(creator_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for member_id in &members {
        sqlx::query("INSERT OR IGNORE INTO room_members (room_id, user_id, added_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(member_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("[Chat] Created room {} '{}' with {} members", id, name, members.len());

    Ok(ChatRoom {
        id,
        name: name.to_string(),
        project_id,
        is_project_room: project_id.is_some(),
        member_ids: members,
        created_by: creator_id,
        created_at: from_micros(now),
        updated_at: from_micros(now),
    })
}

/// Return the project's room, creating it with only the owner as member.
///
/// The insert is conditional on the unique project reference, so concurrent
/// callers for the same project always end up with the same room.
pub async fn get_or_create_project_room(
    pool: &SqlitePool,
    project_id: Uuid,
    owner_id: Uuid,
    project_name: &str,
) -> BackendResult<ChatRoom> {
    let id = Uuid::new_v4();
    let now = now_micros();
    let name = match project_name.trim() {
        "" => "Project chat",
        trimmed => trimmed,
    };

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO chat_rooms (id, name, project_id, is_project_room, created_by, created_at, updated_at)
        VALUES (?, ?, ?, 1, ?, ?, ?)
        ON CONFLICT (project_id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(project_id)
    .bind(owner_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 1 {
        sqlx::query("INSERT OR IGNORE INTO room_members (room_id, user_id, added_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(owner_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    if inserted == 1 {
        tracing::info!("[Chat] Created project room {} for project {}", id, project_id);
    }

    get_room_by_project(pool, project_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Project room not found"))
}

fn room_from_row(row: &SqliteRow, member_ids: Vec<Uuid>) -> BackendResult<ChatRoom> {
    Ok(ChatRoom {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        project_id: row.try_get("project_id")?,
        is_project_room: row.try_get("is_project_room")?,
        member_ids,
        created_by: row.try_get("created_by")?,
        created_at: from_micros(row.try_get("created_at")?),
        updated_at: from_micros(row.try_get("updated_at")?),
    })
}

/// Member IDs of a room in the order they joined
pub async fn room_members(pool: &SqlitePool, room_id: Uuid) -> BackendResult<Vec<Uuid>> {
    let rows = sqlx::query("SELECT user_id FROM room_members WHERE room_id = ? ORDER BY added_at, rowid")
        .bind(room_id)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<Uuid, _>("user_id").map_err(BackendError::from))
        .collect()
}

/// Look up a room with its members
pub async fn get_room(pool: &SqlitePool, room_id: Uuid) -> BackendResult<Option<ChatRoom>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, project_id, is_project_room, created_by, created_at, updated_at
        FROM chat_rooms
        WHERE id = ?
        "#,
    )
    .bind(room_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let members = room_members(pool, room_id).await?;
            Ok(Some(room_from_row(&row, members)?))
        }
        None => Ok(None),
    }
}

/// Look up the room backing a project
pub async fn get_room_by_project(pool: &SqlitePool, project_id: Uuid) -> BackendResult<Option<ChatRoom>> {
    let room_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM chat_rooms WHERE project_id = ?")
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

    match room_id {
        Some(room_id) => get_room(pool, room_id).await,
        None => Ok(None),
    }
}

/// Rooms the user belongs to, most recently active first
pub async fn rooms_for_user(pool: &SqlitePool, user_id: Uuid) -> BackendResult<Vec<ChatRoom>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.name, r.project_id, r.is_project_room, r.created_by, r.created_at, r.updated_at
        FROM chat_rooms r
        JOIN room_members rm ON rm.room_id = r.id
        WHERE rm.user_id = ?
        ORDER BY r.updated_at DESC, r.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut rooms = Vec::with_capacity(rows.len());
    for row in &rows {
        let room_id: Uuid = row.try_get("id")?;
        let members = room_members(pool, room_id).await?;
        rooms.push(room_from_row(row, members)?);
    }
    Ok(rooms)
}

async fn room_exists(pool: &SqlitePool, room_id: Uuid) -> BackendResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM chat_rooms WHERE id = ?)")
        .bind(room_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Persist a message.
///
/// The room's `updated_at` is bumped first (to at least one tick past its
/// previous value) and the message takes the new value as its creation time.
/// The bump only applies when the sender is a member, so a missing row means
/// either an unknown room or a non-member sender.
pub async fn append_message(
    pool: &SqlitePool,
    room_id: Uuid,
    sender_id: Uuid,
    content: &NewMessage,
) -> BackendResult<ChatMessage> {
    let mut tx = pool.begin().await?;

    let bumped: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE chat_rooms
        SET updated_at = MAX(updated_at + 1, ?)
        WHERE id = ?
          AND EXISTS (SELECT 1 FROM room_members WHERE room_id = chat_rooms.id AND user_id = ?)
        RETURNING updated_at
        "#,
    )
    .bind(now_micros())
    .bind(room_id)
    .bind(sender_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(created_at) = bumped else {
        tx.rollback().await?;
        return if room_exists(pool, room_id).await? {
            Err(BackendError::forbidden("Not a member of this room"))
        } else {
            Err(BackendError::not_found("Room not found"))
        };
    };

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO messages (id, room_id, sender_id, kind, text, media_url, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(room_id)
    .bind(sender_id)
    .bind(content.kind().as_str())
    .bind(content.text_content())
    .bind(content.media_url())
    .bind(created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("[Chat] Stored message {} in room {}", id, room_id);

    Ok(ChatMessage {
        id,
        room_id,
        sender_id,
        kind: content.kind(),
        text: content.text_content().map(str::to_string),
        media_url: content.media_url().map(str::to_string),
        seen_by: Vec::new(),
        created_at: from_micros(created_at),
    })
}

/// Mark every message in the room written by someone else, created at or
/// before `up_to`, as seen by `user_id`. Returns how many receipts were added.
pub async fn mark_seen(
    pool: &SqlitePool,
    room_id: Uuid,
    user_id: Uuid,
    up_to: DateTime<Utc>,
) -> BackendResult<u64> {
    let added = sqlx::query(
        r#"
        INSERT OR IGNORE INTO message_seen (message_id, user_id)
        SELECT id, ? FROM messages
        WHERE room_id = ? AND sender_id != ? AND created_at <= ?
        "#,
    )
    .bind(user_id)
    .bind(room_id)
    .bind(user_id)
    .bind(to_micros(up_to))
    .execute(pool)
    .await?
    .rows_affected();

    if added > 0 {
        tracing::debug!("[Chat] {} messages in room {} marked seen by {}", added, room_id, user_id);
    }
    Ok(added)
}

fn message_from_row(row: &SqliteRow, seen_by: Vec<Uuid>) -> BackendResult<ChatMessage> {
    let kind: String = row.try_get("kind")?;
    Ok(ChatMessage {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        sender_id: row.try_get("sender_id")?,
        kind: kind.parse::<MessageKind>()?,
        text: row.try_get("text")?,
        media_url: row.try_get("media_url")?,
        seen_by,
        created_at: from_micros(row.try_get("created_at")?),
    })
}

async fn seen_by_for(pool: &SqlitePool, message_ids: &[Uuid]) -> BackendResult<HashMap<Uuid, Vec<Uuid>>> {
    let mut seen: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    if message_ids.is_empty() {
        return Ok(seen);
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT message_id, user_id FROM message_seen WHERE message_id IN (");
    let mut separated = query.separated(", ");
    for id in message_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY rowid");

    for row in query.build().fetch_all(pool).await? {
        let message_id: Uuid = row.try_get("message_id")?;
        let user_id: Uuid = row.try_get("user_id")?;
        seen.entry(message_id).or_default().push(user_id);
    }
    Ok(seen)
}

/// The `limit` most recent messages of a room, newest first
pub async fn recent_messages(pool: &SqlitePool, room_id: Uuid, limit: u32) -> BackendResult<Vec<ChatMessage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, room_id, sender_id, kind, text, media_url, created_at
        FROM messages
        WHERE room_id = ?
        ORDER BY created_at DESC, seq DESC
        LIMIT ?
        "#,
    )
    .bind(room_id)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    let ids = rows
        .iter()
        .map(|row| row.try_get::<Uuid, _>("id"))
        .collect::<Result<Vec<_>, _>>()?;
    let mut seen = seen_by_for(pool, &ids).await?;

    rows.iter()
        .zip(ids)
        .map(|(row, id)| message_from_row(row, seen.remove(&id).unwrap_or_default()))
        .collect()
}

/// Latest message of a room, if any
pub async fn last_message(pool: &SqlitePool, room_id: Uuid) -> BackendResult<Option<ChatMessage>> {
    Ok(recent_messages(pool, room_id, 1).await?.into_iter().next())
}

/// Messages by others in the room that `user_id` has not seen
pub async fn unread_count(pool: &SqlitePool, room_id: Uuid, user_id: Uuid) -> BackendResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM messages m
        WHERE m.room_id = ? AND m.sender_id != ?
          AND NOT EXISTS (
              SELECT 1 FROM message_seen s WHERE s.message_id = m.id AND s.user_id = ?
          )
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Add a member. Returns `false` when already a member.
pub async fn add_member(pool: &SqlitePool, room_id: Uuid, user_id: Uuid) -> BackendResult<bool> {
    if !room_exists(pool, room_id).await? {
        return Err(BackendError::not_found("Room not found"));
    }

    let added = sqlx::query("INSERT OR IGNORE INTO room_members (room_id, user_id, added_at) VALUES (?, ?, ?)")
        .bind(room_id)
        .bind(user_id)
        .bind(now_micros())
        .execute(pool)
        .await?
        .rows_affected();

    Ok(added == 1)
}

/// Remove a member. Returns `false` when not a member.
pub async fn remove_member(pool: &SqlitePool, room_id: Uuid, user_id: Uuid) -> BackendResult<bool> {
    let removed = sqlx::query("DELETE FROM room_members WHERE room_id = ? AND user_id = ?")
        .bind(room_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(removed == 1)
}

/// Keep a project room's name in sync with its project
pub async fn rename_project_room(pool: &SqlitePool, project_id: Uuid, name: &str) -> BackendResult<bool> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BackendError::validation("Room name is required"));
    }

    let updated = sqlx::query("UPDATE chat_rooms SET name = ? WHERE project_id = ?")
        .bind(name)
        .bind(project_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(updated == 1)
}
