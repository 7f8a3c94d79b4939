//! Messages and notifications share one table, told apart by `kind`.
//!
//! An item with no recipient belongs to the barangay office inbox, which every staff member and
//! admin reads.

use chrono::Utc;
use diesel::dsl::count_star;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use uuid::Uuid;

use crate::models::{InboxItem, NewInboxItem};
use crate::schema::inbox_items;

pub const KIND_MESSAGE: &str = "message";
pub const KIND_NOTIFICATION: &str = "notification";

/// Who is asking: decides whether office-addressed items are visible.
#[derive(Debug, Clone, Copy)]
pub struct Reader {
    pub user_id: Uuid,
    pub office: bool,
}

pub struct Delivery<'a> {
    pub kind: &'static str,
    pub sender_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub subject: &'a str,
    pub body: &'a str,
    pub link: Option<&'a str>,
}

impl<'a> Delivery<'a> {
    pub fn notification(recipient_id: Uuid, subject: &'a str, body: &'a str) -> Self {
        Self {
            kind: KIND_NOTIFICATION,
            sender_id: None,
            recipient_id: Some(recipient_id),
            subject,
            body,
            link: None,
        }
    }

    pub fn message(
        sender_id: Option<Uuid>,
        recipient_id: Option<Uuid>,
        subject: &'a str,
        body: &'a str,
    ) -> Self {
        Self {
            kind: KIND_MESSAGE,
            sender_id,
            recipient_id,
            subject,
            body,
            link: None,
        }
    }

    pub fn with_link(mut self, link: Option<&'a str>) -> Self {
        self.link = link;
        self
    }
}

pub fn deliver(conn: &mut PgConnection, delivery: Delivery<'_>) -> QueryResult<InboxItem> {
    let item = NewInboxItem {
        id: Uuid::new_v4(),
        kind: delivery.kind.to_string(),
        sender_id: delivery.sender_id,
        recipient_id: delivery.recipient_id,
        subject: delivery.subject.to_string(),
        body: delivery.body.to_string(),
        link: delivery.link.map(str::to_string),
    };

    diesel::insert_into(inbox_items::table)
        .values(&item)
        .get_result(conn)
}

fn visible_to(kind: &'static str, reader: Reader) -> inbox_items::BoxedQuery<'static, Pg> {
    let query = inbox_items::table
        .filter(inbox_items::kind.eq(kind))
        .into_boxed();
    if reader.office {
        query.filter(
            inbox_items::recipient_id
                .eq(reader.user_id)
                .or(inbox_items::recipient_id.is_null()),
        )
    } else {
        query.filter(inbox_items::recipient_id.eq(reader.user_id))
    }
}

pub fn list_inbox(
    conn: &mut PgConnection,
    kind: &'static str,
    reader: Reader,
    unread_only: bool,
    limit: i64,
) -> QueryResult<Vec<InboxItem>> {
    let mut query = visible_to(kind, reader);
    if unread_only {
        query = query.filter(inbox_items::read.eq(false));
    }
    query
        .order(inbox_items::created_at.desc())
        .limit(limit)
        .load(conn)
}

pub fn list_sent(
    conn: &mut PgConnection,
    sender_id: Uuid,
    limit: i64,
) -> QueryResult<Vec<InboxItem>> {
    inbox_items::table
        .filter(inbox_items::kind.eq(KIND_MESSAGE))
        .filter(inbox_items::sender_id.eq(sender_id))
        .order(inbox_items::created_at.desc())
        .limit(limit)
        .load(conn)
}

pub fn unread_count(
    conn: &mut PgConnection,
    kind: &'static str,
    reader: Reader,
) -> QueryResult<i64> {
    visible_to(kind, reader)
        .filter(inbox_items::read.eq(false))
        .select(count_star())
        .first(conn)
}

/// Returns `false` when no visible item with that id exists.
pub fn mark_read(
    conn: &mut PgConnection,
    kind: &'static str,
    reader: Reader,
    item_id: Uuid,
) -> QueryResult<bool> {
    let item: Option<InboxItem> = visible_to(kind, reader)
        .filter(inbox_items::id.eq(item_id))
        .first(conn)
        .optional()?;

    match item {
        None => Ok(false),
        Some(item) if item.read => Ok(true),
        Some(item) => {
            diesel::update(inbox_items::table.find(item.id))
                .set((
                    inbox_items::read.eq(true),
                    inbox_items::read_at.eq(Some(Utc::now().naive_utc())),
                ))
                .execute(conn)?;
            Ok(true)
        }
    }
}

pub fn mark_all_read(
    conn: &mut PgConnection,
    kind: &'static str,
    reader: Reader,
) -> QueryResult<usize> {
    let ids: Vec<Uuid> = visible_to(kind, reader)
        .filter(inbox_items::read.eq(false))
        .select(inbox_items::id)
        .load(conn)?;

    if ids.is_empty() {
        return Ok(0);
    }

    diesel::update(inbox_items::table.filter(inbox_items::id.eq_any(&ids)))
        .set((
            inbox_items::read.eq(true),
            inbox_items::read_at.eq(Some(Utc::now().naive_utc())),
        ))
        .execute(conn)
}
