use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MessageId, UserId};
use crate::schema::messages;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn between(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default)]
    pub read: bool,
}

impl NewMessage {
    pub fn into_record(self) -> Message {
        Message {
            id: MessageId::generate(),
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            read: self.read,
            created_at: Utc::now(),
        }
    }
}
