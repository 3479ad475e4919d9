use crate::entities::{prelude::*, *};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Upload,
    View,
    Download,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Upload => "upload",
            AccessType::View => "view",
            AccessType::Download => "download",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who touched a file, as far as the request tells us.
#[derive(Debug, Clone, Default)]
pub struct AccessActor {
    pub address: Option<String>,
    pub agent: Option<String>,
}

/// Append-only audit trail of uploads, views and downloads.
pub struct AccessLogService;

impl AccessLogService {
    /// Append an entry. Failures are logged and swallowed: auditing never
    /// blocks the operation being audited.
    pub async fn record(
        db: &impl ConnectionTrait,
        file_id: &str,
        access_type: AccessType,
        actor: &AccessActor,
    ) {
        let entry = file_access_logs::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            file_id: Set(file_id.to_string()),
            actor_address: Set(actor.address.clone()),
            actor_agent: Set(actor.agent.clone()),
            access_type: Set(access_type.as_str().to_string()),
            accessed_at: Set(Utc::now()),
        };

        tracing::info!(
            target: "audit",
            file_id = %file_id,
            access_type = %access_type,
            actor_address = ?actor.address,
            "File access"
        );

        if let Err(e) = entry.insert(db).await {
            tracing::error!("Failed to record {} access for {}: {}", access_type, file_id, e);
        }
    }

    /// Entries for one file, newest first.
    pub async fn list_for_file(
        db: &impl ConnectionTrait,
        file_id: &str,
    ) -> Result<Vec<file_access_logs::Model>, DbErr> {
        FileAccessLogs::find()
            .filter(file_access_logs::Column::FileId.eq(file_id))
            .order_by_desc(file_access_logs::Column::AccessedAt)
            .all(db)
            .await
    }
}
