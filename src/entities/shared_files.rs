use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shared_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: Option<String>,
    pub ciphertext_ref: String,
    /// Opaque to the server: stored and returned verbatim.
    #[sea_orm(column_type = "Text")]
    pub exported_key: String,
    pub nonce: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub uploaded_at: DateTimeUtc,
    pub expires_at: DateTimeUtc,
    pub download_count: i32,
    pub max_downloads: i32,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_expired: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::file_access_logs::Entity")]
    FileAccessLogs,
}

impl Related<super::file_access_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FileAccessLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True once the sweeper has reclaimed the record or its deadline passed.
    pub fn is_expired_at(&self, now: DateTimeUtc) -> bool {
        self.is_expired || now > self.expires_at
    }

    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }
}
