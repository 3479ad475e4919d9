use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_access_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub file_id: String,
    pub actor_address: Option<String>,
    pub actor_agent: Option<String>,
    pub access_type: String, // "upload", "view", "download"
    pub accessed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shared_files::Entity",
        from = "Column::FileId",
        to = "super::shared_files::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    SharedFiles,
}

impl Related<super::shared_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SharedFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
