use crate::entities::{prelude::*, *};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait, sea_query::Expr,
};

/// Record store for shared files.
pub struct FileRepository;

impl FileRepository {
    pub async fn create(
        db: &impl ConnectionTrait,
        record: shared_files::ActiveModel,
    ) -> Result<shared_files::Model, DbErr> {
        record.insert(db).await
    }

    pub async fn find(
        db: &impl ConnectionTrait,
        id: &str,
    ) -> Result<Option<shared_files::Model>, DbErr> {
        SharedFiles::find_by_id(id).one(db).await
    }

    /// Records uploaded by `owner_id`, newest first.
    pub async fn find_by_owner(
        db: &impl ConnectionTrait,
        owner_id: &str,
    ) -> Result<Vec<shared_files::Model>, DbErr> {
        SharedFiles::find()
            .filter(shared_files::Column::OwnerId.eq(owner_id))
            .order_by_desc(shared_files::Column::UploadedAt)
            .all(db)
            .await
    }

    /// Records past their deadline whose ciphertext has not been reclaimed.
    pub async fn find_expired_unreclaimed(
        db: &impl ConnectionTrait,
        now: DateTime<Utc>,
    ) -> Result<Vec<shared_files::Model>, DbErr> {
        SharedFiles::find()
            .filter(shared_files::Column::ExpiresAt.lt(now))
            .filter(shared_files::Column::IsExpired.eq(false))
            .order_by_asc(shared_files::Column::ExpiresAt)
            .all(db)
            .await
    }

    /// Set `is_expired` on a live record. Returns `false` if it was already
    /// set or the record is gone.
    pub async fn mark_expired(db: &impl ConnectionTrait, id: &str) -> Result<bool, DbErr> {
        let result = SharedFiles::update_many()
            .col_expr(shared_files::Column::IsExpired, Expr::value(true))
            .filter(shared_files::Column::Id.eq(id))
            .filter(shared_files::Column::IsExpired.eq(false))
            .exec(db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Consume one download as a single conditional update.
    ///
    /// The increment only applies while the record is live and still below
    /// its bound, so concurrent callers can never push `download_count` past
    /// `max_downloads`. The record is re-read in the same transaction, so the
    /// returned count is the one this call produced. Returns `None` if the
    /// guard did not hold.
    pub async fn try_consume_download(
        db: &impl TransactionTrait,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<shared_files::Model>, DbErr> {
        let txn = db.begin().await?;

        let result = SharedFiles::update_many()
            .col_expr(
                shared_files::Column::DownloadCount,
                Expr::col(shared_files::Column::DownloadCount).add(1),
            )
            .filter(shared_files::Column::Id.eq(id))
            .filter(shared_files::Column::IsExpired.eq(false))
            .filter(shared_files::Column::ExpiresAt.gte(now))
            .filter(
                Expr::col(shared_files::Column::DownloadCount)
                    .lt(Expr::col(shared_files::Column::MaxDownloads)),
            )
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(None);
        }

        let updated = Self::find(&txn, id).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Remove a record and its access log. Returns `false` if it did not exist.
    pub async fn delete(db: &impl ConnectionTrait, id: &str) -> Result<bool, DbErr> {
        FileAccessLogs::delete_many()
            .filter(file_access_logs::Column::FileId.eq(id))
            .exec(db)
            .await?;

        let result = SharedFiles::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected == 1)
    }
}
