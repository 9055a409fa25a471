// SeaORM entities for posts, comments and the vote ledger.
// Table layouts are owned by the migrations in `models::migrator`.

pub mod comment;
pub mod post;
pub mod vote;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use super::comment::{
        ActiveModel as CommentActiveModel, Column as CommentColumn, Entity as Comment,
        Model as CommentModel,
    };
    pub use super::post::{
        ActiveModel as PostActiveModel, Column as PostColumn, Entity as Post,
        Model as PostModel,
    };
    pub use super::vote::{
        ActiveModel as VoteActiveModel, Column as VoteColumn, Entity as Vote,
        Model as VoteModel,
    };

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait,
        ColumnTrait,
        ConnectionTrait,

        Database,
        DatabaseConnection,
        DatabaseTransaction,
        DbErr,

        // Core traits
        EntityTrait,
        ModelTrait,
        PaginatorTrait,
        QueryFilter,
        QueryOrder,
        QuerySelect,
        TransactionTrait,

        // Active model helpers
        Set,
    };
}
