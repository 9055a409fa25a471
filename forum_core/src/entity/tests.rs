#[cfg(test)]
mod entity_tests {
    use chrono::Utc;

    use crate::entity::prelude::*;
    use crate::ids::*;
    use crate::models::migrator::Migrator;
    use sea_orm_migration::MigratorTrait;

    /// Test helper to create and migrate an in-memory database
    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        // Run all migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    async fn insert_post(db: &DatabaseConnection, title: &str) -> PostId {
        let post_id = PostId::new();
        let post = PostActiveModel {
            id: Set(post_id),
            title: Set(title.to_string()),
            content: Set("Body".to_string()),
            url: Set(None),
            author: Set("alice".to_string()),
            created_at: Set(Utc::now()),
            votes: Set(0),
        };
        Post::insert(post).exec(db).await.unwrap();
        post_id
    }

    async fn insert_comment(
        db: &DatabaseConnection,
        post_id: PostId,
        parent: Option<CommentId>,
    ) -> CommentId {
        let comment_id = CommentId::new();
        let comment = CommentActiveModel {
            id: Set(comment_id),
            post_id: Set(post_id),
            parent_comment_id: Set(parent),
            author: Set("bob".to_string()),
            content: Set("Comment".to_string()),
            created_at: Set(Utc::now()),
            votes: Set(0),
        };
        Comment::insert(comment).exec(db).await.unwrap();
        comment_id
    }

    fn vote(username: &str, post_id: Option<PostId>, comment_id: Option<CommentId>) -> VoteActiveModel {
        VoteActiveModel {
            id: Set(VoteId::new()),
            username: Set(username.to_string()),
            value: Set(1),
            created_at: Set(Utc::now()),
            post_id: Set(post_id),
            comment_id: Set(comment_id),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_post() {
        let db = setup_test_db().await;

        let post_id = insert_post(&db, "Test Post").await;

        let found = Post::find_by_id(post_id)
            .one(&db)
            .await
            .expect("Failed to query post");

        assert!(found.is_some());
        let found_post = found.unwrap();
        assert_eq!(found_post.id, post_id);
        assert_eq!(found_post.title, "Test Post");
        assert_eq!(found_post.url, None);
        assert_eq!(found_post.votes, 0);
    }

    #[tokio::test]
    async fn test_nullable_parent_reads_back() {
        let db = setup_test_db().await;

        let post_id = insert_post(&db, "Parent test").await;
        let root = insert_comment(&db, post_id, None).await;
        let reply = insert_comment(&db, post_id, Some(root)).await;

        let root = Comment::find_by_id(root).one(&db).await.unwrap().unwrap();
        assert_eq!(root.parent_comment_id, None);

        let reply = Comment::find_by_id(reply).one(&db).await.unwrap().unwrap();
        assert_eq!(reply.parent_comment_id, Some(root.id));
    }

    #[tokio::test]
    async fn test_find_related_comments() {
        let db = setup_test_db().await;

        let post_id = insert_post(&db, "Related").await;
        for _ in 0..3 {
            insert_comment(&db, post_id, None).await;
        }
        insert_comment(&db, insert_post(&db, "Other").await, None).await;

        let post = Post::find_by_id(post_id).one(&db).await.unwrap().unwrap();
        let comments = post.find_related(Comment).all(&db).await.unwrap();
        assert_eq!(comments.len(), 3);
        assert!(comments.iter().all(|c| c.post_id == post_id));
    }

    #[tokio::test]
    async fn test_deleting_post_cascades() {
        let db = setup_test_db().await;

        let post_id = insert_post(&db, "Cascade").await;
        let root = insert_comment(&db, post_id, None).await;
        insert_comment(&db, post_id, Some(root)).await;
        Vote::insert(vote("alice", Some(post_id), None)).exec(&db).await.unwrap();
        Vote::insert(vote("alice", None, Some(root))).exec(&db).await.unwrap();

        Post::delete_by_id(post_id).exec(&db).await.unwrap();

        assert_eq!(Comment::find().count(&db).await.unwrap(), 0);
        assert_eq!(Vote::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_vote_unique_per_subject_and_user() {
        let db = setup_test_db().await;

        let post_id = insert_post(&db, "Unique").await;
        let comment_id = insert_comment(&db, post_id, None).await;

        Vote::insert(vote("alice", Some(post_id), None)).exec(&db).await.unwrap();
        Vote::insert(vote("bob", Some(post_id), None)).exec(&db).await.unwrap();
        Vote::insert(vote("alice", None, Some(comment_id))).exec(&db).await.unwrap();

        let result = Vote::insert(vote("alice", Some(post_id), None)).exec(&db).await;
        assert!(result.is_err());

        let result = Vote::insert(vote("alice", None, Some(comment_id))).exec(&db).await;
        assert!(result.is_err());

        assert_eq!(Vote::find().count(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_vote_needs_exactly_one_subject() {
        let db = setup_test_db().await;

        let post_id = insert_post(&db, "Subject").await;
        let comment_id = insert_comment(&db, post_id, None).await;

        let both = Vote::insert(vote("alice", Some(post_id), Some(comment_id)))
            .exec(&db)
            .await;
        assert!(both.is_err());

        let neither = Vote::insert(vote("alice", None, None)).exec(&db).await;
        assert!(neither.is_err());
    }

    #[tokio::test]
    async fn test_vote_value_is_checked() {
        let db = setup_test_db().await;

        let post_id = insert_post(&db, "Values").await;
        let mut bad = vote("alice", Some(post_id), None);
        bad.value = Set(3);

        assert!(Vote::insert(bad).exec(&db).await.is_err());
    }
}
