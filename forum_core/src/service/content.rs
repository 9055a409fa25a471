use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::{GenerationReport, NewComment, NewPost},
    entity::prelude::*,
    generation::{ContentGenerator, GeneratedPost, GenerationError, DEFAULT_PROMPT},
    service::{comments::insert_comment, posts::insert_post},
};

#[derive(Debug, Error)]
pub enum ContentServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("content generation failed: {0}")]
    Generation(#[from] GenerationError),
}

struct Sample {
    title: &'static str,
    content: &'static str,
    url: Option<&'static str>,
    author: &'static str,
    /// (content, author, index of the comment being replied to)
    comments: &'static [(&'static str, &'static str, Option<usize>)],
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Farmers market moves to Saturdays starting next month",
        content: "The organisers confirmed the switch this morning. Same square, same stalls, opening at 8.",
        url: None,
        author: "MarketWatcher",
        comments: &[
            ("Finally! Weekday mornings never worked for me.", "EarlyBird", None),
            ("Any word on whether the bakery stall is staying?", "CrumbHunter", None),
            ("They told me yes, same spot by the fountain.", "MarketWatcher", Some(1)),
        ],
    },
    Sample {
        title: "Photos from the lantern walk along the river",
        content: "Managed a few long exposures before the rain started.",
        url: Some("https://example.org/gallery/lantern-walk"),
        author: "ShutterSlow",
        comments: &[("The bridge shot is wonderful.", "RiverRat", None)],
    },
    Sample {
        title: "Library is looking for volunteers for the repair cafe",
        content: "Bring a broken lamp, toaster or bike and learn to fix it. They also need people who can solder.",
        url: None,
        author: "FixItFelix",
        comments: &[],
    },
];

#[derive(Clone)]
pub struct ContentService {
    db: DatabaseConnection,
}

impl ContentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Removes every vote, comment and post.
    pub async fn delete_all(&self) -> Result<(), ContentServiceError> {
        let txn = self.db.begin().await?;

        let votes = Vote::delete_many().exec(&txn).await?.rows_affected;
        Comment::delete_many().exec(&txn).await?;
        let posts = Post::delete_many().exec(&txn).await?.rows_affected;

        txn.commit().await?;

        info!(posts, votes, "all content deleted");
        Ok(())
    }

    /// Inserts the sample posts when the store holds no posts. Returns
    /// whether anything was inserted.
    pub async fn seed_if_empty(&self) -> Result<bool, ContentServiceError> {
        if Post::find().count(&self.db).await? > 0 {
            return Ok(false);
        }

        let txn = self.db.begin().await?;
        for sample in SAMPLES {
            let post = insert_post(
                &txn,
                NewPost {
                    title: sample.title.to_string(),
                    content: sample.content.to_string(),
                    url: sample.url.map(str::to_string),
                    author: sample.author.to_string(),
                },
            )
            .await?;

            let mut inserted = Vec::with_capacity(sample.comments.len());
            for (content, author, parent) in sample.comments {
                let parent_id = parent.and_then(|i| inserted.get(i).copied());
                let comment = insert_comment(
                    &txn,
                    post.id,
                    parent_id,
                    NewComment {
                        content: content.to_string(),
                        author: author.to_string(),
                    },
                )
                .await?;
                inserted.push(comment.id);
            }
        }
        txn.commit().await?;

        info!(posts = SAMPLES.len(), "seeded sample content");
        Ok(true)
    }

    /// Asks `generator` for content and stores what passes validation.
    ///
    /// Each post is written together with its comments in one transaction.
    /// A failure part way through keeps the posts already written.
    pub async fn generate(
        &self,
        generator: &dyn ContentGenerator,
        prompt: Option<&str>,
    ) -> Result<GenerationReport, ContentServiceError> {
        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROMPT);

        let generated = generator.generate(prompt).await?;

        let mut report = GenerationReport::default();
        for item in generated {
            self.store_generated(item, &mut report).await?;
        }

        info!(
            posts = report.posts_created,
            comments = report.comments_created,
            skipped = report.skipped,
            "generated content stored"
        );
        Ok(report)
    }

    async fn store_generated(
        &self,
        item: GeneratedPost,
        report: &mut GenerationReport,
    ) -> Result<(), ContentServiceError> {
        let (Some(title), Some(author)) = (item.title, item.author) else {
            report.skipped += 1 + item.comments.len() as u64;
            return Ok(());
        };
        let new_post = NewPost {
            title,
            content: item.content.unwrap_or_default(),
            url: None,
            author,
        };
        if let Err(e) = new_post.validate() {
            warn!(error = %e, "skipping generated post");
            report.skipped += 1 + item.comments.len() as u64;
            return Ok(());
        }

        let txn = self.db.begin().await?;
        let post = insert_post(&txn, new_post).await?;

        let mut comments = 0;
        for comment in item.comments {
            let new_comment = match (comment.content, comment.author) {
                (Some(content), Some(author)) => NewComment { content, author },
                _ => {
                    report.skipped += 1;
                    continue;
                }
            };
            if new_comment.validate().is_err() {
                report.skipped += 1;
                continue;
            }
            insert_comment(&txn, post.id, None, new_comment).await?;
            comments += 1;
        }
        txn.commit().await?;

        report.posts_created += 1;
        report.comments_created += comments;
        Ok(())
    }
}
