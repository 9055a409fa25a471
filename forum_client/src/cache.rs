use chrono::{DateTime, Utc};
use forum_core::{
    dto::{CommentView, NewComment, NewPost, PostDetail, PostSummary, VoteOutcome},
    ids::{CommentId, PostId},
    thread::{assemble, flatten_by, Threaded},
    time_ago::time_ago,
    voting::{cast, Direction, VoteTag},
};

pub const DEFAULT_CAPACITY: usize = 50;

/// A comment as the cache stores it: flat, with its parent reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_comment_id: Option<CommentId>,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub votes: i32,
    pub user_vote: VoteTag,
}

impl Threaded for CachedComment {
    type Key = CommentId;

    fn key(&self) -> CommentId {
        self.id
    }

    fn parent_key(&self) -> Option<CommentId> {
        self.parent_comment_id
    }
}

impl From<CommentView> for CachedComment {
    fn from(view: CommentView) -> Self {
        Self {
            id: view.id,
            post_id: view.post_id,
            parent_comment_id: view.parent_comment_id,
            author: view.author,
            content: view.content,
            created_at: view.created_at,
            votes: view.votes,
            user_vote: view.user_vote,
        }
    }
}

impl CachedComment {
    fn view(&self, replies: Vec<CommentView>, now: DateTime<Utc>) -> CommentView {
        CommentView {
            id: self.id,
            post_id: self.post_id,
            parent_comment_id: self.parent_comment_id,
            author: self.author.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
            time_ago: time_ago(self.created_at, now),
            votes: self.votes,
            user_vote: self.user_vote,
            replies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPost {
    pub summary: PostSummary,
    /// `None` until the post's full comment list is known. A partial list
    /// is never stored.
    pub comments: Option<Vec<CachedComment>>,
}

/// Bounded local mirror of the most recently fetched posts, newest first.
#[derive(Debug, Clone)]
pub struct PostCache {
    capacity: usize,
    posts: Vec<CachedPost>,
}

impl Default for PostCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PostCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            posts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn clear(&mut self) {
        self.posts.clear();
    }

    pub fn summaries(&self) -> Vec<PostSummary> {
        self.posts.iter().map(|p| p.summary.clone()).collect()
    }

    pub fn get(&self, post_id: PostId) -> Option<&CachedPost> {
        self.posts.iter().find(|p| p.summary.id == post_id)
    }

    fn get_mut(&mut self, post_id: PostId) -> Option<&mut CachedPost> {
        self.posts.iter_mut().find(|p| p.summary.id == post_id)
    }

    /// Replaces the cached listing with a fresh one from the server.
    /// Comment lists survive for posts whose comment count is unchanged.
    pub fn replace_all(&mut self, summaries: Vec<PostSummary>) {
        let mut previous = std::mem::take(&mut self.posts);
        self.posts = summaries
            .into_iter()
            .take(self.capacity)
            .map(|summary| {
                let comments = previous
                    .iter_mut()
                    .find(|p| p.summary.id == summary.id)
                    .and_then(|p| p.comments.take())
                    .filter(|c| c.len() as u64 == summary.comment_count);
                CachedPost { summary, comments }
            })
            .collect();
    }

    /// Inserts or replaces one post at the front of the cache.
    pub fn upsert_summary(&mut self, summary: PostSummary) {
        let comments = self
            .posts
            .iter()
            .position(|p| p.summary.id == summary.id)
            .and_then(|i| self.posts.remove(i).comments);
        self.posts.insert(0, CachedPost { summary, comments });
        self.posts.truncate(self.capacity);
    }

    /// Stores a fetched post together with its full comment list.
    pub fn upsert_detail(&mut self, detail: PostDetail) {
        let comments: Vec<CachedComment> = flatten_by(detail.comments, |c| std::mem::take(&mut c.replies))
            .into_iter()
            .map(CachedComment::from)
            .collect();

        match self.get_mut(detail.post.id) {
            Some(cached) => {
                cached.summary = detail.post;
                cached.comments = Some(comments);
            }
            None => {
                self.posts.insert(
                    0,
                    CachedPost {
                        summary: detail.post,
                        comments: Some(comments),
                    },
                );
                self.posts.truncate(self.capacity);
            }
        }
    }

    /// The cached post with its comments arranged as reply trees. `None`
    /// unless the full comment list is cached.
    pub fn detail(&self, post_id: PostId) -> Option<PostDetail> {
        let cached = self.get(post_id)?;
        let flat = cached.comments.as_deref()?;
        let now = Utc::now();
        let comments = assemble(flat, |c, replies| c.view(replies, now));

        let mut post = cached.summary.clone();
        post.time_ago = time_ago(post.created_at, now);
        Some(PostDetail { post, comments })
    }

    /// Applies one click locally. `None` if the post is not cached.
    pub fn apply_post_vote(&mut self, post_id: PostId, direction: Direction) -> Option<VoteOutcome> {
        let summary = &mut self.get_mut(post_id)?.summary;
        let transition = cast(summary.user_vote, direction);
        summary.votes += transition.delta;
        summary.user_vote = transition.tag;
        Some(VoteOutcome {
            votes: summary.votes,
            user_vote: summary.user_vote,
        })
    }

    /// Applies one click to a cached comment. `None` if it is not cached.
    pub fn apply_comment_vote(
        &mut self,
        post_id: PostId,
        comment_id: CommentId,
        direction: Direction,
    ) -> Option<VoteOutcome> {
        let comment = self.comment_mut(post_id, comment_id)?;
        let transition = cast(comment.user_vote, direction);
        comment.votes += transition.delta;
        comment.user_vote = transition.tag;
        Some(VoteOutcome {
            votes: comment.votes,
            user_vote: comment.user_vote,
        })
    }

    /// Records an outcome confirmed by the server.
    pub fn set_post_vote(&mut self, post_id: PostId, outcome: VoteOutcome) {
        if let Some(cached) = self.get_mut(post_id) {
            cached.summary.votes = outcome.votes;
            cached.summary.user_vote = outcome.user_vote;
        }
    }

    pub fn set_comment_vote(&mut self, post_id: PostId, comment_id: CommentId, outcome: VoteOutcome) {
        if let Some(comment) = self.comment_mut(post_id, comment_id) {
            comment.votes = outcome.votes;
            comment.user_vote = outcome.user_vote;
        }
    }

    fn comment_mut(&mut self, post_id: PostId, comment_id: CommentId) -> Option<&mut CachedComment> {
        self.get_mut(post_id)?
            .comments
            .as_mut()?
            .iter_mut()
            .find(|c| c.id == comment_id)
    }

    /// Adds a comment the server has confirmed.
    pub fn insert_comment(&mut self, comment: CommentView) {
        let Some(cached) = self.get_mut(comment.post_id) else {
            return;
        };
        if let Some(comments) = cached.comments.as_mut() {
            if comments.iter().any(|c| c.id == comment.id) {
                return;
            }
            comments.push(comment.into());
        }
        cached.summary.comment_count += 1;
    }

    /// Creates a comment locally with a fresh id. A reply needs its parent
    /// cached under the same post. `None` if the post or parent is missing.
    /// Without a full comment list only the count moves.
    pub fn add_local_comment(
        &mut self,
        post_id: PostId,
        parent_comment_id: Option<CommentId>,
        new: NewComment,
    ) -> Option<CommentView> {
        let cached = self.get_mut(post_id)?;
        if let Some(parent) = parent_comment_id {
            let known = cached
                .comments
                .as_ref()
                .is_some_and(|c| c.iter().any(|c| c.id == parent));
            if !known {
                return None;
            }
        }

        let comment = CachedComment {
            id: CommentId::new(),
            post_id,
            parent_comment_id,
            author: new.author,
            content: new.content,
            created_at: Utc::now(),
            votes: 0,
            user_vote: VoteTag::Neutral,
        };
        let view = comment.view(Vec::new(), comment.created_at);

        if let Some(comments) = cached.comments.as_mut() {
            comments.push(comment);
        }
        cached.summary.comment_count += 1;
        Some(view)
    }

    /// Creates a post locally with a fresh id and puts it first.
    pub fn add_local_post(&mut self, new: NewPost) -> PostSummary {
        let created_at = Utc::now();
        let summary = PostSummary {
            id: PostId::new(),
            title: new.title,
            content: new.content,
            url: new.url,
            author: new.author,
            created_at,
            time_ago: time_ago(created_at, created_at),
            votes: 0,
            comment_count: 0,
            user_vote: VoteTag::Neutral,
        };
        self.posts.insert(
            0,
            CachedPost {
                summary: summary.clone(),
                comments: Some(Vec::new()),
            },
        );
        self.posts.truncate(self.capacity);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(title: &str, comment_count: u64) -> PostSummary {
        PostSummary {
            id: PostId::new(),
            title: title.to_string(),
            content: String::new(),
            url: None,
            author: "alice".to_string(),
            created_at: Utc::now(),
            time_ago: "just now".to_string(),
            votes: 0,
            comment_count,
            user_vote: VoteTag::Neutral,
        }
    }

    /// Caches `post` as if its (empty) detail had been fetched.
    fn fetched(cache: &mut PostCache, post: PostSummary) -> PostId {
        let id = post.id;
        cache.upsert_detail(PostDetail {
            post,
            comments: Vec::new(),
        });
        id
    }

    fn tree_size(detail: PostDetail) -> u64 {
        flatten_by(detail.comments, |c| std::mem::take(&mut c.replies)).len() as u64
    }

    fn comment(author: &str) -> NewComment {
        NewComment {
            content: format!("from {author}"),
            author: author.to_string(),
        }
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut cache = PostCache::with_capacity(2);
        cache.replace_all(vec![summary("a", 0), summary("b", 0), summary("c", 0)]);
        assert_eq!(cache.len(), 2);

        cache.upsert_summary(summary("d", 0));
        let titles: Vec<String> = cache.summaries().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["d", "a"]);
    }

    #[test]
    fn test_post_vote_follows_toggle_rules() {
        let mut cache = PostCache::default();
        let post = summary("votes", 0);
        let id = post.id;
        cache.replace_all(vec![post]);

        let outcomes: Vec<VoteOutcome> = [Direction::Up, Direction::Up, Direction::Down, Direction::Up]
            .into_iter()
            .map(|d| cache.apply_post_vote(id, d).unwrap())
            .collect();
        let pairs: Vec<(i32, VoteTag)> = outcomes.iter().map(|o| (o.votes, o.user_vote)).collect();
        assert_eq!(
            pairs,
            vec![
                (1, VoteTag::Up),
                (0, VoteTag::Neutral),
                (-1, VoteTag::Down),
                (1, VoteTag::Up)
            ]
        );

        assert_eq!(cache.apply_post_vote(PostId::new(), Direction::Up), None);
    }

    #[test]
    fn test_local_comments_and_replies() {
        let mut cache = PostCache::default();
        let id = fetched(&mut cache, summary("threads", 0));

        let top = cache.add_local_comment(id, None, comment("bob")).unwrap();
        let reply = cache.add_local_comment(id, Some(top.id), comment("carol")).unwrap();
        assert_eq!(reply.parent_comment_id, Some(top.id));
        assert_eq!(cache.add_local_comment(id, Some(CommentId::new()), comment("dave")), None);

        let detail = cache.detail(id).unwrap();
        assert_eq!(detail.post.comment_count, 2);
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].replies[0].author, "carol");
        assert_eq!(detail.comments[0].user_vote, VoteTag::Neutral);
        assert_eq!(detail.comments[0].votes, 0);

        let outcome = cache.apply_comment_vote(id, reply.id, Direction::Down).unwrap();
        assert_eq!(outcome, VoteOutcome { votes: -1, user_vote: VoteTag::Down });
        let outcome = cache.apply_comment_vote(id, reply.id, Direction::Up).unwrap();
        assert_eq!(outcome, VoteOutcome { votes: 1, user_vote: VoteTag::Up });
    }

    #[test]
    fn test_detail_round_trips_through_flat_storage() {
        let mut cache = PostCache::default();
        let id = fetched(&mut cache, summary("detail", 0));
        let top = cache.add_local_comment(id, None, comment("bob")).unwrap();
        cache.add_local_comment(id, Some(top.id), comment("carol")).unwrap();
        cache.add_local_comment(id, None, comment("erin")).unwrap();

        let detail = cache.detail(id).unwrap();
        let mut other = PostCache::default();
        other.upsert_detail(detail.clone());
        assert_eq!(other.detail(id).unwrap().comments, detail.comments);
    }

    #[test]
    fn test_replace_keeps_comments_only_when_counts_match() {
        let mut cache = PostCache::default();
        let post = summary("kept", 0);
        let id = fetched(&mut cache, post.clone());
        cache.add_local_comment(id, None, comment("bob")).unwrap();

        let mut fresh = post.clone();
        fresh.comment_count = 1;
        cache.replace_all(vec![fresh]);
        assert_eq!(cache.get(id).unwrap().comments.as_ref().unwrap().len(), 1);

        let mut changed = post;
        changed.comment_count = 4;
        cache.replace_all(vec![changed]);
        assert_eq!(cache.get(id).unwrap().comments, None);
    }

    #[test]
    fn test_confirmed_outcomes_overwrite_local_state() {
        let mut cache = PostCache::default();
        let post = summary("confirmed", 0);
        let id = post.id;
        cache.replace_all(vec![post]);

        cache.set_post_vote(id, VoteOutcome { votes: 12, user_vote: VoteTag::Down });
        let cached = &cache.get(id).unwrap().summary;
        assert_eq!((cached.votes, cached.user_vote), (12, VoteTag::Down));

        let outcome = cache.apply_post_vote(id, Direction::Up).unwrap();
        assert_eq!(outcome, VoteOutcome { votes: 14, user_vote: VoteTag::Up });
    }

    #[test]
    fn test_local_post_goes_first() {
        let mut cache = PostCache::default();
        cache.replace_all(vec![summary("older", 0)]);
        let created = cache.add_local_post(NewPost {
            title: "Offline post".into(),
            content: String::new(),
            url: None,
            author: "alice".into(),
        });
        assert_eq!(cache.summaries()[0].id, created.id);
        assert!(cache.add_local_comment(created.id, None, comment("bob")).is_some());
    }

    #[test]
    fn test_comment_count_matches_served_tree() {
        let mut cache = PostCache::default();
        let listed = summary("listed only", 5);
        let listed_id = listed.id;
        cache.replace_all(vec![listed]);

        assert_eq!(cache.detail(listed_id), None);
        let top = cache.add_local_comment(listed_id, None, comment("bob")).unwrap();
        assert_eq!(cache.get(listed_id).unwrap().summary.comment_count, 6);
        assert_eq!(cache.get(listed_id).unwrap().comments, None);
        assert_eq!(cache.detail(listed_id), None);
        assert_eq!(cache.add_local_comment(listed_id, Some(top.id), comment("carol")), None);

        let id = fetched(&mut cache, summary("fetched", 0));
        let detail = cache.detail(id).unwrap();
        let count = detail.post.comment_count;
        assert_eq!(count, tree_size(detail));

        let top = cache.add_local_comment(id, None, comment("bob")).unwrap();
        cache.add_local_comment(id, Some(top.id), comment("carol")).unwrap();
        let detail = cache.detail(id).unwrap();
        let count = detail.post.comment_count;
        assert_eq!(count, 2);
        assert_eq!(count, tree_size(detail));
    }
}
