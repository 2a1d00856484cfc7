use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Default)]
pub struct MemoryPostRepo {
    posts: DashMap<PostId, Post>,
    next_id: AtomicI64,
}

impl MemoryPostRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PostRepo for MemoryPostRepo {
    async fn create(&self, draft: NewPost, now: DateTime<Utc>) -> Result<Post, PostRepoError> {
        let id = PostId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let post = Post::new_pending(id, draft, now)?;
        self.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn load(&self, post_id: PostId) -> Result<Option<Post>, PostRepoError> {
        Ok(self.posts.get(&post_id).map(|p| p.clone()))
    }

    async fn save(&self, post: &Post, expected: PostStatus) -> Result<(), PostRepoError> {
        // the shard lock is held across the check and the write
        let mut stored = self.posts.get_mut(&post.id).ok_or(PostRepoError::NotFound)?;
        if stored.status != expected {
            return Err(PostError::InvalidStateTransition {
                from: stored.status,
            }
            .into());
        }
        *stored = post.clone();
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: PostStatus,
        page: PageRequest,
    ) -> Result<PostPage, PostRepoError> {
        let mut matching: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.status == status)
            .map(|p| p.clone())
            .collect();
        matching.sort_by_key(|p| Reverse((p.created_at, p.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(PostPage {
            items,
            page: page.page,
            size: page.size,
            total,
        })
    }
}
