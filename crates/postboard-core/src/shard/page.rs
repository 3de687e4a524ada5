//! Paginated listings: parallel scan, merge, sort, window

use crate::record::Record;
use crate::shard::store::ShardedStore;
use postboard_types::PageRequest;
use std::cmp::Ordering;

impl<T: Record> ShardedStore<T> {
    /// Live records matching `predicate`, ordered by creation time then id,
    /// cut to the requested window. A window past the end is empty.
    pub async fn list_page<F>(&self, predicate: F, page: PageRequest) -> Vec<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let mut rows = self
            .scan_all(move |record| record.is_live() && predicate(record))
            .await;
        sort_by_creation(&mut rows);
        window(rows, page)
    }
}

/// Creation time ascending, id breaking ties
pub fn sort_by_creation<T: Record>(rows: &mut [T]) {
    rows.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| compare_ids(a.key(), b.key()))
    });
}

/// Shorter ids first, so decimal sequence ids order numerically
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

pub fn window<T>(mut rows: Vec<T>, page: PageRequest) -> Vec<T> {
    if page.offset >= rows.len() {
        return Vec::new();
    }

    rows.truncate(page.end(rows.len()));
    rows.split_off(page.offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use postboard_types::{NewPost, Post};
    use std::collections::HashSet;

    fn post(title: &str) -> Post {
        NewPost {
            author_id: "1".to_string(),
            title: title.to_string(),
            body: String::new(),
            allow_comments: true,
        }
        .into_post()
    }

    async fn filled(shards: usize, count: usize) -> ShardedStore<Post> {
        let store = ShardedStore::new("post", shards).unwrap();
        for i in 1..=count {
            store.insert(&i.to_string(), post("p")).await.unwrap();
        }
        store
    }

    #[test]
    fn test_ties_broken_by_id() {
        let at = Utc::now();
        let mut rows: Vec<Post> = ["10", "9", "2", "1"]
            .iter()
            .map(|id| {
                let mut p = post(id);
                p.assign(id.to_string(), at);
                p
            })
            .collect();
        let mut earlier = post("0");
        earlier.assign("99".to_string(), at - Duration::seconds(1));
        rows.push(earlier);

        sort_by_creation(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["99", "1", "2", "9", "10"]);
    }

    #[test]
    fn test_window_bounds() {
        let rows: Vec<u32> = (0..10).collect();
        assert_eq!(window(rows.clone(), PageRequest::new(0, 3)), vec![0, 1, 2]);
        assert_eq!(window(rows.clone(), PageRequest::new(8, 5)), vec![8, 9]);
        assert!(window(rows.clone(), PageRequest::new(10, 5)).is_empty());
        assert!(window(rows.clone(), PageRequest::new(3, 0)).is_empty());
    }

    #[tokio::test]
    async fn test_paging_reproduces_everything_once() {
        let store = filled(7, 53).await;
        let page_size = 5;

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = store
                .list_page(|_| true, PageRequest::new(offset, page_size))
                .await;
            if page.is_empty() {
                break;
            }
            assert!(page.len() <= page_size);
            seen.extend(page);
            offset += page_size;
        }

        assert_eq!(seen.len(), 53);
        let unique: HashSet<&str> = seen.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(unique.len(), 53);
        assert!(seen.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let store = filled(4, 6).await;
        assert!(store
            .list_page(|_| true, PageRequest::new(6, 10))
            .await
            .is_empty());
        assert!(store
            .list_page(|_| true, PageRequest::new(100, 10))
            .await
            .is_empty());
        assert_eq!(
            store.list_page(|_| true, PageRequest::new(4, 10)).await.len(),
            2
        );
    }

    #[tokio::test]
    async fn test_deleted_records_excluded() {
        let store = filled(4, 10).await;
        store.soft_delete("3").await.unwrap();
        store.soft_delete("7").await.unwrap();

        let rows = store.list_page(|_| true, PageRequest::new(0, 100)).await;
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|p| p.id != "3" && p.id != "7"));
    }
}
