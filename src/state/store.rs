//! 文档存储
//!
//! 每个集合是 `RwLock<HashMap<id, T>>`；配置了数据目录时，每次写操作后
//! 将整个集合快照到 `<data_dir>/<collection>.json`（临时文件 + 原子重命名）。
//! 唯一索引通过 `insert_unique` 在同一把写锁内完成检查和插入。
//! 写操作先在副本上修改并落盘，快照写入失败时内存状态保持不变。

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{
    Certificate, CourseModule, Course, Enrollment, ForumPost, LearningPath, Lesson, Notification,
    Session, Submission, User,
};

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 违反唯一索引
    #[error("{0}")]
    Conflict(String),
    /// 快照写入失败
    #[error("snapshot write failed: {0}")]
    Io(#[from] anyhow::Error),
}

/// 可存储的文档
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 集合名（同时是快照文件名）
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// 文档集合
pub struct Collection<T: Document> {
    docs: RwLock<HashMap<String, T>>,
    snapshot_path: Option<PathBuf>,
}

impl<T: Document> Collection<T> {
    /// 仅内存的空集合
    pub fn in_memory() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            snapshot_path: None,
        }
    }

    /// 打开集合，从快照文件恢复
    ///
    /// 文件不存在视为空集合；解析失败记录警告后同样视为空集合
    pub async fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(format!("{}.json", T::COLLECTION));
        let mut docs = HashMap::new();

        if path.exists() {
            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<Vec<T>>(&content) {
                    Ok(list) => {
                        info!(
                            collection = T::COLLECTION,
                            documents = list.len(),
                            "Loaded collection snapshot"
                        );
                        docs = list.into_iter().map(|d| (d.id().to_string(), d)).collect();
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse collection snapshot, starting empty"
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read collection snapshot, starting empty"
                    );
                }
            }
        }

        Self {
            docs: RwLock::new(docs),
            snapshot_path: Some(path),
        }
    }

    /// 写快照（原子写入）
    async fn persist(&self, docs: &HashMap<String, T>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let mut list: Vec<&T> = docs.values().collect();
        list.sort_by(|a, b| a.id().cmp(b.id()));

        let write = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&list)?;
            let temp_path = path.with_extension("json.tmp");
            fs::write(&temp_path, &content).await?;
            fs::rename(&temp_path, path).await?;
            anyhow::Ok(())
        };
        write.await?;

        debug!(collection = T::COLLECTION, documents = list.len(), "Saved collection snapshot");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<T> {
        let docs = self.docs.read().await;
        docs.get(id).cloned()
    }

    /// 按条件查询，结果按 id 排序
    pub async fn find(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let docs = self.docs.read().await;
        let mut found: Vec<T> = docs.values().filter(|d| pred(d)).cloned().collect();
        found.sort_by(|a, b| a.id().cmp(b.id()));
        found
    }

    pub async fn find_one(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let docs = self.docs.read().await;
        docs.values().find(|d| pred(d)).cloned()
    }

    pub async fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        let docs = self.docs.read().await;
        docs.values().filter(|d| pred(d)).count()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// 写快照成功后才替换内存中的集合
    async fn commit(
        &self,
        docs: &mut HashMap<String, T>,
        candidate: HashMap<String, T>,
    ) -> Result<(), StoreError> {
        self.persist(&candidate).await?;
        *docs = candidate;
        Ok(())
    }

    /// 插入或覆盖
    pub async fn insert(&self, doc: T) -> Result<T, StoreError> {
        let mut docs = self.docs.write().await;
        let mut candidate = docs.clone();
        candidate.insert(doc.id().to_string(), doc.clone());
        self.commit(&mut docs, candidate).await?;
        Ok(doc)
    }

    /// 带唯一性检查的插入
    ///
    /// 任一现有文档满足 `conflicts` 时返回 `StoreError::Conflict`
    pub async fn insert_unique(
        &self,
        doc: T,
        conflicts: impl Fn(&T) -> bool,
        message: impl Into<String>,
    ) -> Result<T, StoreError> {
        let mut docs = self.docs.write().await;
        if docs.values().any(|d| conflicts(d)) {
            return Err(StoreError::Conflict(message.into()));
        }
        let mut candidate = docs.clone();
        candidate.insert(doc.id().to_string(), doc.clone());
        self.commit(&mut docs, candidate).await?;
        Ok(doc)
    }

    /// 原地更新，文档不存在时返回 None
    pub async fn update(&self, id: &str, f: impl FnOnce(&mut T)) -> Result<Option<T>, StoreError> {
        let mut docs = self.docs.write().await;
        let mut candidate = docs.clone();
        let Some(doc) = candidate.get_mut(id) else {
            return Ok(None);
        };
        f(doc);
        let updated = doc.clone();
        self.commit(&mut docs, candidate).await?;
        Ok(Some(updated))
    }

    /// 可失败的更新
    ///
    /// 在副本上执行 `f`，成功才写回；失败时文档保持不变
    pub async fn try_update<E>(
        &self,
        id: &str,
        f: impl FnOnce(&mut T) -> Result<(), E>,
    ) -> Result<Option<T>, E>
    where
        E: From<StoreError>,
    {
        let mut docs = self.docs.write().await;
        let Some(current) = docs.get(id) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        f(&mut updated)?;
        let mut candidate = docs.clone();
        candidate.insert(id.to_string(), updated.clone());
        self.commit(&mut docs, candidate).await?;
        Ok(Some(updated))
    }

    /// 批量更新满足条件的文档，返回更新数量
    pub async fn update_where(
        &self,
        pred: impl Fn(&T) -> bool,
        mut f: impl FnMut(&mut T),
    ) -> Result<usize, StoreError> {
        let mut docs = self.docs.write().await;
        let mut candidate = docs.clone();
        let mut changed = 0;
        for doc in candidate.values_mut().filter(|d| pred(d)) {
            f(doc);
            changed += 1;
        }
        if changed > 0 {
            self.commit(&mut docs, candidate).await?;
        }
        Ok(changed)
    }

    pub async fn remove(&self, id: &str) -> Result<Option<T>, StoreError> {
        let mut docs = self.docs.write().await;
        let mut candidate = docs.clone();
        let removed = candidate.remove(id);
        if removed.is_some() {
            self.commit(&mut docs, candidate).await?;
        }
        Ok(removed)
    }

    /// 删除满足条件的文档，返回删除数量
    pub async fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Result<usize, StoreError> {
        let mut docs = self.docs.write().await;
        let mut candidate = docs.clone();
        candidate.retain(|_, d| !pred(d));
        let removed = docs.len() - candidate.len();
        if removed > 0 {
            self.commit(&mut docs, candidate).await?;
        }
        Ok(removed)
    }
}

macro_rules! document {
    ($ty:ty, $name:literal, $field:ident) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $name;

            fn id(&self) -> &str {
                &self.$field
            }
        }
    };
}

document!(User, "users", id);
document!(Session, "sessions", token);
document!(Course, "courses", id);
document!(CourseModule, "modules", id);
document!(Lesson, "lessons", id);
document!(Enrollment, "enrollments", id);
document!(Submission, "submissions", id);
document!(Certificate, "certificates", id);
document!(LearningPath, "learning_paths", id);
document!(Notification, "notifications", id);
document!(ForumPost, "forum_posts", id);

/// 全部集合
pub struct Store {
    pub users: Collection<User>,
    pub sessions: Collection<Session>,
    pub courses: Collection<Course>,
    pub modules: Collection<CourseModule>,
    pub lessons: Collection<Lesson>,
    pub enrollments: Collection<Enrollment>,
    pub submissions: Collection<Submission>,
    pub certificates: Collection<Certificate>,
    pub learning_paths: Collection<LearningPath>,
    pub notifications: Collection<Notification>,
    pub forum_posts: Collection<ForumPost>,
}

/// 各集合文档数量（用于 health 端点）
#[derive(Debug, Serialize)]
pub struct StoreCounts {
    pub users: usize,
    pub courses: usize,
    pub lessons: usize,
    pub enrollments: usize,
    pub certificates: usize,
    pub forum_posts: usize,
}

impl Store {
    /// 仅内存存储
    pub fn in_memory() -> Self {
        Self {
            users: Collection::in_memory(),
            sessions: Collection::in_memory(),
            courses: Collection::in_memory(),
            modules: Collection::in_memory(),
            lessons: Collection::in_memory(),
            enrollments: Collection::in_memory(),
            submissions: Collection::in_memory(),
            certificates: Collection::in_memory(),
            learning_paths: Collection::in_memory(),
            notifications: Collection::in_memory(),
            forum_posts: Collection::in_memory(),
        }
    }

    /// 从数据目录加载全部集合
    pub async fn open(data_dir: &Path) -> Self {
        info!(path = %data_dir.display(), "Opening document store");
        Self {
            users: Collection::open(data_dir).await,
            sessions: Collection::open(data_dir).await,
            courses: Collection::open(data_dir).await,
            modules: Collection::open(data_dir).await,
            lessons: Collection::open(data_dir).await,
            enrollments: Collection::open(data_dir).await,
            submissions: Collection::open(data_dir).await,
            certificates: Collection::open(data_dir).await,
            learning_paths: Collection::open(data_dir).await,
            notifications: Collection::open(data_dir).await,
            forum_posts: Collection::open(data_dir).await,
        }
    }

    pub async fn counts(&self) -> StoreCounts {
        StoreCounts {
            users: self.users.len().await,
            courses: self.courses.len().await,
            lessons: self.lessons.len().await,
            enrollments: self.enrollments.len().await,
            certificates: self.certificates.len().await,
            forum_posts: self.forum_posts.len().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Enrollment;

    #[tokio::test]
    async fn test_insert_unique_enforces_index() {
        let col: Collection<Enrollment> = Collection::in_memory();
        let first = Enrollment::new("u1", "c1");
        col.insert_unique(first, |_| false, "dup").await.unwrap();

        let second = Enrollment::new("u1", "c1");
        let result = col
            .insert_unique(
                second,
                |e| e.user_id == "u1" && e.course_id == "c1",
                "Already enrolled",
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(m)) if m == "Already enrolled"));
        assert_eq!(col.len().await, 1);
    }

    #[tokio::test]
    async fn test_try_update_rolls_back_on_error() {
        let col: Collection<Enrollment> = Collection::in_memory();
        let e = col.insert(Enrollment::new("u1", "c1")).await.unwrap();

        let result: Result<Option<Enrollment>, StoreError> = col
            .try_update(&e.id, |doc| {
                doc.progress = 99;
                Err(StoreError::Conflict("nope".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(col.get(&e.id).await.unwrap().progress, 0);

        let missing: Result<Option<Enrollment>, StoreError> =
            col.try_update("missing", |_| Ok(())).await;
        assert!(missing.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_where_and_find_sorted() {
        let col: Collection<Enrollment> = Collection::in_memory();
        for course in ["c1", "c2", "c3"] {
            col.insert(Enrollment::new("u1", course)).await.unwrap();
        }
        let all = col.find(|_| true).await;
        assert!(all.windows(2).all(|w| w[0].id <= w[1].id));

        let removed = col.remove_where(|e| e.course_id != "c2").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(col.find_one(|_| true).await.unwrap().course_id, "c2");
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let col: Collection<Enrollment> = Collection::open(dir.path()).await;
            let e = col.insert(Enrollment::new("u1", "c1")).await.unwrap();
            col.update(&e.id, |doc| doc.progress = 50).await.unwrap();
            e.id
        };

        assert!(dir.path().join("enrollments.json").exists());
        assert!(!dir.path().join("enrollments.json.tmp").exists());

        let reopened: Collection<Enrollment> = Collection::open(dir.path()).await;
        assert_eq!(reopened.get(&id).await.unwrap().progress, 50);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("enrollments.json"), "not json").unwrap();
        let col: Collection<Enrollment> = Collection::open(dir.path()).await;
        assert!(col.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_snapshot_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "regular file").unwrap();

        // 数据目录位于普通文件之下，快照无法写入
        let col: Collection<Enrollment> = Collection::open(&blocker.join("data")).await;

        let inserted = col.insert(Enrollment::new("u1", "c1")).await;
        assert!(matches!(inserted, Err(StoreError::Io(_))));
        let unique = col
            .insert_unique(Enrollment::new("u1", "c2"), |_| false, "dup")
            .await;
        assert!(matches!(unique, Err(StoreError::Io(_))));
        assert!(col.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_snapshot_keeps_previous_documents() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let col: Collection<Enrollment> = Collection::open(&data).await;
        let e = col.insert(Enrollment::new("u1", "c1")).await.unwrap();

        std::fs::remove_dir_all(&data).unwrap();
        std::fs::write(&data, "regular file").unwrap();

        assert!(col.update(&e.id, |doc| doc.progress = 80).await.is_err());
        assert!(col.remove(&e.id).await.is_err());
        assert!(col.remove_where(|_| true).await.is_err());
        assert!(col.update_where(|_| true, |doc| doc.progress = 10).await.is_err());

        let kept = col.get(&e.id).await.unwrap();
        assert_eq!(kept.progress, 0);
        assert_eq!(col.len().await, 1);
    }
}
