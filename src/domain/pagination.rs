//! 分页参数与分页结果

use serde::{Deserialize, Serialize};

use crate::config::env::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// 分页查询参数 (`?page=1&limit=20`)
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageQuery {
    /// 规范化：page 至少为 1，limit 限制在 1..=MAX_PAGE_SIZE
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// 分页结果
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub pages: usize,
}

impl<T> Page<T> {
    /// 对已排序的完整列表切片
    pub fn paginate(all: Vec<T>, query: PageQuery) -> Self {
        let query = query.normalized();
        let total = all.len();
        let pages = total.div_ceil(query.limit);
        let items = all
            .into_iter()
            .skip((query.page - 1).saturating_mul(query.limit))
            .take(query.limit)
            .collect();

        Self {
            items,
            total,
            page: query.page,
            limit: query.limit,
            pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            pages: self.pages,
        }
    }
}
