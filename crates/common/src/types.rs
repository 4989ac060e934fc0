//! 通用类型定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 关联 ID
///
/// 每个入站调用生成一次，贯穿管道的所有阶段。nil 值表示"未设置"。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// 是否为未设置的默认值
    pub fn is_default(&self) -> bool {
        self.0.is_nil()
    }
}

/// 分页参数（页码从 1 开始，page_size 为 0 表示不分页）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self::not_paged()
    }
}

impl Paging {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn not_paged() -> Self {
        Self {
            page: 0,
            page_size: 0,
        }
    }

    pub fn is_paged(&self) -> bool {
        self.page_size > 0
    }

    /// 跳过的条数，u32 × u32 在 u64 中不会溢出
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// 排序参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    pub field: String,
    pub direction: SortDirection,
}

impl Sorting {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// 查询结果中的分页信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PagingInfo {
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PagingInfo {
    pub fn new(paging: &Paging, total_items: u64) -> Self {
        let total_pages = if paging.is_paged() {
            total_items.div_ceil(u64::from(paging.page_size))
        } else if total_items > 0 {
            1
        } else {
            0
        };

        Self {
            page: paging.page,
            size: paging.page_size,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_default_is_nil() {
        assert!(CorrelationId::default().is_default());
        assert!(!CorrelationId::new().is_default());
    }

    #[test]
    fn test_correlation_id_roundtrips_through_string() {
        let id = CorrelationId::new();
        let parsed = CorrelationId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_paging_offset() {
        assert_eq!(Paging::new(1, 20).offset(), 0);
        assert_eq!(Paging::new(3, 20).offset(), 40);
        assert_eq!(Paging::new(0, 20).offset(), 0);
    }

    #[test]
    fn test_paging_offset_of_last_page_does_not_overflow() {
        let last = Paging::new(u32::MAX, u32::MAX);
        assert_eq!(last.offset(), u64::from(u32::MAX - 1) * u64::from(u32::MAX));
        assert_eq!(Paging::new(u32::MAX, 100).offset(), u64::from(u32::MAX - 1) * 100);
        assert!(!Paging::not_paged().is_paged());
    }

    #[test]
    fn test_paging_info_total_pages() {
        let info = PagingInfo::new(&Paging::new(2, 10), 25);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.page, 2);
        assert_eq!(info.size, 10);

        let unpaged = PagingInfo::new(&Paging::not_paged(), 25);
        assert_eq!(unpaged.total_pages, 1);

        let empty = PagingInfo::new(&Paging::not_paged(), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_paging_info_page_count_beyond_u32() {
        let info = PagingInfo::new(&Paging::new(1, 1), u64::from(u32::MAX) + 10);
        assert_eq!(info.total_pages, u64::from(u32::MAX) + 10);
    }

    #[test]
    fn test_sorting_serializes() {
        let json = serde_json::to_string(&Sorting::descending("name")).unwrap();
        assert_eq!(json, r#"{"field":"name","direction":"Descending"}"#);
    }
}
