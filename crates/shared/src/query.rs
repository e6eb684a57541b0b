//! 购买记录查询模型
//!
//! 网关在转发前、管理服务在查询前都用同一套规则校验分页参数，
//! 非法参数在边界直接拒绝，不会到达存储层。

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// 按事件时间排序的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::new("sort", "只能是 asc 或 desc")),
        }
    }
}

/// 过滤条件，两个字段同时存在时按 AND 组合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseFilter {
    pub userid: Option<String>,
    pub username: Option<String>,
}

impl PurchaseFilter {
    /// 空白值视为未指定，其余去除首尾空白
    pub fn new(userid: Option<&str>, username: Option<&str>) -> Self {
        Self {
            userid: non_blank(userid),
            username: non_blank(username),
        }
    }

    pub fn by_userid(userid: &str) -> Self {
        Self::new(Some(userid), None)
    }

    pub fn matches(&self, userid: &str, username: &str) -> bool {
        self.userid.as_deref().is_none_or(|u| u == userid)
            && self.username.as_deref().is_none_or(|n| n == username)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// HTTP 查询串的原始形式
///
/// 数值字段先按字符串接收，非法取值能得到统一格式的校验错误。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseQueryParams {
    pub userid: Option<String>,
    pub username: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort: Option<String>,
}

/// 校验后的查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseQuery {
    pub filter: PurchaseFilter,
    pub limit: i64,
    pub offset: i64,
    pub sort: SortOrder,
}

impl Default for PurchaseQuery {
    fn default() -> Self {
        Self {
            filter: PurchaseFilter::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: SortOrder::default(),
        }
    }
}

impl TryFrom<PurchaseQueryParams> for PurchaseQuery {
    type Error = ValidationError;

    fn try_from(params: PurchaseQueryParams) -> Result<Self, Self::Error> {
        // 参数一旦出现就必须合法，空串同样拒绝
        let limit = match params.limit.as_deref() {
            None => DEFAULT_LIMIT,
            Some(raw) => {
                let limit: i64 = raw
                    .parse()
                    .map_err(|_| ValidationError::new("limit", "必须是整数"))?;
                if !(1..=MAX_LIMIT).contains(&limit) {
                    return Err(ValidationError::new(
                        "limit",
                        format!("必须在 1 到 {MAX_LIMIT} 之间"),
                    ));
                }
                limit
            }
        };

        let offset = match params.offset.as_deref() {
            None => 0,
            Some(raw) => {
                let offset: i64 = raw
                    .parse()
                    .map_err(|_| ValidationError::new("offset", "必须是整数"))?;
                if offset < 0 {
                    return Err(ValidationError::new("offset", "不能为负数"));
                }
                offset
            }
        };

        let sort = match params.sort.as_deref() {
            None => SortOrder::default(),
            Some(raw) => raw.parse()?,
        };

        Ok(Self {
            filter: PurchaseFilter::new(params.userid.as_deref(), params.username.as_deref()),
            limit,
            offset,
            sort,
        })
    }
}

impl PurchaseQuery {
    /// 转回查询串参数（网关转发时使用）
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(userid) = &self.filter.userid {
            pairs.push(("userid", userid.clone()));
        }
        if let Some(username) = &self.filter.username {
            pairs.push(("username", username.clone()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs.push(("sort", self.sort.as_str().to_string()));
        pairs
    }
}

/// 分页元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64, page_len: usize) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(page_len as i64) < total,
        }
    }
}

/// 一页查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasePage<T> {
    pub records: Vec<T>,
    pub pagination: Pagination,
}
