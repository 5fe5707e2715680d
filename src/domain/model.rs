use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type CompanyId = i64;
pub type OrderId = i64;

/// 分頁結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page_no: u32,
    pub page_size: u32,
    pub data: Vec<T>,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn new(page_no: u32, page_size: u32, data: Vec<T>, count: u64) -> Self {
        Self {
            page_no,
            page_size,
            data,
            count,
        }
    }

    /// 轉換記錄類型，分頁資訊保持不變
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            page_no: self.page_no,
            page_size: self.page_size,
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 分頁訂單查詢條件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageOrderConditionQuery {
    pub page_no: u32,
    pub page_size: u32,
    pub order_ids: Vec<OrderId>,
    pub order_nos: Vec<String>,
    pub order_sources: Vec<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl Default for PageOrderConditionQuery {
    fn default() -> Self {
        Self {
            page_no: 1,
            page_size: 20,
            order_ids: Vec::new(),
            order_nos: Vec::new(),
            order_sources: Vec::new(),
            created_from: None,
            created_to: None,
        }
    }
}

impl PageOrderConditionQuery {
    pub fn page(page_no: u32, page_size: u32) -> Self {
        Self {
            page_no,
            page_size,
            ..Default::default()
        }
    }

    /// 0-based offset of the first record on this page
    pub fn offset(&self) -> usize {
        (self.page_no.max(1) as usize - 1) * self.page_size as usize
    }
}

/// 訂單簡要資訊，倉儲層的最小投影
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSimple {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub order_no: String,
    pub order_source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemSimple {
    pub item_id: i64,
    pub order_id: OrderId,
    pub sku_code: String,
    pub goods_name: String,
    pub quantity: u32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: i64,
    pub order_id: OrderId,
    pub sku_code: String,
    pub goods_name: String,
    pub quantity: u32,
    /// 單價，單位：分
    pub unit_price: i64,
}

impl From<OrderItemSimple> for OrderItem {
    fn from(item: OrderItemSimple) -> Self {
        Self {
            item_id: item.item_id,
            order_id: item.order_id,
            sku_code: item.sku_code,
            goods_name: item.goods_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// 訂單領域模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub order_no: String,
    pub order_source: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    /// 各領域處理器填充的部分資訊，例如物流、申報
    pub sections: BTreeMap<String, serde_json::Value>,
    /// 平台與公司特性處理結果
    pub features: BTreeMap<String, serde_json::Value>,
}

impl From<OrderSimple> for Order {
    fn from(simple: OrderSimple) -> Self {
        Self {
            company_id: simple.company_id,
            order_id: simple.order_id,
            order_no: simple.order_no,
            order_source: simple.order_source,
            created_at: simple.created_at,
            items: Vec::new(),
            sections: BTreeMap::new(),
            features: BTreeMap::new(),
        }
    }
}

impl Order {
    pub fn section(&self, key: &str) -> Option<&serde_json::Value> {
        self.sections.get(key)
    }

    pub fn feature(&self, key: &str) -> Option<&serde_json::Value> {
        self.features.get(key)
    }

    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |total, i| total.saturating_add(u64::from(i.quantity)))
    }

    /// 訂單金額（分），溢出時返回 None
    pub fn order_amount(&self) -> Option<i64> {
        self.items.iter().try_fold(0i64, |total, i| {
            i.unit_price
                .checked_mul(i64::from(i.quantity))
                .and_then(|amount| total.checked_add(amount))
        })
    }
}

/// 處理器產出的補充資訊，按訂單ID合併回訂單
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub key: String,
    pub values: HashMap<OrderId, serde_json::Value>,
}

impl Enrichment {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, order_id: OrderId, value: serde_json::Value) -> Self {
        self.values.insert(order_id, value);
        self
    }

    pub fn insert(&mut self, order_id: OrderId, value: serde_json::Value) {
        self.values.insert(order_id, value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 物流資訊
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsInfo {
    pub order_id: OrderId,
    pub carrier: String,
    pub tracking_no: String,
    pub shipped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeclarationStatus {
    Pending,
    Submitted,
    Cleared,
    Rejected,
}

/// 申報資訊
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationInfo {
    pub order_id: OrderId,
    pub status: DeclarationStatus,
    pub declaration_no: Option<String>,
}
