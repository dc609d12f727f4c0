use serde::{Deserialize, Serialize};

/// Product as seen through the catalogue API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

/// One order line: which product and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// PATCH /products/{id}/stock 的请求体，quantity 为增量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDelta {
    pub quantity: i64,
}

/// Total requested quantity per product, in first-seen order. Duplicate
/// lines for the same product are summed.
pub fn requested_totals(items: &[LineItem]) -> Vec<(&str, u64)> {
    let mut totals: Vec<(&str, u64)> = Vec::with_capacity(items.len());
    for item in items {
        match totals.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, total)) => *total += u64::from(item.quantity),
            None => totals.push((&item.product_id, u64::from(item.quantity))),
        }
    }
    totals
}
