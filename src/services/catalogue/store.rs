use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::CatalogueError;

// 目录服务中的商品记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: u32,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityRequest {
    pub id: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// In-memory product table. Stock changes are applied under the entry's
/// write lock, so a decrement either fully applies or is rejected.
#[derive(Debug, Clone, Default)]
pub struct CatalogueStore {
    products: Arc<DashMap<String, CatalogueProduct>>,
}

impl CatalogueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, new: NewProduct) -> Result<CatalogueProduct, CatalogueError> {
        if new.name.trim().is_empty() {
            return Err(CatalogueError::Validation("Product name cannot be empty".to_string()));
        }
        if !new.price.is_finite() || new.price < 0.0 {
            return Err(CatalogueError::Validation("Product price cannot be negative".to_string()));
        }

        let now = Utc::now();
        let product = CatalogueProduct {
            id: new.id.unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            category: new.category,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(product.id.clone(), product.clone());

        tracing::info!(product_id = %product.id, stock = product.stock, "Created product");
        Ok(product)
    }

    pub fn get(&self, id: &str) -> Result<CatalogueProduct, CatalogueError> {
        self.products
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CatalogueError::NotFound(id.to_string()))
    }

    pub fn list(&self, filter: &ProductFilter) -> Vec<CatalogueProduct> {
        let mut products: Vec<CatalogueProduct> = self
            .products
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|p| filter.category.as_ref().is_none_or(|c| &p.category == c))
            .filter(|p| filter.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| filter.max_price.is_none_or(|max| p.price <= max))
            .collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }

    /// Applies a signed stock change. Negative deltas are a compare-and-decrement:
    /// rejected without effect if stock would go below zero.
    pub fn update_stock(&self, id: &str, delta: i64) -> Result<CatalogueProduct, CatalogueError> {
        let mut product = self
            .products
            .get_mut(id)
            .ok_or_else(|| CatalogueError::NotFound(id.to_string()))?;

        let next = i64::from(product.stock)
            .checked_add(delta)
            .ok_or_else(|| CatalogueError::Validation(format!("stock overflow: {} + {delta}", product.stock)))?;
        if next < 0 {
            return Err(CatalogueError::InsufficientStock {
                requested: delta.unsigned_abs(),
                available: product.stock,
            });
        }
        product.stock = u32::try_from(next)
            .map_err(|_| CatalogueError::Validation(format!("stock overflow: {next}")))?;
        product.updated_at = Utc::now();

        tracing::debug!(product_id = %id, delta, stock = product.stock, "Updated stock");
        Ok(product.clone())
    }

    /// Partial update; absent fields keep their value.
    pub fn update(&self, id: &str, update: ProductUpdate) -> Result<CatalogueProduct, CatalogueError> {
        if update.name.as_ref().is_some_and(|name| name.trim().is_empty()) {
            return Err(CatalogueError::Validation("Product name cannot be empty".to_string()));
        }
        if update.price.is_some_and(|price| !price.is_finite() || price < 0.0) {
            return Err(CatalogueError::Validation("Product price cannot be negative".to_string()));
        }

        let mut product = self
            .products
            .get_mut(id)
            .ok_or_else(|| CatalogueError::NotFound(id.to_string()))?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        product.updated_at = Utc::now();

        tracing::info!(product_id = %id, "Updated product");
        Ok(product.clone())
    }

    pub fn delete(&self, id: &str) -> Result<(), CatalogueError> {
        self.products
            .remove(id)
            .ok_or_else(|| CatalogueError::NotFound(id.to_string()))?;
        tracing::info!(product_id = %id, "Deleted product");
        Ok(())
    }

    /// True if every requested product exists and its summed quantity fits in
    /// current stock. A read-only check; nothing is reserved.
    pub fn check_availability(&self, requests: &[AvailabilityRequest]) -> bool {
        let mut totals: Vec<(&str, u64)> = Vec::with_capacity(requests.len());
        for request in requests {
            match totals.iter_mut().find(|(id, _)| *id == request.id) {
                Some((_, total)) => *total = total.saturating_add(request.quantity),
                None => totals.push((&request.id, request.quantity)),
            }
        }

        totals.iter().all(|(id, quantity)| {
            self.products
                .get(*id)
                .is_some_and(|product| u64::from(product.stock) >= *quantity)
        })
    }

    // 批量查询，忽略不存在的 id
    pub fn get_many(&self, ids: &[String]) -> Vec<CatalogueProduct> {
        ids.iter()
            .filter_map(|id| self.products.get(id).map(|entry| entry.value().clone()))
            .collect()
    }
}
