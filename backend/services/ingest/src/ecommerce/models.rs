use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{lenient_f64, lenient_u64, mean, round2, safe_div, top_n_by};

const TOP_PRODUCTS: usize = 10;

/// An order from the storefront API (`GET /orders`).
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_price: f64,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub quantity: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: Option<u64>,
    pub title: String,
    pub quantity: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub orders: u64,
    pub revenue: f64,
}

/// Normalized storefront metrics for one day or one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcommerceMetrics {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub average_order_value: f64,
    pub total_items_sold: u64,
    pub unique_customers: u64,
    pub top_products: Vec<ProductSales>,
    pub daily_revenue: Vec<DailyRevenue>,
}

impl EcommerceMetrics {
    /// Build metrics from the orders whose `financial_status` is accepted.
    ///
    /// Returns `None` when no accepted order remains.
    pub fn from_orders(orders: &[Order], accepted_statuses: &[String]) -> Option<Self> {
        let accepted: Vec<&Order> = orders
            .iter()
            .filter(|o| {
                o.financial_status
                    .as_deref()
                    .is_some_and(|s| accepted_statuses.iter().any(|a| a.eq_ignore_ascii_case(s)))
            })
            .collect();

        if accepted.is_empty() {
            return None;
        }

        let mut days: BTreeMap<NaiveDate, DailyRevenue> = BTreeMap::new();
        let mut customers = HashSet::new();
        let mut total_items_sold = 0;

        let mut products: Vec<ProductSales> = Vec::new();
        let mut product_index: HashMap<String, usize> = HashMap::new();

        for order in &accepted {
            let date = order.created_at.date_naive();
            let day = days.entry(date).or_insert(DailyRevenue {
                date,
                orders: 0,
                revenue: 0.0,
            });
            day.orders += 1;
            day.revenue += order.total_price;

            if let Some(customer) = &order.customer {
                customers.insert(customer.id.to_string());
            }

            for item in &order.line_items {
                total_items_sold += item.quantity;

                let key = item
                    .product_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| format!("title:{}", item.title));
                let idx = *product_index.entry(key).or_insert_with(|| {
                    products.push(ProductSales {
                        product_id: item.product_id,
                        title: item.title.clone(),
                        quantity: 0,
                        revenue: 0.0,
                    });
                    products.len() - 1
                });
                products[idx].quantity += item.quantity;
                products[idx].revenue += item.price * item.quantity as f64;
            }
        }

        for day in days.values_mut() {
            day.revenue = round2(day.revenue);
        }
        for product in &mut products {
            product.revenue = round2(product.revenue);
        }

        let total_orders: u64 = days.values().map(|d| d.orders).sum();
        let total_revenue: f64 = days.values().map(|d| d.revenue).sum();
        // Rate fields average the per-day values over days that had orders.
        let average_order_value = mean(
            days.values()
                .map(|d| safe_div(d.revenue, d.orders as f64)),
        );

        Some(Self {
            total_orders,
            total_revenue: round2(total_revenue),
            average_order_value: round2(average_order_value),
            total_items_sold,
            unique_customers: customers.len() as u64,
            top_products: top_n_by(products, TOP_PRODUCTS, |p| p.revenue),
            daily_revenue: days.into_values().collect(),
        })
    }
}
