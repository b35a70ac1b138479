//! Combined Sales Statistics

use serde::{Deserialize, Serialize};

/// Named reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Today,
    Week,
    Month,
    Year,
}

/// Chart bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Month,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelTotal {
    pub amount: f64,
    pub count: i64,
}

/// One chart bucket, split by channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSales {
    /// `YYYY-MM-DD HH:00`, `YYYY-MM-DD` or `YYYY-MM`
    pub period: String,
    pub web_amount: f64,
    pub web_count: i64,
    pub pos_amount: f64,
    pub pos_count: i64,
    pub total_amount: f64,
    pub total_count: i64,
}

/// Cross-channel product ranking entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub web_quantity: i64,
    pub web_sales: f64,
    pub pos_quantity: i64,
    pub pos_sales: f64,
    pub total_quantity: i64,
    pub total_sales: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSalesStats {
    /// Window start (Unix millis, inclusive)
    pub start: i64,
    /// Window end (Unix millis, exclusive)
    pub end: i64,
    pub granularity: Granularity,
    pub web_total: ChannelTotal,
    pub pos_total: ChannelTotal,
    pub combined_total: ChannelTotal,
    pub sales_by_period: Vec<PeriodSales>,
    pub top_products: Vec<TopProduct>,
}
