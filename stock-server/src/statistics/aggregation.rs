//! Sales Aggregation Engine
//!
//! Reads both channels inside one read transaction, so the numbers come
//! from a single snapshot. Never writes.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::models::{ChannelTotal, CombinedSalesStats, PeriodSales, StatsPeriod, TopProduct};
use sqlx::SqlitePool;

use super::time_range::{TimeWindow, bucket_label, resolve_window};
use crate::db::repository::{catalog, sales};
use crate::inventory::LedgerError;
use crate::money::{to_decimal, to_f64};
use crate::utils::time::today;

/// Size of the product ranking
const TOP_PRODUCTS: usize = 10;

#[derive(Default)]
struct Bucket {
    web_amount: Decimal,
    web_count: i64,
    pos_amount: Decimal,
    pos_count: i64,
}

#[derive(Default)]
struct ProductTotals {
    web_quantity: i64,
    web_sales: Decimal,
    pos_quantity: i64,
    pos_sales: Decimal,
}

impl ProductTotals {
    fn total_sales(&self) -> Decimal {
        self.web_sales + self.pos_sales
    }
}

fn channel_total(rows: &[sales::SaleRow]) -> (Decimal, i64) {
    let amount = rows.iter().map(|r| to_decimal(r.amount)).sum();
    (amount, rows.len() as i64)
}

fn to_total(amount: Decimal, count: i64) -> ChannelTotal {
    ChannelTotal {
        amount: to_f64(amount),
        count,
    }
}

#[derive(Debug, Clone)]
pub struct SalesAggregator {
    pool: SqlitePool,
    tz: Tz,
}

impl SalesAggregator {
    pub fn new(pool: SqlitePool, tz: Tz) -> Self {
        Self { pool, tz }
    }

    /// Combined stats for a named period or an explicit date range
    pub async fn combined_stats(
        &self,
        period: Option<StatsPeriod>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<CombinedSalesStats, LedgerError> {
        let window = resolve_window(period, start_date, end_date, today(self.tz), self.tz)?;
        self.stats_for_window(window).await
    }

    pub async fn stats_for_window(
        &self,
        window: TimeWindow,
    ) -> Result<CombinedSalesStats, LedgerError> {
        let TimeWindow {
            start,
            end,
            granularity,
        } = window;

        let mut tx = self.pool.begin().await?;
        let web_rows = sales::web_sales(&mut tx, start, end).await?;
        let pos_rows = sales::pos_sales(&mut tx, start, end).await?;
        let web_products = sales::web_product_sales(&mut tx, start, end).await?;
        let pos_products = sales::pos_product_sales(&mut tx, start, end).await?;

        let mut products: HashMap<i64, ProductTotals> = HashMap::new();
        for row in &web_products {
            let entry = products.entry(row.product_id).or_default();
            entry.web_quantity += row.quantity;
            entry.web_sales += to_decimal(row.revenue);
        }
        for row in &pos_products {
            let entry = products.entry(row.product_id).or_default();
            entry.pos_quantity += row.quantity;
            entry.pos_sales += to_decimal(row.revenue);
        }
        let mut ranked: Vec<(i64, ProductTotals)> = products.into_iter().collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| {
            b.total_sales()
                .cmp(&a.total_sales())
                .then_with(|| a_id.cmp(b_id))
        });
        ranked.truncate(TOP_PRODUCTS);

        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
        let products: HashMap<i64, _> = catalog::find_products(&mut *tx, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        tx.commit().await?;

        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
        for row in &web_rows {
            let bucket = buckets
                .entry(bucket_label(row.created_at, granularity, self.tz))
                .or_default();
            bucket.web_amount += to_decimal(row.amount);
            bucket.web_count += 1;
        }
        for row in &pos_rows {
            let bucket = buckets
                .entry(bucket_label(row.created_at, granularity, self.tz))
                .or_default();
            bucket.pos_amount += to_decimal(row.amount);
            bucket.pos_count += 1;
        }
        let sales_by_period = buckets
            .into_iter()
            .map(|(period, b)| PeriodSales {
                period,
                web_amount: to_f64(b.web_amount),
                web_count: b.web_count,
                pos_amount: to_f64(b.pos_amount),
                pos_count: b.pos_count,
                total_amount: to_f64(b.web_amount + b.pos_amount),
                total_count: b.web_count + b.pos_count,
            })
            .collect();

        let top_products = ranked
            .into_iter()
            .map(|(product_id, t)| {
                let product = products.get(&product_id);
                TopProduct {
                    product_id,
                    name: product
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| format!("Product {product_id}")),
                    image: product.and_then(|p| p.image.clone()),
                    web_quantity: t.web_quantity,
                    web_sales: to_f64(t.web_sales),
                    pos_quantity: t.pos_quantity,
                    pos_sales: to_f64(t.pos_sales),
                    total_quantity: t.web_quantity + t.pos_quantity,
                    total_sales: to_f64(t.total_sales()),
                }
            })
            .collect();

        let (web_amount, web_count) = channel_total(&web_rows);
        let (pos_amount, pos_count) = channel_total(&pos_rows);
        tracing::debug!(start, end, web_count, pos_count, "Combined sales stats computed");

        Ok(CombinedSalesStats {
            start,
            end,
            granularity,
            web_total: to_total(web_amount, web_count),
            pos_total: to_total(pos_amount, pos_count),
            combined_total: to_total(web_amount + pos_amount, web_count + pos_count),
            sales_by_period,
            top_products,
        })
    }
}
