use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::{problems, Problem};

pub static FEE_COLLECTION_NAME: &str = "fees";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum FeeStatus {
    Paid,
    Pending,
    Overdue,
}

impl std::fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeStatus::Paid => write!(f, "Paid"),
            FeeStatus::Pending => write!(f, "Pending"),
            FeeStatus::Overdue => write!(f, "Overdue"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub student: Uuid,
    pub class: Uuid,
    pub title: String,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    pub status: FeeStatus,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Fee {
    /// Marks the fee paid, recording the payment trail. Paying twice is a
    /// conflict.
    pub fn record_payment(
        &mut self,
        method: impl Into<String>,
        transaction_id: Option<String>,
    ) -> Result<(), Problem> {
        if self.status == FeeStatus::Paid {
            return Err(problems::conflict("Fee is already paid."));
        }
        self.status = FeeStatus::Paid;
        self.payment_date = Some(Utc::now());
        self.payment_method = Some(method.into());
        self.transaction_id = transaction_id;
        Ok(())
    }
}

/// Collection-wide totals for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStats {
    pub total_amount: f64,
    pub collected_amount: f64,
    pub pending_amount: f64,
    pub paid_count: u64,
    pub pending_count: u64,
    pub overdue_count: u64,
}

impl FeeStats {
    pub fn tally(fees: &[Fee]) -> FeeStats {
        let mut stats = FeeStats::default();
        for fee in fees {
            stats.total_amount += fee.amount;
            match fee.status {
                FeeStatus::Paid => {
                    stats.collected_amount += fee.amount;
                    stats.paid_count += 1;
                }
                FeeStatus::Pending => {
                    stats.pending_amount += fee.amount;
                    stats.pending_count += 1;
                }
                FeeStatus::Overdue => {
                    stats.pending_amount += fee.amount;
                    stats.overdue_count += 1;
                }
            }
        }
        stats
    }
}

#[allow(async_fn_in_trait)]
pub trait FeeDbExt {
    async fn create_fee(&self, fee: &Fee) -> Result<(), Problem>;
    async fn require_fee(&self, id: Uuid) -> Result<Fee, Problem>;
    async fn list_fees(&self, query: Document) -> Result<Vec<Fee>, Problem>;
    async fn save_fee(&self, fee: &Fee) -> Result<(), Problem>;
    async fn fee_stats(&self) -> Result<FeeStats, Problem>;
    async fn delete_fee(&self, id: Uuid) -> Result<Option<Fee>, Problem>;
}

impl FeeDbExt for Database {
    async fn create_fee(&self, fee: &Fee) -> Result<(), Problem> {
        self.collection::<Fee>(FEE_COLLECTION_NAME)
            .insert_one(fee, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn require_fee(&self, id: Uuid) -> Result<Fee, Problem> {
        self.collection::<Fee>(FEE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Fee", id))
    }

    async fn list_fees(&self, query: Document) -> Result<Vec<Fee>, Problem> {
        let mut cursor = self
            .collection::<Fee>(FEE_COLLECTION_NAME)
            .find(query, None)
            .await
            .map_err(Problem::from)?;

        let mut fees = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(fee) => fees.push(fee),
                Err(_) => tracing::warn!("unable to deserialize Fee document"),
            }
        }

        Ok(fees)
    }

    async fn save_fee(&self, fee: &Fee) -> Result<(), Problem> {
        self.collection::<Fee>(FEE_COLLECTION_NAME)
            .replace_one(filter::by_id(fee.id), fee, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn fee_stats(&self) -> Result<FeeStats, Problem> {
        let fees = self.list_fees(doc! {}).await?;
        Ok(FeeStats::tally(&fees))
    }

    async fn delete_fee(&self, id: Uuid) -> Result<Option<Fee>, Problem> {
        self.collection::<Fee>(FEE_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee(amount: f64, status: FeeStatus) -> Fee {
        Fee {
            id: Uuid::new_v4(),
            student: Uuid::new_v4(),
            class: Uuid::new_v4(),
            title: "Term fee".into(),
            amount,
            due_date: Utc::now(),
            status,
            payment_date: None,
            payment_method: None,
            transaction_id: None,
            created: Utc::now(),
        }
    }

    #[test]
    fn stats_split_collected_and_pending() {
        let stats = FeeStats::tally(&[
            fee(100.0, FeeStatus::Paid),
            fee(250.0, FeeStatus::Pending),
            fee(50.0, FeeStatus::Overdue),
        ]);

        assert_eq!(stats.total_amount, 400.0);
        assert_eq!(stats.collected_amount, 100.0);
        assert_eq!(stats.pending_amount, 300.0);
        assert_eq!(stats.paid_count, 1);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.overdue_count, 1);
    }

    #[test]
    fn double_payment_is_a_conflict() {
        let mut pending = fee(100.0, FeeStatus::Pending);

        pending.record_payment("Cash", None).unwrap();
        assert_eq!(pending.status, FeeStatus::Paid);
        assert!(pending.payment_date.is_some());

        let problem = pending.record_payment("Cash", None).unwrap_err();
        assert_eq!(problem.status.code, 409);
    }
}
