use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{tables, SupabaseClient};

use crate::models::{
    CreateTransactionRequest, FinanceError, FinancialSummary, Transaction, TransactionQuery, TransactionType,
    DEFAULT_CATEGORY, DEFAULT_PAYMENT_METHOD,
};

/// Revenue, expenses and their difference over the given rows. Pending
/// entries count as well.
pub fn summarize(transactions: &[Transaction]) -> FinancialSummary {
    let (revenue, expenses) = transactions.iter().fold((0.0, 0.0), |(rev, exp), t| match t.kind {
        TransactionType::Income => (rev + t.amount, exp),
        TransactionType::Expense => (rev, exp + t.amount),
    });

    FinancialSummary {
        revenue,
        expenses,
        balance: revenue - expenses,
        transactions: transactions.len(),
    }
}

pub fn new_transaction_row(request: CreateTransactionRequest) -> Result<Value, FinanceError> {
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(FinanceError::ValidationError("Amount must be greater than zero".to_string()));
    }

    Ok(json!({
        "psychologist_id": request.psychologist_id,
        "type": request.kind,
        "category": request.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        "amount": request.amount,
        "date": request.date.unwrap_or_else(|| Utc::now().date_naive()),
        "description": request.description.filter(|d| !d.trim().is_empty()),
        "status": request.status,
        "payment_method": request.payment_method.unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
    }))
}

pub struct FinanceService {
    supabase: Arc<SupabaseClient>,
}

impl FinanceService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Newest first, optionally limited to one clinician.
    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
        auth_token: &str,
    ) -> Result<Vec<Transaction>, FinanceError> {
        let mut filter = String::from("order=date.desc");
        if let Some(psychologist_id) = query.psychologist_id {
            filter.push_str(&format!("&psychologist_id=eq.{}", psychologist_id));
        }

        let transactions = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Transaction>(tables::TRANSACTIONS, &filter, Some(auth_token)))
            .await?;

        debug!("Fetched {} transactions", transactions.len());
        Ok(transactions)
    }

    pub async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
        auth_token: &str,
    ) -> Result<Transaction, FinanceError> {
        let row = new_transaction_row(request)?;

        let transaction: Transaction = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert(tables::TRANSACTIONS, row.clone(), Some(auth_token)))
            .await?;

        info!(
            "Transaction {} recorded: {:?} of {:.2}",
            transaction.id, transaction.kind, transaction.amount
        );
        Ok(transaction)
    }

    pub async fn delete_transaction(&self, transaction_id: Uuid, auth_token: &str) -> Result<(), FinanceError> {
        let filter = format!("id=eq.{}", transaction_id);

        self.supabase
            .retry_policy()
            .execute(|| self.supabase.delete(tables::TRANSACTIONS, &filter, Some(auth_token)))
            .await?;

        info!("Transaction {} deleted", transaction_id);
        Ok(())
    }

    pub async fn summary(&self, query: &TransactionQuery, auth_token: &str) -> Result<FinancialSummary, FinanceError> {
        let transactions = self.list_transactions(query, auth_token).await?;
        Ok(summarize(&transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionStatus;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn tx(kind: TransactionType, amount: f64) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            psychologist_id: None,
            kind,
            category: None,
            amount,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: None,
            status: TransactionStatus::Paid,
            payment_method: None,
            created_at: None,
        }
    }

    #[test]
    fn test_summary_balances_income_minus_expenses() {
        let rows = vec![
            tx(TransactionType::Income, 200.0),
            tx(TransactionType::Income, 150.0),
            tx(TransactionType::Expense, 80.0),
        ];
        let summary = summarize(&rows);

        assert_eq!(summary.revenue, 350.0);
        assert_eq!(summary.expenses, 80.0);
        assert_eq!(summary.balance, 270.0);
        assert_eq!(summary.transactions, 3);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(summarize(&[]), FinancialSummary::default());
    }

    #[test]
    fn test_amount_must_be_positive() {
        for amount in [0.0, -10.0, f64::NAN] {
            let request = CreateTransactionRequest {
                psychologist_id: None,
                kind: TransactionType::Expense,
                category: None,
                amount,
                date: None,
                description: None,
                status: TransactionStatus::Paid,
                payment_method: None,
            };
            assert_matches!(new_transaction_row(request), Err(FinanceError::ValidationError(_)));
        }
    }
}
