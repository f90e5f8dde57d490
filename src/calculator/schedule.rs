use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculator::{loan_installment, payment_for_week};
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::types::{Loan, LoanId};
use crate::warnings::WarningSink;

/// one week of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub week: u32,
    pub due_date: Option<DateTime<Utc>>,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
    pub cumulative_interest: Money,
    pub cumulative_principal: Money,
    /// amount actually recorded for this week, if any
    pub recorded_amount: Option<Money>,
}

/// weekly amortization schedule for a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentSchedule {
    pub loan_id: LoanId,
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_weeks: u32,
    pub weekly_installment: Money,
    pub installments: Vec<ScheduledInstallment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl RepaymentSchedule {
    /// generate the equal-installment schedule
    ///
    /// Interest for a week is the opening balance times the weekly rate,
    /// rounded to cents. The final week settles whatever balance is left, so
    /// its payment can differ from the regular installment by rounding cents.
    pub fn generate(loan: &Loan, warnings: &mut WarningSink) -> Result<Self> {
        let installment = loan_installment(loan)?;
        let weekly_rate = loan.interest_rate.weekly_rate();

        let mut installments = Vec::with_capacity(loan.term_weeks as usize);
        let mut balance = loan.principal_amount;
        let mut cumulative_interest = Money::ZERO;
        let mut cumulative_principal = Money::ZERO;

        for week in 1..=loan.term_weeks {
            let interest_portion = (balance * weekly_rate).round_currency();
            let is_last = week == loan.term_weeks;

            let (payment_amount, principal_portion) = if is_last {
                (balance.checked_add(interest_portion)?, balance)
            } else {
                (installment, installment.checked_sub(interest_portion)?)
            };

            let ending_balance = if is_last {
                Money::ZERO
            } else {
                balance.checked_sub(principal_portion)?
            };

            cumulative_interest = cumulative_interest.checked_add(interest_portion)?;
            cumulative_principal = cumulative_principal.checked_add(principal_portion)?;

            installments.push(ScheduledInstallment {
                week,
                due_date: loan.due_date(week)?,
                beginning_balance: balance,
                payment_amount,
                principal_portion,
                interest_portion,
                ending_balance,
                cumulative_interest,
                cumulative_principal,
                recorded_amount: payment_for_week(loan, week, warnings).map(|p| p.amount),
            });

            balance = ending_balance;
        }

        let total_payment = Money::checked_sum(installments.iter().map(|i| i.payment_amount))?;

        Ok(Self {
            loan_id: loan.id.clone(),
            principal: loan.principal_amount,
            interest_rate: loan.interest_rate,
            term_weeks: loan.term_weeks,
            weekly_installment: installment,
            installments,
            total_interest: cumulative_interest,
            total_payment,
        })
    }

    /// installment for a specific week
    pub fn get_installment(&self, week: u32) -> Option<&ScheduledInstallment> {
        week.checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    /// scheduled balance once `week` has been paid
    pub fn balance_after_week(&self, week: u32) -> Money {
        self.get_installment(week)
            .map(|i| i.ending_balance)
            .unwrap_or(self.principal)
    }

    /// weeks up to `through_week` whose recorded amount is below schedule
    pub fn shortfall_weeks(&self, through_week: u32) -> Vec<u32> {
        self.installments
            .iter()
            .take_while(|i| i.week <= through_week)
            .filter(|i| i.recorded_amount.map_or(true, |paid| paid < i.payment_amount))
            .map(|i| i.week)
            .collect()
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
