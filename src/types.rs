use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};

/// longest term any loan may carry (one hundred years)
pub const MAX_TERM_WEEKS: u32 = 5_200;

/// identifier assigned to a loan by the document store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(String);

impl LoanId {
    pub fn new(id: impl Into<String>) -> Self {
        LoanId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LoanId {
    fn from(s: String) -> Self {
        LoanId(s)
    }
}

impl From<&str> for LoanId {
    fn from(s: &str) -> Self {
        LoanId::new(s)
    }
}

/// the viewer's side of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanRole {
    /// viewer is the lender and receives payments
    Owned,
    /// viewer is the borrower and makes payments
    Owed,
}

/// how loan completion is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBasis {
    /// one recorded payment per scheduled week
    #[default]
    PaymentCount,
    /// remaining balance at or below zero
    Balance,
}

/// a recorded weekly installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub week_number: u32,
    pub amount: Money,
}

impl Payment {
    pub fn new(week_number: u32, amount: Money) -> Self {
        Self { week_number, amount }
    }
}

/// a lending agreement as seen by the current viewer
///
/// Derived values (balance, installment, totals) are never stored here; the
/// calculator recomputes them from these fields on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub principal_amount: Money,
    pub interest_rate: Rate,
    pub term_weeks: u32,
    pub role: LoanRole,
    #[serde(default)]
    pub payments_made: Vec<Payment>,
    /// date the loan was funded; week `n` falls due `7 * n` days later
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

impl Loan {
    /// create a validated loan with no recorded payments
    pub fn new(
        id: impl Into<LoanId>,
        principal_amount: Money,
        interest_rate: Rate,
        term_weeks: u32,
        role: LoanRole,
    ) -> Result<Self> {
        let loan = Self {
            id: id.into(),
            principal_amount,
            interest_rate,
            term_weeks,
            role,
            payments_made: Vec::new(),
            start_date: None,
        };
        loan.validate()?;
        Ok(loan)
    }

    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn is_owned(&self) -> bool {
        self.role == LoanRole::Owned
    }

    pub fn is_owed(&self) -> bool {
        self.role == LoanRole::Owed
    }

    /// date week `week` falls due; `None` when the loan has no start date
    pub fn due_date(&self, week: u32) -> Result<Option<DateTime<Utc>>> {
        let Some(start) = self.start_date else {
            return Ok(None);
        };

        start
            .checked_add_signed(Duration::weeks(i64::from(week)))
            .map(Some)
            .ok_or_else(|| LendingError::CalculationError {
                message: format!("week {} of loan {} falls due out of range", week, self.id),
            })
    }

    /// check the source fields and every recorded payment
    pub fn validate(&self) -> Result<()> {
        validate_terms(self.principal_amount, self.interest_rate, self.term_weeks)?;
        self.due_date(self.term_weeks)?;

        for payment in &self.payments_made {
            if payment.week_number == 0 || payment.week_number > self.term_weeks {
                return Err(LendingError::InvalidPaymentWeek {
                    loan_id: self.id.clone(),
                    week_number: payment.week_number as i64,
                    term_weeks: self.term_weeks,
                });
            }
            if payment.amount.is_negative() {
                return Err(LendingError::InvalidPaymentAmount {
                    loan_id: self.id.clone(),
                    amount: payment.amount,
                });
            }
        }

        Ok(())
    }
}

/// check principal, rate and term before any division by the term
pub fn validate_terms(principal: Money, rate: Rate, term_weeks: u32) -> Result<()> {
    if term_weeks == 0 || term_weeks > MAX_TERM_WEEKS {
        return Err(LendingError::InvalidTerm {
            term_weeks: i64::from(term_weeks),
        });
    }
    if !principal.is_positive() {
        return Err(LendingError::InvalidPrincipal { principal });
    }
    if rate.is_negative() {
        return Err(LendingError::InvalidInterestRate { rate });
    }
    Ok(())
}

/// builder for loans
#[derive(Debug, Default)]
pub struct LoanBuilder {
    id: Option<LoanId>,
    principal: Option<Money>,
    rate: Option<Rate>,
    term_weeks: Option<u32>,
    role: Option<LoanRole>,
    payments: Vec<Payment>,
    start_date: Option<DateTime<Utc>>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<LoanId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn term_weeks(mut self, weeks: u32) -> Self {
        self.term_weeks = Some(weeks);
        self
    }

    pub fn role(mut self, role: LoanRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn owned(self) -> Self {
        self.role(LoanRole::Owned)
    }

    pub fn owed(self) -> Self {
        self.role(LoanRole::Owed)
    }

    pub fn payment(mut self, week_number: u32, amount: Money) -> Self {
        self.payments.push(Payment::new(week_number, amount));
        self
    }

    pub fn start_date(mut self, date: DateTime<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn build(self) -> Result<Loan> {
        let principal = self.principal.ok_or(LendingError::InvalidConfiguration {
            message: "principal is required".to_string(),
        })?;
        let term_weeks = self.term_weeks.ok_or(LendingError::InvalidConfiguration {
            message: "term in weeks is required".to_string(),
        })?;
        let role = self.role.ok_or(LendingError::InvalidConfiguration {
            message: "role is required".to_string(),
        })?;

        let loan = Loan {
            id: self.id.unwrap_or_else(|| LoanId::new("")),
            principal_amount: principal,
            interest_rate: self.rate.unwrap_or(Rate::ZERO),
            term_weeks,
            role,
            payments_made: self.payments,
            start_date: self.start_date,
        };
        loan.validate()?;
        Ok(loan)
    }
}
