// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Finance transactions recorded by `tally add`.
//!
//! A [`TransactionDraft`] holds raw user input. [`TransactionDraft::build`]
//! validates and normalizes it into a [`Transaction`], which becomes the
//! body of a `transaction.create` mutation.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use tally_core::MutationPayload;

use crate::error::{Error, Result};

/// Mutation kind for new transactions.
pub const CREATE_KIND: &str = "transaction.create";

/// Maximum digits after the decimal point.
const MAX_FRACTION_DIGITS: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
    Transfer,
}

/// Unvalidated transaction input.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    pub account: String,
    pub amount: String,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub currency: String,
    /// `YYYY-MM-DD`, or `None` for today.
    pub date: Option<String>,
    pub note: Option<String>,
    /// Destination account, transfers only.
    pub to_account: Option<String>,
}

/// A validated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_account: Option<String>,
    pub kind: TransactionKind,
    /// Normalized decimal string, e.g. `12.5` or `1200`.
    pub amount: String,
    pub currency: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TransactionDraft {
    /// Validates the draft. `today` fills in a missing date.
    pub fn build(&self, today: NaiveDate) -> Result<Transaction> {
        let account = non_empty(&self.account, "account")?;
        let to_account = match (self.kind, &self.to_account) {
            (TransactionKind::Transfer, Some(to)) => Some(non_empty(to, "to account")?),
            (TransactionKind::Transfer, None) => {
                return Err(Error::FieldEmpty {
                    field: "to account",
                })
            }
            (_, Some(_)) => {
                return Err(Error::InvalidPayload(
                    "--to is only valid for transfers".to_string(),
                ))
            }
            (_, None) => None,
        };
        if to_account.as_deref() == Some(account.as_str()) {
            return Err(Error::InvalidPayload(
                "cannot transfer to the same account".to_string(),
            ));
        }

        Ok(Transaction {
            account,
            to_account,
            kind: self.kind,
            amount: parse_amount(&self.amount)?,
            currency: parse_currency(&self.currency)?,
            date: match &self.date {
                Some(date) => parse_date(date)?,
                None => today,
            },
            category: optional(&self.category),
            note: optional(&self.note),
        })
    }
}

impl Transaction {
    pub fn into_payload(self) -> Result<MutationPayload> {
        let body = serde_json::to_value(&self)?;
        Ok(MutationPayload::new(CREATE_KIND, body)?)
    }
}

fn non_empty(value: &str, field: &'static str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::FieldEmpty { field });
    }
    Ok(trimmed.to_string())
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parses a positive decimal amount and returns it normalized.
///
/// Leading zeros and trailing fractional zeros are dropped; `007.50`
/// becomes `7.5`.
pub fn parse_amount(input: &str) -> Result<String> {
    let invalid = |reason: &'static str| Error::InvalidAmount {
        value: input.to_string(),
        reason,
    };

    let value = input.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    if value.starts_with('-') {
        return Err(invalid("must be greater than zero"));
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid("not a decimal number"));
    }
    if value.ends_with('.') && fraction.is_empty() {
        return Err(invalid("not a decimal number"));
    }
    if fraction.len() > MAX_FRACTION_DIGITS {
        return Err(invalid("at most 4 decimal places"));
    }

    let whole = whole.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("must be greater than zero"));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    Ok(if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    })
}

/// Parses a three-letter currency code, uppercased.
pub fn parse_currency(input: &str) -> Result<String> {
    let code = input.trim();
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(Error::InvalidCurrency(input.to_string()))
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(input.to_string()))
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
