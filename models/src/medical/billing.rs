// models/src/medical/billing.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// How an appointment was booked. Decides how much is collected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingChannel {
    /// The patient booked online and pays an advance.
    SelfService,
    /// Front-desk staff booked for a walk-in patient who pays in full.
    StaffAssisted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Online,
    Card,
    Upi,
    Insurance,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Insurance => "insurance",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "online" => Ok(PaymentMethod::Online),
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "insurance" => Ok(PaymentMethod::Insurance),
            other => Err(ValidationError::Message(format!("Unsupported payment method: {}", other))),
        }
    }
}

/// Billing snapshot attached to an appointment.
///
/// The fields are private so that the only ways to change them are
/// [`Billing::for_booking`] and [`Billing::settle`], which keep
/// `paid_amount <= consultation_fee` and `is_paid => paid_amount == consultation_fee`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    consultation_fee: u64,
    is_paid: bool,
    paid_amount: u64,
    paid_at: Option<DateTime<Utc>>,
    payment_method: Option<PaymentMethod>,
}

impl Billing {
    /// Half the fee, rounded half up.
    pub fn advance_for(fee: u64) -> u64 {
        fee / 2 + fee % 2
    }

    pub fn for_booking(consultation_fee: u64, channel: BookingChannel, now: DateTime<Utc>) -> Self {
        match channel {
            BookingChannel::SelfService => Billing {
                consultation_fee,
                is_paid: false,
                paid_amount: Self::advance_for(consultation_fee),
                paid_at: Some(now),
                payment_method: Some(PaymentMethod::Online),
            },
            BookingChannel::StaffAssisted => Billing {
                consultation_fee,
                is_paid: true,
                paid_amount: consultation_fee,
                paid_at: Some(now),
                payment_method: Some(PaymentMethod::Cash),
            },
        }
    }

    /// Full settlement: whatever was paid before, the whole fee is now paid.
    pub fn settle(&mut self, method: PaymentMethod, now: DateTime<Utc>) {
        self.is_paid = true;
        self.paid_amount = self.consultation_fee;
        self.paid_at = Some(now);
        self.payment_method = Some(method);
    }

    pub fn consultation_fee(&self) -> u64 {
        self.consultation_fee
    }

    pub fn paid_amount(&self) -> u64 {
        self.paid_amount
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn remaining(&self) -> u64 {
        self.consultation_fee.saturating_sub(self.paid_amount)
    }

    /// Both the stored flag and the amounts must agree.
    pub fn is_fully_paid(&self) -> bool {
        self.is_paid && self.paid_amount >= self.consultation_fee
    }

    pub fn view(&self) -> BillingView {
        BillingView {
            consultation_fee: self.consultation_fee,
            is_paid: self.is_paid,
            paid_amount: self.paid_amount,
            paid_at: self.paid_at,
            payment_method: self.payment_method,
            remaining_amount: self.remaining(),
        }
    }
}

/// Billing as returned to clients, with the remaining amount precomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingView {
    pub consultation_fee: u64,
    pub is_paid: bool,
    pub paid_amount: u64,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub remaining_amount: u64,
}
