use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::cell::Cell;
use super::money::Money;

/// One cleansed line from the accounting (ERP) export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: String,
    pub timestamp: NaiveDateTime,
    /// Net amount after deposit deduction. This is what gets matched.
    pub amount: Money,
    /// Deposit (stored value) consumed by this line.
    pub deposit: Money,
    /// Service value: `amount + deposit`, or zero for a pure recharge.
    pub sales_amount: Money,
    #[serde(rename = "type")]
    pub kind: String,
    pub client: String,
    pub remark: String,
    pub phone: String,
    pub is_cash: bool,
    pub commission: Money,
}

/// Where a ledger record goes before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCategory {
    Cash,
    /// Paid entirely from a deposit balance: nothing to find in a statement.
    DepositOnly,
    /// Money that should show up in a payment statement.
    Digital,
    /// Zero net with a non-positive deposit; belongs to no list.
    Other,
}

impl LedgerRecord {
    pub fn category(&self) -> LedgerCategory {
        if self.is_cash {
            LedgerCategory::Cash
        } else if !self.amount.is_zero() {
            LedgerCategory::Digital
        } else if self.deposit.is_positive() {
            LedgerCategory::DepositOnly
        } else {
            LedgerCategory::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Income,
    Expenditure,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Income => write!(f, "income"),
            Direction::Expenditure => write!(f, "expenditure"),
        }
    }
}

/// Mobile-payment channel a statement was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    WeChat,
    Alipay,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::WeChat, Channel::Alipay];

    pub fn code(self) -> &'static str {
        match self {
            Channel::WeChat => "wechat",
            Channel::Alipay => "alipay",
        }
    }

    /// WeChat exports mix personal transfers with merchant receipts; only
    /// rows typed as merchant collections are revenue.
    pub fn requires_merchant_collection(self) -> bool {
        matches!(self, Channel::WeChat)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::WeChat => write!(f, "WeChat"),
            Channel::Alipay => write!(f, "Alipay"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wechat" | "weixin" | "微信" => Ok(Channel::WeChat),
            "alipay" | "支付宝" => Ok(Channel::Alipay),
            other => Err(format!("Unknown payment channel: '{other}'")),
        }
    }
}

/// One cleansed line from a payment-channel statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub timestamp: NaiveDateTime,
    /// Signed: refunds are negative.
    pub amount: Money,
    #[serde(rename = "type")]
    pub kind: String,
    pub direction: Direction,
    pub counterparty: String,
    pub channel: Channel,
    /// Absolute row index in the source grid.
    pub source_row: usize,
    pub raw_row: Vec<Cell>,
    /// Transaction id copied from the statement, when it has one.
    pub origin_id: Option<String>,
}
