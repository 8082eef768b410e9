use crate::domain::{Position, Trade};

/// Realized capital and commission bookkeeping for one run.
///
/// Capital only changes when a position closes; the entry commission is
/// carried on the position and settled together with the exit.
#[derive(Debug, Clone)]
pub struct Account {
    initial_capital: f64,
    capital: f64,
    commission_rate: f64,
    commission_paid: f64,
}

impl Account {
    pub fn new(initial_capital: f64, commission_rate: f64) -> Self {
        Self {
            initial_capital,
            capital: initial_capital,
            commission_rate,
            commission_paid: 0.0,
        }
    }

    /// Commission on a fill of `size` units at `price`.
    pub fn commission(&self, size: f64, price: f64) -> f64 {
        self.commission_rate * size * price
    }

    /// Apply a closed trade: `capital += gross - entry commission - exit commission`.
    pub fn settle(&mut self, trade: &Trade) {
        self.capital += trade.net_pnl;
        self.commission_paid += trade.commission;
    }

    /// Capital plus unrealized pnl, net of the entry commission already incurred.
    pub fn mark_to_market(&self, position: Option<&Position>, close: f64) -> f64 {
        match position {
            Some(pos) => self.capital + pos.unrealized_pnl(close) - pos.entry_commission,
            None => self.capital,
        }
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    pub fn total_pnl(&self) -> f64 {
        self.capital - self.initial_capital
    }
}
