use crate::value_objects::side::Side;

#[derive(Debug, Clone, PartialEq)]
struct Leg {
    symbol: String,
    quantity: f64,
    avg_price: f64,
}

/// Cash/position book for the pair. Quantities are signed so short legs are
/// first-class; realized PnL accrues when a fill reduces a leg's magnitude.
#[derive(Debug, Default)]
pub struct PairBook {
    legs: Vec<Leg>,
    cash: f64,
    realized_pnl: f64,
}

impl PairBook {
    pub fn new_with_cash(initial_cash: f64) -> Self {
        Self {
            legs: Vec::new(),
            cash: initial_cash,
            realized_pnl: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn position_qty(&self, symbol: &str) -> f64 {
        self.legs
            .iter()
            .find(|leg| leg.symbol == symbol)
            .map(|leg| leg.quantity)
            .unwrap_or(0.0)
    }

    pub fn position_avg_price(&self, symbol: &str) -> f64 {
        self.legs
            .iter()
            .find(|leg| leg.symbol == symbol)
            .map(|leg| leg.avg_price)
            .unwrap_or(0.0)
    }

    pub fn apply_fill(&mut self, symbol: &str, side: Side, quantity: f64, price: f64) {
        if quantity <= 0.0 || !quantity.is_finite() || !price.is_finite() {
            return;
        }

        let delta = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };
        self.cash -= delta * price;

        let leg = match self.legs.iter_mut().find(|leg| leg.symbol == symbol) {
            Some(leg) => leg,
            None => {
                self.legs.push(Leg {
                    symbol: symbol.to_string(),
                    quantity: 0.0,
                    avg_price: 0.0,
                });
                self.legs.last_mut().expect("leg just pushed")
            }
        };

        let prev_qty = leg.quantity;
        let next_qty = prev_qty + delta;

        if prev_qty == 0.0 || prev_qty.signum() == delta.signum() {
            // Opening or adding: weighted average entry.
            let total = prev_qty.abs() + delta.abs();
            if total > 0.0 {
                leg.avg_price = (leg.avg_price * prev_qty.abs() + price * delta.abs()) / total;
            }
            leg.quantity = next_qty;
        } else {
            // Reducing (possibly through zero): realize on the closed part.
            let closed = delta.abs().min(prev_qty.abs());
            self.realized_pnl += (price - leg.avg_price) * closed * prev_qty.signum();
            leg.quantity = next_qty;
            if prev_qty.signum() != next_qty.signum() && next_qty != 0.0 {
                // Flipped through zero: the remainder is a fresh position.
                leg.avg_price = price;
            } else if next_qty == 0.0 {
                leg.avg_price = 0.0;
            }
        }
    }

    /// Marks the book with the provided (symbol, price) closes. Every leg
    /// with non-zero quantity must have a mark.
    pub fn equity(&self, marks: &[(&str, f64)]) -> Result<f64, String> {
        let mut equity = self.cash;
        for leg in &self.legs {
            if leg.quantity == 0.0 {
                continue;
            }
            let mark = mark_for(marks, &leg.symbol)?;
            equity += leg.quantity * mark;
        }
        Ok(equity)
    }

    pub fn unrealized_pnl(&self, marks: &[(&str, f64)]) -> Result<f64, String> {
        let mut pnl = 0.0;
        for leg in &self.legs {
            if leg.quantity == 0.0 {
                continue;
            }
            let mark = mark_for(marks, &leg.symbol)?;
            pnl += (mark - leg.avg_price) * leg.quantity;
        }
        Ok(pnl)
    }
}

fn mark_for(marks: &[(&str, f64)], symbol: &str) -> Result<f64, String> {
    marks
        .iter()
        .find(|(mark_symbol, _)| *mark_symbol == symbol)
        .map(|(_, price)| *price)
        .ok_or_else(|| format!("missing mark price for {}", symbol))
}
