use super::error::{ProjectionError, require_non_negative};
use super::types::{CostLot, LotSnapshot};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostBasisLedger {
    lots: Vec<CostLot>,
}

impl CostBasisLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lots(lots: &[CostLot]) -> Result<Self, ProjectionError> {
        let mut ledger = Self::new();
        for lot in lots {
            ledger.add_lot(lot.shares, lot.price_per_share)?;
        }
        Ok(ledger)
    }

    pub fn add_lot(&mut self, shares: f64, price_per_share: f64) -> Result<(), ProjectionError> {
        let lot = validate_lot(shares, price_per_share)?;
        self.lots.push(lot);
        Ok(())
    }

    pub fn remove_lot(&mut self, index: usize) -> Option<CostLot> {
        (index < self.lots.len()).then(|| self.lots.remove(index))
    }

    pub fn clear(&mut self) {
        self.lots.clear();
    }

    pub fn lots(&self) -> &[CostLot] {
        &self.lots
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn total_shares(&self) -> f64 {
        self.lots.iter().map(|lot| lot.shares).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.lots.iter().map(|lot| lot.shares * lot.price_per_share).sum()
    }

    pub fn weighted_average_cost(&self) -> f64 {
        weighted_average_cost(&self.lots)
    }

    pub fn snapshot(&self) -> Vec<LotSnapshot> {
        self.lots
            .iter()
            .map(|lot| LotSnapshot {
                shares: lot.shares,
                price: lot.price_per_share,
                total: lot.shares * lot.price_per_share,
            })
            .collect()
    }
}

pub fn accumulate_cost_basis(
    existing: &[CostLot],
    new_lot: CostLot,
) -> Result<Vec<CostLot>, ProjectionError> {
    let lot = validate_lot(new_lot.shares, new_lot.price_per_share)?;
    let mut lots = Vec::with_capacity(existing.len() + 1);
    lots.extend_from_slice(existing);
    lots.push(lot);
    Ok(lots)
}

pub fn weighted_average_cost(lots: &[CostLot]) -> f64 {
    let total_shares: f64 = lots.iter().map(|lot| lot.shares).sum();
    if total_shares == 0.0 {
        return 0.0;
    }
    let total_cost: f64 = lots.iter().map(|lot| lot.shares * lot.price_per_share).sum();
    total_cost / total_shares
}

fn validate_lot(shares: f64, price_per_share: f64) -> Result<CostLot, ProjectionError> {
    Ok(CostLot {
        shares: require_non_negative("shares", shares)?,
        price_per_share: require_non_negative("price_per_share", price_per_share)?,
    })
}
