//! Summary of a completed deployment.

use std::fmt;

use serde::Serialize;

use crate::blockchain::types::{AccountAddress, CoinType, TxHash};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    pub address: AccountAddress,
    pub coin_type: CoinType,
    pub funding: Vec<TxHash>,
    pub publish: Option<TxHash>,
    pub register: Option<TxHash>,
    pub mint: Option<TxHash>,
    /// Base units minted to `address`.
    pub minted_amount: u64,
    /// Balance read before registration. `None` when the read failed.
    pub balance_before: Option<u64>,
    /// Balance read after minting. `None` when the read failed.
    pub balance_after: Option<u64>,
}

impl DeploymentReport {
    pub fn new(address: AccountAddress, coin_type: CoinType, minted_amount: u64) -> Self {
        Self {
            address,
            coin_type,
            funding: Vec::new(),
            publish: None,
            register: None,
            mint: None,
            minted_amount,
            balance_before: None,
            balance_after: None,
        }
    }
}

fn hash_or_dash(hash: &Option<TxHash>) -> &str {
    hash.as_ref().map(TxHash::as_str).unwrap_or("-")
}

fn balance_or_unknown(balance: Option<u64>) -> String {
    balance.map_or_else(|| "unknown".to_string(), |b| b.to_string())
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deployment complete")?;
        writeln!(f, "  account:        {}", self.address)?;
        writeln!(f, "  coin type:      {}", self.coin_type)?;
        if self.funding.is_empty() {
            writeln!(f, "  funding:        skipped")?;
        }
        for hash in &self.funding {
            writeln!(f, "  funding tx:     {}", hash)?;
        }
        writeln!(f, "  publish tx:     {}", hash_or_dash(&self.publish))?;
        writeln!(f, "  register tx:    {}", hash_or_dash(&self.register))?;
        writeln!(f, "  mint tx:        {}", hash_or_dash(&self.mint))?;
        writeln!(f, "  minted:         {}", self.minted_amount)?;
        writeln!(f, "  balance before: {}", balance_or_unknown(self.balance_before))?;
        write!(f, "  balance after:  {}", balance_or_unknown(self.balance_after))
    }
}
