use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub company: Company,
    pub ledger: LedgerSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LedgerSettings {
    pub number_format: String,
    pub currency: String,
    pub currency_symbol: String,
    /// When set, the dues view also shows the outstanding total
    /// converted into this currency.
    #[serde(default)]
    pub report_currency: Option<String>,
}
