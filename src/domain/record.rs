//! Raw snapshot record produced by the infobox extractor.

use crate::domain::table::{Table, Value};

/// Target field of an extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotField {
    GdpNominal,
    GdpPpp,
    GdpGrowth,
    GdpPerCapita,
    InflationRate,
    UnemploymentRate,
    Population,
    GiniCoefficient,
    Hdi,
    DebtToGdp,
    TradeBalance,
    Currency,
    ForeignReserves,
    LaborForce,
    Exports,
    Imports,
    PovertyRate,
    MainSectors,
}

/// A cleaned value ready to be stored on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

/// One entity's scraped snapshot for a single reference year.
///
/// Every indicator is optional: absent on the page means `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotRecord {
    pub country: String,
    pub year: i32,
    pub gdp_nominal: Option<f64>,
    pub gdp_ppp: Option<f64>,
    pub gdp_growth: Option<f64>,
    pub gdp_per_capita: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub unemployment_rate: Option<f64>,
    pub population: Option<f64>,
    pub gini_coefficient: Option<f64>,
    pub hdi: Option<f64>,
    pub debt_to_gdp: Option<f64>,
    pub trade_balance: Option<f64>,
    pub currency: Option<String>,
    pub foreign_reserves: Option<f64>,
    pub labor_force: Option<f64>,
    pub exports: Option<f64>,
    pub imports: Option<f64>,
    pub poverty_rate: Option<f64>,
    pub main_sectors: Option<String>,
}

impl SnapshotRecord {
    /// Header of `raw_economic_data.csv`; [`Self::to_row`] follows this order.
    pub const COLUMNS: [&'static str; 20] = [
        "Country",
        "Year",
        "GDP_Nominal",
        "GDP_PPP",
        "GDP_Growth",
        "GDP_Per_Capita",
        "Inflation_Rate",
        "Unemployment_Rate",
        "Population",
        "Gini_Coefficient",
        "HDI",
        "Debt_to_GDP",
        "Trade_Balance",
        "Currency",
        "Foreign_Reserves",
        "Labor_Force",
        "Exports",
        "Imports",
        "Poverty_Rate",
        "Main_Sectors",
    ];

    pub fn new(country: impl Into<String>, year: i32) -> Self {
        Self {
            country: country.into(),
            year,
            ..Self::default()
        }
    }

    /// Store a cleaned value. A value of the wrong kind for the field is ignored.
    pub fn set(&mut self, field: SnapshotField, value: FieldValue) {
        match value {
            FieldValue::Number(v) => {
                if let Some(slot) = self.number_slot(field) {
                    *slot = Some(v);
                }
            }
            FieldValue::Text(s) => match field {
                SnapshotField::Currency => self.currency = Some(s),
                SnapshotField::MainSectors => self.main_sectors = Some(s),
                _ => {}
            },
        }
    }

    fn number_slot(&mut self, field: SnapshotField) -> Option<&mut Option<f64>> {
        Some(match field {
            SnapshotField::GdpNominal => &mut self.gdp_nominal,
            SnapshotField::GdpPpp => &mut self.gdp_ppp,
            SnapshotField::GdpGrowth => &mut self.gdp_growth,
            SnapshotField::GdpPerCapita => &mut self.gdp_per_capita,
            SnapshotField::InflationRate => &mut self.inflation_rate,
            SnapshotField::UnemploymentRate => &mut self.unemployment_rate,
            SnapshotField::Population => &mut self.population,
            SnapshotField::GiniCoefficient => &mut self.gini_coefficient,
            SnapshotField::Hdi => &mut self.hdi,
            SnapshotField::DebtToGdp => &mut self.debt_to_gdp,
            SnapshotField::TradeBalance => &mut self.trade_balance,
            SnapshotField::ForeignReserves => &mut self.foreign_reserves,
            SnapshotField::LaborForce => &mut self.labor_force,
            SnapshotField::Exports => &mut self.exports,
            SnapshotField::Imports => &mut self.imports,
            SnapshotField::PovertyRate => &mut self.poverty_rate,
            SnapshotField::Currency | SnapshotField::MainSectors => return None,
        })
    }

    /// Row values aligned with [`Self::COLUMNS`].
    pub fn to_row(&self) -> Vec<Value> {
        let text = |s: &Option<String>| s.clone().map(Value::Text).unwrap_or(Value::Null);
        vec![
            Value::Text(self.country.clone()),
            Value::Number(f64::from(self.year)),
            Value::from_f64(self.gdp_nominal),
            Value::from_f64(self.gdp_ppp),
            Value::from_f64(self.gdp_growth),
            Value::from_f64(self.gdp_per_capita),
            Value::from_f64(self.inflation_rate),
            Value::from_f64(self.unemployment_rate),
            Value::from_f64(self.population),
            Value::from_f64(self.gini_coefficient),
            Value::from_f64(self.hdi),
            Value::from_f64(self.debt_to_gdp),
            Value::from_f64(self.trade_balance),
            text(&self.currency),
            Value::from_f64(self.foreign_reserves),
            Value::from_f64(self.labor_force),
            Value::from_f64(self.exports),
            Value::from_f64(self.imports),
            Value::from_f64(self.poverty_rate),
            text(&self.main_sectors),
        ]
    }

    pub fn to_table(records: &[SnapshotRecord]) -> Table {
        let mut table = Table::new(Self::COLUMNS);
        for r in records {
            table.push_row(r.to_row());
        }
        table
    }
}
