use serde::{Deserialize, Serialize};

/// One raw entry of a stored price artifact. Artifacts mix bare numbers and
/// records carrying a `price` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceEntry {
    Bare(f64),
    Record { price: f64 },
}

impl PriceEntry {
    pub fn price(&self) -> f64 {
        match self {
            PriceEntry::Bare(price) => *price,
            PriceEntry::Record { price } => *price,
        }
    }

    pub fn form(&self) -> EntryForm {
        match self {
            PriceEntry::Bare(_) => EntryForm::Bare,
            PriceEntry::Record { .. } => EntryForm::Record,
        }
    }
}

/// The stored shape a price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryForm {
    /// `{ "price": .. }`
    Record,
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub price: f64,
    #[serde(skip)]
    pub form: EntryForm,
}

impl From<PriceEntry> for PricePoint {
    fn from(entry: PriceEntry) -> Self {
        PricePoint { price: entry.price(), form: entry.form() }
    }
}

/// Chronologically ordered prices for one symbol; the tail is the most recent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    /// Record-form series, as written by the price collector.
    pub fn from_prices(prices: &[f64]) -> Self {
        Self::new(
            prices
                .iter()
                .map(|&price| PricePoint { price, form: EntryForm::Record })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.points.last().map(|p| p.price)
    }

    /// Prices of the last `n` points (or all of them if fewer), oldest first.
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let start = self.points.len().saturating_sub(n);
        self.points[start..].iter().map(|p| p.price).collect()
    }

    /// Like [`tail`](Self::tail), but every point read must be a record.
    /// Older entries outside the tail are not inspected.
    pub fn tail_records(&self, n: usize) -> Result<Vec<f64>, String> {
        let start = self.points.len().saturating_sub(n);
        self.points[start..]
            .iter()
            .enumerate()
            .map(|(offset, p)| match p.form {
                EntryForm::Record => Ok(p.price),
                EntryForm::Bare => Err(format!(
                    "entry {} is a bare number, expected a record with a 'price' field",
                    start + offset
                )),
            })
            .collect()
    }
}

/// Placeholder market summary built from local price data alone.
#[derive(Debug, Clone, Serialize)]
pub struct CoinSummary {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub market_cap: u64,
    pub volume: u64,
    pub circulating_supply: u64,
    pub total_supply: u64,
    pub homepage: String,
}

impl CoinSummary {
    pub fn from_local(coin: &str, price: f64) -> Self {
        Self {
            name: capitalize(coin),
            symbol: coin.chars().take(3).collect::<String>().to_uppercase(),
            price,
            market_cap: 0,
            volume: 0,
            circulating_supply: 0,
            total_supply: 0,
            homepage: "https://example.com".to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}
