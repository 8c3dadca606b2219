//! Chart payload parsing shared by the price, dividend and action datasets

use super::json::{int, num};
use serde_json::Value;

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<i64>,
}

impl Bar {
    /// True when the exchange reported nothing for this slot
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }

    /// Scale OHLC by adjusted close / close
    pub fn adjusted(&self) -> Bar {
        let ratio = match (self.adj_close, self.close) {
            (Some(adj), Some(close)) if close != 0.0 => adj / close,
            _ => return self.clone(),
        };
        Bar {
            open: self.open.map(|v| v * ratio),
            high: self.high.map(|v| v * ratio),
            low: self.low.map(|v| v * ratio),
            close: self.adj_close,
            ..self.clone()
        }
    }
}

/// Parsed `chart.result[0]`
#[derive(Debug, Clone, Default)]
pub struct ChartSeries {
    /// Exchange UTC offset in seconds
    pub gmt_offset: i32,
    pub bars: Vec<Bar>,
    /// (timestamp, amount), ascending
    pub dividends: Vec<(i64, f64)>,
    /// (timestamp, numerator / denominator), ascending
    pub splits: Vec<(i64, f64)>,
}

impl ChartSeries {
    pub fn parse(chart: &Value) -> Self {
        let meta = &chart["meta"];
        let gmt_offset = int(&meta["gmtoffset"]).unwrap_or(0) as i32;

        let quote = &chart["indicators"]["quote"][0];
        let adj_close = &chart["indicators"]["adjclose"][0]["adjclose"];
        let series_value = |series: &Value, i: usize| series.get(i).and_then(num);

        let bars = chart["timestamp"]
            .as_array()
            .map(|timestamps| {
                timestamps
                    .iter()
                    .enumerate()
                    .filter_map(|(i, ts)| {
                        Some(Bar {
                            timestamp: int(ts)?,
                            open: series_value(&quote["open"], i),
                            high: series_value(&quote["high"], i),
                            low: series_value(&quote["low"], i),
                            close: series_value(&quote["close"], i),
                            adj_close: series_value(adj_close, i),
                            volume: quote["volume"].get(i).and_then(int),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut dividends: Vec<(i64, f64)> = chart["events"]["dividends"]
            .as_object()
            .map(|events| {
                events
                    .values()
                    .filter_map(|event| Some((int(&event["date"])?, num(&event["amount"])?)))
                    .collect()
            })
            .unwrap_or_default();
        dividends.sort_by_key(|(ts, _)| *ts);

        let mut splits: Vec<(i64, f64)> = chart["events"]["splits"]
            .as_object()
            .map(|events| {
                events
                    .values()
                    .filter_map(|event| {
                        let numerator = num(&event["numerator"])?;
                        let denominator = num(&event["denominator"]).filter(|d| *d != 0.0)?;
                        Some((int(&event["date"])?, numerator / denominator))
                    })
                    .collect()
            })
            .unwrap_or_default();
        splits.sort_by_key(|(ts, _)| *ts);

        Self {
            gmt_offset,
            bars,
            dividends,
            splits,
        }
    }

    /// Bars with at least one value, optionally price-adjusted
    pub fn trading_bars(&self, auto_adjust: bool) -> Vec<Bar> {
        self.bars
            .iter()
            .filter(|bar| !bar.is_empty())
            .map(|bar| if auto_adjust { bar.adjusted() } else { bar.clone() })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    /// Three daily Tokyo bars (00:00 JST), one empty, with a dividend and a split
    pub fn daily_chart() -> Value {
        json!({
            "meta": {
                "currency": "JPY",
                "symbol": "7203.T",
                "exchangeName": "JPX",
                "instrumentType": "EQUITY",
                "exchangeTimezoneName": "Asia/Tokyo",
                "gmtoffset": 32400,
                "regularMarketPrice": 3550.0,
                "regularMarketVolume": 21_000_000
            },
            "timestamp": [1_711_897_200, 1_711_983_600, 1_712_070_000],
            "events": {
                "dividends": {
                    "1711897200": {"amount": 30.0, "date": 1_711_897_200}
                },
                "splits": {
                    "1711983600": {"date": 1_711_983_600, "numerator": 5.0, "denominator": 1.0, "splitRatio": "5:1"}
                }
            },
            "indicators": {
                "quote": [{
                    "open":   [3500.0, null, 3520.0],
                    "high":   [3560.0, null, 3580.0],
                    "low":    [3480.0, null, 3500.0],
                    "close":  [3540.0, null, 3550.0],
                    "volume": [20_000_000, null, 21_000_000]
                }],
                "adjclose": [{
                    "adjclose": [3504.6, null, 3550.0]
                }]
            }
        })
    }
}
