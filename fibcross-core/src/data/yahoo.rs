//! Yahoo Finance bar source.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API. Sub-daily ranges are split
//! into week-sized windows and concatenated. Handles rate limiting, retries
//! with exponential backoff, response parsing, and the circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV source is the fallback when Yahoo is unavailable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{BarSource, DataError, DataSource};
use super::windows::fetch_windows;
use crate::domain::{BarInterval, RawBar};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Historical range request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YahooRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: BarInterval,
}

pub struct YahooSource {
    client: reqwest::blocking::Client,
    circuit_breaker: CircuitBreaker,
    request: YahooRequest,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooSource {
    pub fn new(request: YahooRequest) -> Result<Self, DataError> {
        if request.start > request.end {
            return Err(DataError::InvalidRange {
                start: request.start.to_string(),
                end: request.end.to_string(),
            });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker: CircuitBreaker::default_provider(),
            request,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn request(&self) -> &YahooRequest {
        &self.request
    }

    /// Build the chart API URL for one window.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate, interval: BarInterval) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp() + 86_399;
        let code = interval.yahoo_code();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={code}\
             &includePrePost=false"
        )
    }

    /// Parse one chart response. A window without timestamps is empty, not an error.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        let mut skipped = 0usize;
        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Non-trading slots and partial slots without a close are skipped,
            // the same as non-numeric closes in a CSV file
            let Some(close) = close else {
                skipped += 1;
                continue;
            };

            bars.push(RawBar {
                timestamp,
                open: open.unwrap_or(close),
                high: high.unwrap_or(close),
                low: low.unwrap_or(close),
                close,
                volume: volume.unwrap_or(0.0),
            });
        }

        if skipped > 0 {
            debug!(%symbol, skipped, "skipped chart slots without a close");
        }
        Ok(bars)
    }

    /// Execute a single window request with retry and circuit breaker logic.
    fn fetch_with_retry(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawBar>, DataError> {
        let symbol = self.request.symbol.clone();
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(&symbol, start, end, self.request.interval);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(%symbol, attempt, ?delay, "retrying chart request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(DataError::AuthenticationRequired(
                            "Yahoo Finance requires authentication".into(),
                        ));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound { symbol });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let bars = Self::parse_response(&symbol, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(bars);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl YahooSource {
    /// A valid range with no trading slots (a weekend, a holiday) is its own error.
    fn ensure_nonempty(&self, bars: &[RawBar]) -> Result<(), DataError> {
        if bars.is_empty() {
            return Err(DataError::NoBarsInRange {
                symbol: self.request.symbol.clone(),
                start: self.request.start.to_string(),
                end: self.request.end.to_string(),
            });
        }
        Ok(())
    }
}

impl BarSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn kind(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn load(&mut self) -> Result<Vec<RawBar>, DataError> {
        let windows = fetch_windows(
            self.request.start,
            self.request.end,
            self.request.interval.is_intraday(),
        );
        let mut bars = Vec::new();
        for (start, end) in windows {
            let chunk = self.fetch_with_retry(start, end)?;
            debug!(symbol = %self.request.symbol, %start, %end, bars = chunk.len(), "fetched window");
            bars.extend(chunk);
        }
        self.ensure_nonempty(&bars)?;
        info!(
            symbol = %self.request.symbol,
            interval = %self.request.interval,
            bars = bars.len(),
            "loaded Yahoo history"
        );
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_interval_and_inclusive_end() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 10).unwrap();
        let url = YahooSource::chart_url("AAPL", start, end, "1m".parse().unwrap());
        assert!(url.contains("/chart/AAPL?"));
        assert!(url.contains("period1=1609718400"));
        assert!(url.contains("period2=1610323199"));
        assert!(url.contains("interval=1m"));
    }

    #[test]
    fn parses_chart_payload_and_skips_slots_without_close() {
        let body = r#"{"chart":{"result":[{"timestamp":[1609770600,1609770660,1609770720,1609770780],
            "indicators":{"quote":[{"open":[10.0,null,10.2,null],"high":[10.5,null,10.6,null],
            "low":[9.9,null,10.1,null],"close":[10.1,null,null,10.3],"volume":[100,null,300,null]}]}}],
            "error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let bars = YahooSource::parse_response("AAPL", resp).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.1);
        assert_eq!(bars[0].volume, 100.0);
        assert_eq!(
            bars[0].timestamp,
            chrono::DateTime::from_timestamp(1609770600, 0).unwrap().naive_utc()
        );
        // close present, the rest null: prices fall back to the close
        assert_eq!(bars[1].close, 10.3);
        assert_eq!(bars[1].open, 10.3);
        assert_eq!(bars[1].high, 10.3);
        assert_eq!(bars[1].volume, 0.0);
        assert!(bars.iter().all(|b| !b.close.is_nan()));
    }

    #[test]
    fn one_null_close_does_not_disable_later_signals() {
        let n = 200;
        let start = 1609770600i64;
        let timestamps: Vec<String> = (0..n).map(|i| (start + 60 * i as i64).to_string()).collect();
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + 5.0 * (i as f64 / 7.0).sin()).collect();
        let field = |offset: f64| -> String {
            closes
                .iter()
                .map(|c| format!("{}", c + offset))
                .collect::<Vec<_>>()
                .join(",")
        };
        let close_field = closes
            .iter()
            .enumerate()
            .map(|(i, c)| if i == 80 { "null".to_string() } else { c.to_string() })
            .collect::<Vec<_>>()
            .join(",");
        let body = format!(
            r#"{{"chart":{{"result":[{{"timestamp":[{}],"indicators":{{"quote":[{{"open":[{}],"high":[{}],"low":[{}],"close":[{}],"volume":[{}]}}]}}}}],"error":null}}}}"#,
            timestamps.join(","),
            field(0.0),
            field(1.0),
            field(-1.0),
            close_field,
            vec!["1"; n].join(","),
        );
        let resp: ChartResponse = serde_json::from_str(&body).unwrap();
        let raw = YahooSource::parse_response("AAPL", resp).unwrap();
        assert_eq!(raw.len(), n - 1);

        let pipeline = crate::indicators::IndicatorPipeline::new(Default::default()).unwrap();
        let warm_up = pipeline.warm_up();
        let bars = pipeline.apply(&raw);
        assert!(warm_up < 80);
        assert!(bars[warm_up + 1..].iter().all(|b| b.indicators.signals_defined()));
    }

    #[test]
    fn window_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{"open":[],"high":[],
            "low":[],"close":[],"volume":[]}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(YahooSource::parse_response("AAPL", resp).unwrap().is_empty());
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let err = YahooSource::parse_response("NOPE", resp).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "NOPE"));
    }

    #[test]
    fn empty_range_is_no_bars_not_unknown_symbol() {
        let source = YahooSource::new(YahooRequest {
            symbol: "AAPL".into(),
            start: NaiveDate::from_ymd_opt(2021, 1, 9).unwrap(),
            end: NaiveDate::from_ymd_opt(2021, 1, 10).unwrap(),
            interval: BarInterval::ONE_DAY,
        })
        .unwrap();
        let err = source.ensure_nonempty(&[]).unwrap_err();
        assert!(matches!(err, DataError::NoBarsInRange { ref symbol, .. } if symbol == "AAPL"));
        assert!(err.to_string().contains("2021-01-09"));
    }

    #[test]
    fn inverted_range_rejected() {
        let result = YahooSource::new(YahooRequest {
            symbol: "AAPL".into(),
            start: NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            interval: BarInterval::ONE_DAY,
        });
        assert!(matches!(result, Err(DataError::InvalidRange { .. })));
    }
}
