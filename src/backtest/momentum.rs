//! Rate-of-change momentum and ranking.

use super::data::PriceTable;

/// `close[i] / close[i - lookback]`, undefined when either close is missing
/// or not positive.
pub fn ratio(prices: &PriceTable, ticker: &str, i: usize, lookback: usize) -> Option<f64> {
    let past = prices.close(ticker, i.checked_sub(lookback)?)?;
    let now = prices.close(ticker, i)?;
    let valid = |x: f64| x.is_finite() && x > 0.0;
    (valid(past) && valid(now)).then(|| now / past)
}

/// Rank `tickers` by ratio on day `i`: highest first, ties by ticker.
/// Tickers without a defined ratio are left out.
pub fn rank<'a>(
    prices: &PriceTable,
    tickers: impl IntoIterator<Item = &'a str>,
    i: usize,
    lookback: usize,
) -> Vec<(&'a str, f64)> {
    let mut ranked: Vec<(&str, f64)> = tickers
        .into_iter()
        .filter_map(|ticker| Some((ticker, ratio(prices, ticker, i, lookback)?)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

/// The first `k` names of a ranking.
pub fn top_k<'a>(ranked: &[(&'a str, f64)], k: usize) -> Vec<&'a str> {
    ranked.iter().take(k).map(|(ticker, _)| *ticker).collect()
}
