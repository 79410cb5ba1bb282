//! Daily sentiment history for the trend chart.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::model::{Article, HistoryPoint, Sentiment};

/// Days shown by the trend chart.
pub const TREND_DAYS: usize = 7;
/// Upper bound on any history or trend length.
pub const MAX_TREND_DAYS: usize = 366;

/// Last `days` points of a chronological history.
pub fn trend_window(history: &[HistoryPoint], days: usize) -> &[HistoryPoint] {
    let start = history.len().saturating_sub(days);
    &history[start..]
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_published(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// One point per UTC day, oldest first, ending with the day of `now`.
/// `days` is capped at [`MAX_TREND_DAYS`].
///
/// Articles with an unparseable `published` are skipped. Articles without a
/// sentiment count toward `count` only.
pub fn daily_history(articles: &[Article], now: DateTime<Utc>, days: usize) -> Vec<HistoryPoint> {
    if days == 0 {
        return Vec::new();
    }
    let days = days.min(MAX_TREND_DAYS);
    let today = now.date_naive();
    let first = today - Duration::days(days as i64 - 1);

    let mut out: Vec<HistoryPoint> = (0..days)
        .map(|i| HistoryPoint {
            date: (first + Duration::days(i as i64)).to_string(),
            ..Default::default()
        })
        .collect();

    for a in articles {
        let Some(ts) = parse_published(&a.published) else {
            continue;
        };
        let Some(slot) = day_index(first, ts.date_naive(), days) else {
            continue;
        };
        let p = &mut out[slot];
        p.count += 1;
        match a.sentiment {
            Some(Sentiment::Positive) => p.positive += 1,
            Some(Sentiment::Neutral) => p.neutral += 1,
            Some(Sentiment::Negative) => p.negative += 1,
            None => {}
        }
    }
    out
}

fn day_index(first: NaiveDate, day: NaiveDate, days: usize) -> Option<usize> {
    let off = (day - first).num_days();
    if off < 0 || off as usize >= days {
        None
    } else {
        Some(off as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ts: &str, s: Option<Sentiment>) -> Article {
        Article {
            published: ts.into(),
            sentiment: s,
            ..Default::default()
        }
    }

    #[test]
    fn window_keeps_tail() {
        let h: Vec<HistoryPoint> = (0..10)
            .map(|i| HistoryPoint {
                date: format!("d{i}"),
                ..Default::default()
            })
            .collect();
        let w = trend_window(&h, TREND_DAYS);
        assert_eq!(w.len(), 7);
        assert_eq!(w[0].date, "d3");
        assert_eq!(trend_window(&h[..2], TREND_DAYS).len(), 2);
    }

    #[test]
    fn buckets_articles_by_utc_day() {
        let now = Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap();
        let arts = vec![
            at("2025-08-20T01:00:00Z", Some(Sentiment::Positive)),
            at("2025-08-20T02:00:00+05:00", Some(Sentiment::Negative)), // 19th UTC
            at("2025-08-14T10:00:00Z", Some(Sentiment::Neutral)),
            at("2025-08-13T10:00:00Z", Some(Sentiment::Neutral)), // outside
            at("not a date", Some(Sentiment::Neutral)),
            at("2025-08-20T03:00:00Z", None),
        ];
        let h = daily_history(&arts, now, 7);
        assert_eq!(h.len(), 7);
        assert_eq!(h[0].date, "2025-08-14");
        assert_eq!(h[0].neutral, 1);
        assert_eq!(h[5].negative, 1);
        assert_eq!(h[6].positive, 1);
        assert_eq!(h[6].count, 2);
        let total: u64 = h.iter().map(|p| p.count).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn oversized_window_is_capped() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let h = daily_history(&[at("2026-10-19T08:00:00Z", None)], now, usize::MAX);
        assert_eq!(h.len(), MAX_TREND_DAYS);
        assert_eq!(h.last().unwrap().date, "2026-10-19");
        assert_eq!(h.last().unwrap().count, 1);
    }
}
