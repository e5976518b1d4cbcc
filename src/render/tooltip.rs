use crate::choropleth::StyledFeature;

/// Hover text for one neighbourhood
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub lines: Vec<String>,
}

impl Tooltip {
    /// Format the feature's stats. `total_listings` backs the share when the
    /// dataset does not carry a precomputed `pct`.
    pub fn for_feature(styled: &StyledFeature, total_listings: f64) -> Self {
        let stats = &styled.feature.stats;
        let title = styled
            .feature
            .name
            .clone()
            .unwrap_or_else(|| format!("Feature #{}", styled.index));

        let share = stats.pct.or_else(|| {
            stats
                .n
                .filter(|_| total_listings > 0.0)
                .map(|n| n / total_listings)
        });

        let lines = vec![
            format!("Listings: {} ({})", count(stats.n), percent(share)),
            format!("Entire homes: {} ({})", count(stats.entire), percent(stats.entp)),
            format!("Price: {}", mean_sd(stats.mean_price, stats.sd_price)),
            format!("Score: {}", mean_sd(stats.mean_score, stats.sd_score)),
        ];

        Self { title, lines }
    }

    /// Title and lines joined with newlines
    pub fn to_text(&self) -> String {
        let mut text = self.title.clone();
        for line in &self.lines {
            text.push('\n');
            text.push_str(line);
        }
        text
    }
}

fn count(v: Option<f64>) -> String {
    match v {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

fn percent(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

fn mean_sd(mean: Option<f64>, sd: Option<f64>) -> String {
    match (mean, sd) {
        (Some(m), Some(s)) => format!("{:.2} ± {:.2}", m, s),
        (Some(m), None) => format!("{:.2}", m),
        _ => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Feature, ListingStats};
    use crate::palette::FALLBACK_GRAY;

    fn styled(stats: ListingStats) -> StyledFeature {
        StyledFeature {
            index: 3,
            feature: Feature::new(Some("Lapa".into()), Vec::new(), stats),
            fill: FALLBACK_GRAY,
            bucket: None,
        }
    }

    #[test]
    fn test_full_stats() {
        let tooltip = Tooltip::for_feature(
            &styled(ListingStats {
                n: Some(20.0),
                entire: Some(5.0),
                pct: Some(0.0125),
                mean_price: Some(310.4),
                sd_price: Some(42.0),
                mean_score: Some(95.5),
                sd_score: Some(3.25),
                entp: Some(0.25),
                ..Default::default()
            }),
            1600.0,
        );
        assert_eq!(tooltip.title, "Lapa");
        assert_eq!(tooltip.lines[0], "Listings: 20 (1.25%)");
        assert_eq!(tooltip.lines[1], "Entire homes: 5 (25.00%)");
        assert_eq!(tooltip.lines[2], "Price: 310.40 ± 42.00");
        assert_eq!(tooltip.lines[3], "Score: 95.50 ± 3.25");
    }

    #[test]
    fn test_share_falls_back_to_total() {
        let tooltip = Tooltip::for_feature(
            &styled(ListingStats {
                n: Some(50.0),
                ..Default::default()
            }),
            200.0,
        );
        assert_eq!(tooltip.lines[0], "Listings: 50 (25.00%)");
        assert_eq!(tooltip.lines[1], "Entire homes: n/a (n/a)");
        assert_eq!(tooltip.lines[2], "Price: n/a");
        assert!(tooltip.to_text().starts_with("Lapa\nListings"));
    }
}
