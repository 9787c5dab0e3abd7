//! Speed gauge model. Drawing lives in the `ui` module.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Green,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub from: f64,
    pub to: f64,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub title: &'static str,
    pub units: &'static str,
    pub value: f64,
    pub max: f64,
    pub highlights: Vec<Highlight>,
}

impl Gauge {
    pub fn new(title: &'static str, max: f64) -> Self {
        Self {
            title,
            units: "Mb/s",
            value: 0.0,
            max,
            highlights: default_highlights(max),
        }
    }

    /// Ticks at every tenth of the scale, 0 through max.
    pub fn major_ticks(&self) -> Vec<f64> {
        (0..=10).map(|i| 0.1 * self.max * i as f64).collect()
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.highlights = default_highlights(self.max);
    }

    /// Green below `limit`, red from `limit` to the end of the scale.
    pub fn set_limit(&mut self, limit: f64) {
        let limit = limit.clamp(0.0, self.max);
        self.highlights = vec![
            Highlight {
                from: 0.0,
                to: limit,
                band: Band::Green,
            },
            Highlight {
                from: limit,
                to: self.max,
                band: Band::Red,
            },
        ];
    }

    pub fn set_value(&mut self, value: f64, units: &'static str) {
        self.value = if value.is_finite() { value } else { 0.0 };
        self.units = units;
    }

    /// Fraction of the scale filled, clamped to 0..=1.
    pub fn ratio(&self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.value / self.max).clamp(0.0, 1.0)
    }

    pub fn band_at(&self, value: f64) -> Band {
        self.highlights
            .iter()
            .find(|h| value >= h.from && value < h.to)
            .map(|h| h.band)
            .unwrap_or(Band::Green)
    }
}

fn default_highlights(max: f64) -> Vec<Highlight> {
    vec![Highlight {
        from: 0.0,
        to: max,
        band: Band::Green,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_gauge_is_all_green() {
        let gauge = Gauge::new("Upload", 1000.0);
        assert_eq!(gauge.highlights.len(), 1);
        assert_eq!(gauge.band_at(999.0), Band::Green);
        assert_eq!(gauge.major_ticks().len(), 11);
        assert_eq!(gauge.major_ticks()[10], 1000.0);
    }

    #[test]
    fn test_limit_splits_bands() {
        let mut gauge = Gauge::new("Upload", 1000.0);
        gauge.set_limit(300.0);
        assert_eq!(gauge.band_at(100.0), Band::Green);
        assert_eq!(gauge.band_at(300.0), Band::Red);
        assert_eq!(gauge.band_at(900.0), Band::Red);
    }

    #[test]
    fn test_limit_is_capped_at_scale() {
        let mut gauge = Gauge::new("Download", 1000.0);
        gauge.set_limit(5000.0);
        assert_eq!(gauge.highlights[0].to, 1000.0);
        assert_eq!(gauge.highlights[1].from, 1000.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut gauge = Gauge::new("Download", 1000.0);
        gauge.set_limit(200.0);
        gauge.set_value(50.0, "kb/s");
        gauge.reset();
        assert_eq!(gauge.value, 0.0);
        assert_eq!(gauge.highlights.len(), 1);
    }

    #[test]
    fn test_ratio_clamps() {
        let mut gauge = Gauge::new("Upload", 100.0);
        gauge.set_value(250.0, "Mb/s");
        assert_eq!(gauge.ratio(), 1.0);
        gauge.set_value(f64::NAN, "Mb/s");
        assert_eq!(gauge.ratio(), 0.0);
    }
}
