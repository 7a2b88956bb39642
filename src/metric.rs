//! Named telemetry exported by chips and profiles.
//!
//! Exporters are indexed from 0 and signal the end of their list by returning `Ok(None)`.

use core::fmt;

pub const METRIC_TEXT_LEN: usize = 48;

pub type MetricText = heapless::String<METRIC_TEXT_LEN>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricValue {
    Int(i32),
    UInt(u32),
    Text(MetricText),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub name: &'static str,
    pub value: MetricValue,
}

impl Metric {
    pub fn int(name: &'static str, value: i32) -> Self {
        Self {
            name,
            value: MetricValue::Int(value),
        }
    }

    pub fn uint(name: &'static str, value: u32) -> Self {
        Self {
            name,
            value: MetricValue::UInt(value),
        }
    }

    /// Text metric, truncated to [`METRIC_TEXT_LEN`] bytes.
    pub fn text(name: &'static str, value: &str) -> Self {
        let mut text = MetricText::new();
        for c in value.chars() {
            if text.push(c).is_err() {
                break;
            }
        }
        Self {
            name,
            value: MetricValue::Text(text),
        }
    }
}

/// Iterator over an indexed metric exporter.
///
/// Stops at the end marker or after yielding the first error.
pub struct MetricIter<F> {
    export: F,
    index: usize,
    done: bool,
}

impl<F, E> Iterator for MetricIter<F>
where
    F: FnMut(usize) -> Result<Option<Metric>, E>,
{
    type Item = Result<Metric, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = (self.export)(self.index);
        self.index += 1;
        match item {
            Ok(Some(metric)) => Some(Ok(metric)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

pub fn metrics<F, E>(export: F) -> MetricIter<F>
where
    F: FnMut(usize) -> Result<Option<Metric>, E>,
{
    MetricIter {
        export,
        index: 0,
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_stops_at_end_marker() {
        let names = ["a", "b"];
        let export = |i: usize| {
            let metric = names.get(i).map(|&name| Metric::uint(name, i as u32));
            Ok::<_, ()>(metric)
        };
        let collected: Vec<_> = metrics(export).collect();
        assert_eq!(
            collected,
            vec![Ok(Metric::uint("a", 0)), Ok(Metric::uint("b", 1))]
        );
    }

    #[test]
    fn iteration_stops_after_error() {
        let mut calls = 0;
        let collected: Vec<_> = metrics(|i| {
            calls += 1;
            if i == 1 {
                Err("bus")
            } else {
                Ok(Some(Metric::int("x", -1)))
            }
        })
        .collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1], Err("bus"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn text_is_truncated() {
        let long = "x".repeat(METRIC_TEXT_LEN + 10);
        let Metric { value, .. } = Metric::text("t", &long);
        assert_eq!(value.to_string().len(), METRIC_TEXT_LEN);
    }
}
