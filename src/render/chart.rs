use log::warn;
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("chart specification has no mark")]
    MissingMark,
    #[error("unsupported mark definition: {0}")]
    InvalidMark(String),
    #[error("data value for '{field}' is not numeric")]
    NonNumeric {
        field: String,
    },
}

/// Region a chart draws into. Holds the rendered lines for the terminal, or
/// an inline error when rendering failed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MountPoint {
    pub lines: Vec<String>,
    pub error: Option<String>,
}

impl MountPoint {
    pub fn clear(&mut self) {
        self.lines.clear();
        self.error = None;
    }

    pub fn show_error(&mut self, message: String) {
        self.lines.clear();
        self.error = Some(message);
    }
}

/// Disposer returned by a renderer. Runs once, on `dispose` or on drop.
pub struct ChartHandle {
    disposer: Option<Box<dyn FnOnce() + Send>>,
}

impl ChartHandle {
    pub fn new(disposer: impl FnOnce() + Send + 'static) -> Self {
        Self { disposer: Some(Box::new(disposer)) }
    }

    pub fn noop() -> Self {
        Self { disposer: None }
    }

    pub fn dispose(mut self) {
        self.run_disposer();
    }

    fn run_disposer(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl Drop for ChartHandle {
    fn drop(&mut self) {
        self.run_disposer();
    }
}

impl std::fmt::Debug for ChartHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartHandle").field("live", &self.disposer.is_some()).finish()
    }
}

pub trait ChartRenderer {
    fn mount(&self, spec: &JsonValue, target: &mut MountPoint) -> Result<ChartHandle, ChartError>;
}

/// Keeps one mounted chart alive. Re-renders only when the spec changes and
/// disposes the previous chart on replacement or teardown. Render failures
/// stay inside the mount point.
pub struct ChartView<R: ChartRenderer> {
    renderer: R,
    mount: MountPoint,
    current: Option<(JsonValue, ChartHandle)>,
}

impl<R: ChartRenderer> ChartView<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer, mount: MountPoint::default(), current: None }
    }

    pub fn mount_point(&self) -> &MountPoint {
        &self.mount
    }

    pub fn update(&mut self, spec: &JsonValue) -> &MountPoint {
        if self.current.as_ref().map(|(shown, _)| shown == spec).unwrap_or(false) {
            return &self.mount;
        }

        self.teardown();
        match self.renderer.mount(spec, &mut self.mount) {
            Ok(handle) => {
                self.current = Some((spec.clone(), handle));
            }
            Err(e) => {
                warn!("Chart rendering failed: {}", e);
                self.mount.show_error(format!("Could not render chart: {}", e));
            }
        }
        &self.mount
    }

    pub fn teardown(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.dispose();
        }
        self.mount.clear();
    }
}

impl<R: ChartRenderer> Drop for ChartView<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub fn mark_type(spec: &JsonValue) -> Result<String, ChartError> {
    match spec.get("mark") {
        None => Err(ChartError::MissingMark),
        Some(JsonValue::String(mark)) => Ok(mark.clone()),
        Some(JsonValue::Object(def)) =>
            def
                .get("type")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| ChartError::InvalidMark(JsonValue::Object(def.clone()).to_string())),
        Some(other) => Err(ChartError::InvalidMark(other.to_string())),
    }
}

fn encoding_field<'a>(spec: &'a JsonValue, channel: &str) -> Option<&'a str> {
    spec.get("encoding")?.get(channel)?.get("field")?.as_str()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn format_label(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}

/// Draws Vega-Lite specs as text: a summary line, plus horizontal bars for
/// bar and arc marks with inline data.
#[derive(Debug, Clone)]
pub struct TerminalChartRenderer {
    pub width: usize,
}

impl Default for TerminalChartRenderer {
    fn default() -> Self {
        Self { width: 40 }
    }
}

impl TerminalChartRenderer {
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    fn bars(
        &self,
        rows: &[JsonValue],
        label_field: &str,
        value_field: &str
    ) -> Result<Vec<String>, ChartError> {
        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let value = row
                .get(value_field)
                .and_then(JsonValue::as_f64)
                .ok_or_else(|| ChartError::NonNumeric { field: value_field.to_string() })?;
            points.push((format_label(row.get(label_field)), value));
        }

        let max = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        let label_width = points.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);

        Ok(
            points
                .into_iter()
                .map(|(label, value)| {
                    let len = if max > 0.0 && value > 0.0 {
                        ((value / max) * (self.width as f64)).round() as usize
                    } else {
                        0
                    };
                    format!(
                        "{:<lw$} | {} {}",
                        label,
                        "█".repeat(len),
                        format_number(value),
                        lw = label_width
                    )
                })
                .collect()
        )
    }
}

impl ChartRenderer for TerminalChartRenderer {
    fn mount(&self, spec: &JsonValue, target: &mut MountPoint) -> Result<ChartHandle, ChartError> {
        let mark = mark_type(spec)?;
        let rows = spec
            .get("data")
            .and_then(|d| d.get("values"))
            .and_then(JsonValue::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut lines = vec![format!("[{} chart, {} rows]", mark, rows.len())];

        let channels = match mark.as_str() {
            "bar" => Some(("x", "y")),
            "arc" => Some(("color", "theta")),
            _ => None,
        };
        if let Some((label_channel, value_channel)) = channels {
            if let (Some(label), Some(value)) = (
                encoding_field(spec, label_channel),
                encoding_field(spec, value_channel),
            ) {
                lines.extend(self.bars(rows, label, value)?);
            }
        }

        target.error = None;
        target.lines = lines;
        Ok(ChartHandle::noop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::sync::Arc;

    struct CountingRenderer {
        mounts: Arc<AtomicUsize>,
        disposals: Arc<AtomicUsize>,
    }

    impl ChartRenderer for CountingRenderer {
        fn mount(
            &self,
            spec: &JsonValue,
            target: &mut MountPoint
        ) -> Result<ChartHandle, ChartError> {
            mark_type(spec)?;
            self.mounts.fetch_add(1, Ordering::SeqCst);
            target.lines = vec!["chart".into()];
            let disposals = Arc::clone(&self.disposals);
            Ok(
                ChartHandle::new(move || {
                    disposals.fetch_add(1, Ordering::SeqCst);
                })
            )
        }
    }

    fn counting_view() -> (ChartView<CountingRenderer>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let mounts = Arc::new(AtomicUsize::new(0));
        let disposals = Arc::new(AtomicUsize::new(0));
        let view = ChartView::new(CountingRenderer {
            mounts: Arc::clone(&mounts),
            disposals: Arc::clone(&disposals),
        });
        (view, mounts, disposals)
    }

    #[test]
    fn same_spec_is_not_rendered_twice() {
        let (mut view, mounts, disposals) = counting_view();
        let spec = json!({ "mark": "bar" });
        view.update(&spec);
        view.update(&spec);
        assert_eq!(mounts.load(Ordering::SeqCst), 1);
        assert_eq!(disposals.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn replacing_and_dropping_dispose_previous_chart() {
        let (mut view, mounts, disposals) = counting_view();
        view.update(&json!({ "mark": "bar" }));
        view.update(&json!({ "mark": "line" }));
        assert_eq!(mounts.load(Ordering::SeqCst), 2);
        assert_eq!(disposals.load(Ordering::SeqCst), 1);

        drop(view);
        assert_eq!(disposals.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn render_failure_shows_inline_error() {
        let (mut view, _, _) = counting_view();
        let mount = view.update(
            &json!({ "$schema": "https://vega.github.io/schema/vega-lite/v5.json" })
        );
        assert!(mount.lines.is_empty());
        assert!(mount.error.as_deref().unwrap().contains("no mark"));
    }

    #[test]
    fn terminal_renderer_draws_bars() {
        let spec = json!({
            "mark": "bar",
            "data": { "values": [
                { "ocean_proximity": "INLAND", "value": 100.0 },
                { "ocean_proximity": "NEAR BAY", "value": 50.0 }
            ]},
            "encoding": {
                "x": { "field": "ocean_proximity", "type": "nominal" },
                "y": { "field": "value", "type": "quantitative" }
            }
        });
        let mut mount = MountPoint::default();
        TerminalChartRenderer::new(10).mount(&spec, &mut mount).unwrap();

        assert_eq!(mount.lines[0], "[bar chart, 2 rows]");
        assert_eq!(mount.lines[1], format!("INLAND   | {} 100", "█".repeat(10)));
        assert_eq!(mount.lines[2], format!("NEAR BAY | {} 50", "█".repeat(5)));
    }

    #[test]
    fn arc_mark_object_uses_theta_and_color() {
        let spec = json!({
            "mark": { "type": "arc", "outerRadius": 120 },
            "data": { "values": [{ "kind": "a", "value": 3 }] },
            "encoding": {
                "theta": { "field": "value", "type": "quantitative" },
                "color": { "field": "kind", "type": "nominal" }
            }
        });
        let mut mount = MountPoint::default();
        TerminalChartRenderer::new(4).mount(&spec, &mut mount).unwrap();
        assert_eq!(mount.lines, vec!["[arc chart, 1 rows]".to_string(), "a | ████ 3".to_string()]);
    }

    #[test]
    fn non_numeric_values_fail() {
        let spec = json!({
            "mark": "bar",
            "data": { "values": [{ "k": "a", "v": "lots" }] },
            "encoding": { "x": { "field": "k" }, "y": { "field": "v" } }
        });
        let mut mount = MountPoint::default();
        let err = TerminalChartRenderer::default().mount(&spec, &mut mount).unwrap_err();
        assert_eq!(err, ChartError::NonNumeric { field: "v".into() });
    }
}
