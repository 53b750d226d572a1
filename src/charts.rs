use crate::app::Message;
use crate::timeseries::SeriesWindow;
use iced::widget::canvas::{Cache, Frame, Geometry};
use iced::Size;
use plotters::chart::ChartBuilder;
use plotters::series::LineSeries;
use plotters::style::RGBColor;
use plotters_iced::{Chart, DrawingBackend, Renderer};

const PULSE_COLOR: RGBColor = RGBColor(16, 185, 129);
const BPM_COLOR: RGBColor = RGBColor(239, 68, 68);
const SPO2_COLOR: RGBColor = RGBColor(59, 130, 246);
const BACKGROUND: RGBColor = RGBColor(30, 41, 59);
const AXIS_COLOR: RGBColor = RGBColor(148, 163, 184);

/// Cached chart geometry, invalidated when its window changes.
///
/// A window is identified by the dashboard session it belongs to plus its
/// push revision; revisions restart with every session.
pub struct ChartCache {
    cache: Cache,
    drawn: (u64, u64),
}

impl ChartCache {
    pub fn new() -> Self {
        Self { cache: Cache::new(), drawn: (0, 0) }
    }

    /// Drop the cached geometry if `series` changed since the last sync.
    /// Returns true when the chart will be rebuilt on the next draw.
    pub fn sync(&mut self, session: u64, series: &SeriesWindow) -> bool {
        let current = (session, series.revision());
        if current == self.drawn {
            return false;
        }
        self.drawn = current;
        self.cache.clear();
        true
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}

/// One live chart backed by a series window.
///
/// Geometry is cached until the dashboard signals a redraw; the chart is
/// then rebuilt straight from the buffered slots with no transition.
pub struct SeriesChart<'a> {
    pub series: &'a SeriesWindow,
    pub cache: &'a Cache,
    pub caption: &'static str,
    pub color: RGBColor,
    pub show_axis: bool,
}

impl<'a> SeriesChart<'a> {
    pub fn waveform(series: &'a SeriesWindow, cache: &'a Cache) -> Self {
        Self { series, cache, caption: "Pulse Waveform (PPG)", color: PULSE_COLOR, show_axis: false }
    }

    pub fn heart_rate(series: &'a SeriesWindow, cache: &'a Cache) -> Self {
        Self { series, cache, caption: "Heart Rate", color: BPM_COLOR, show_axis: true }
    }

    pub fn spo2(series: &'a SeriesWindow, cache: &'a Cache) -> Self {
        Self { series, cache, caption: "SpO2", color: SPO2_COLOR, show_axis: true }
    }
}

impl<'a> Chart<Message> for SeriesChart<'a> {
    type State = ();

    fn draw<R: Renderer, F: Fn(&mut Frame)>(&self, renderer: &R, bounds: Size, draw_fn: F) -> Geometry {
        renderer.draw_cache(self.cache, bounds, draw_fn)
    }

    fn build_chart<DB: DrawingBackend>(&self, _state: &Self::State, mut builder: ChartBuilder<DB>) {
        let (min_y, max_y) = self.series.display_range();
        let max_x = self.series.capacity().saturating_sub(1).max(1);

        let Ok(mut chart) = builder
            .margin(10)
            .caption(self.caption, ("sans-serif", 16, &AXIS_COLOR))
            .x_label_area_size(0)
            .y_label_area_size(if self.show_axis { 40 } else { 0 })
            .build_cartesian_2d(0..max_x, min_y..max_y)
        else {
            log::warn!("Could not lay out {} chart", self.caption);
            return;
        };

        let _ = chart.plotting_area().fill(&BACKGROUND);

        if self.show_axis {
            let _ = chart
                .configure_mesh()
                .disable_x_mesh()
                .axis_style(AXIS_COLOR)
                .label_style(("sans-serif", 12, &AXIS_COLOR))
                .y_labels(4)
                .draw();
        }

        let _ = chart.draw_series(LineSeries::new(self.series.indexed_values(), &self.color));
    }
}
