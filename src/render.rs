use std::error::Error;
use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use crate::correlation::CorrelationMatrix;
use crate::pipeline::RenderModel;

// plotly_dark-ish palette
const BACKGROUND: RGBColor = RGBColor(17, 17, 17);
const FOREGROUND: RGBColor = RGBColor(242, 245, 250);
const UNDEFINED_CELL: RGBColor = RGBColor(90, 90, 90);

pub(crate) type Bounds = (Range<f64>, Range<f64>);

/// Padded axis ranges for the comparison chart; `None` when no series or
/// trendline has a point to draw.
pub(crate) fn comparison_bounds(model: &RenderModel) -> Option<Bounds> {
    let points = model
        .entity_series
        .iter()
        .flat_map(|s| s.points.iter().copied())
        .chain(model.trendlines.iter().flat_map(|t| t.fit.x_values.iter().copied().zip(t.fit.fitted_values.iter().copied())));
    padded_ranges(points)
}

/// Lines and markers per country plus dashed trendline(s).
pub(crate) fn draw_comparison(model: &RenderModel, (x_range, y_range): Bounds, output_file: &Path) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output_file, (1280, 800)).into_drawing_area();
    root.fill(&BACKGROUND)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&model.chart_title, ("sans-serif", 30).into_font().color(&FOREGROUND))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(model.x_axis_title.as_str())
        .y_desc(model.y_axis_title.as_str())
        .axis_desc_style(("sans-serif", 20).into_font().color(&FOREGROUND))
        .label_style(("sans-serif", 15).into_font().color(&FOREGROUND))
        .axis_style(FOREGROUND.mix(0.6))
        .bold_line_style(FOREGROUND.mix(0.15))
        .light_line_style(FOREGROUND.mix(0.05))
        .draw()?;

    for (idx, series) in model.entity_series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(series.points.iter().copied(), color.stroke_width(2)))?
            .label(series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(
            series
                .points
                .iter()
                .map(|&point| Circle::new(point, 4, color.filled())),
        )?;
    }

    for (idx, trendline) in model.trendlines.iter().enumerate() {
        // a single pooled line is drawn in the foreground colour
        let color = if model.trendlines.len() == 1 {
            FOREGROUND.to_rgba()
        } else {
            Palette99::pick(idx).to_rgba()
        };
        let mut line: Vec<(f64, f64)> = trendline
            .fit
            .x_values
            .iter()
            .copied()
            .zip(trendline.fit.fitted_values.iter().copied())
            .collect();
        line.sort_by(|a, b| a.0.total_cmp(&b.0));

        chart
            .draw_series(DashedLineSeries::new(line, 10, 6, color.stroke_width(2)))?
            .label(trendline.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .label_font(("sans-serif", 15).into_font().color(&FOREGROUND))
        .background_style(BACKGROUND.mix(0.8))
        .border_style(FOREGROUND.mix(0.4))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Correlation heatmap; undefined cells are grey and labelled "n/a".
pub(crate) fn draw_heatmap(matrix: &CorrelationMatrix, output_file: &Path) -> Result<(), Box<dyn Error>> {
    let cols = matrix.len();
    if cols == 0 {
        return Err("No columns to process".into());
    }

    let root = BitMapBackend::new(output_file, (1024, 1024)).into_drawing_area();
    root.fill(&BACKGROUND)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Correlation Heatmap", ("sans-serif", 30).into_font().color(&FOREGROUND))
        .margin(5)
        .x_label_area_size(60)
        .y_label_area_size(120)
        .build_cartesian_2d(0..cols as u32, 0..cols as u32)?;

    let label = |v: &u32| matrix.columns.get(*v as usize).cloned().unwrap_or_default();
    // row 0 sits at the top of the chart
    let row_label = |v: &u32| {
        (cols as u32)
            .checked_sub(*v + 1)
            .and_then(|i| matrix.columns.get(i as usize))
            .cloned()
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols)
        .y_labels(cols)
        .x_label_formatter(&label)
        .y_label_formatter(&row_label)
        .label_style(("sans-serif", 15).into_font().color(&FOREGROUND))
        .axis_style(FOREGROUND.mix(0.6))
        .draw()?;

    for (i, row) in matrix.cells.iter().enumerate() {
        for (j, &cell) in row.iter().enumerate() {
            let top = cols as u32 - i as u32 - 1;
            let (color, text) = match cell.value() {
                Some(value) => (heat_color(value), format!("{value:.2}")),
                None => (UNDEFINED_CELL, "n/a".to_string()),
            };
            chart.draw_series(std::iter::once(Rectangle::new(
                [(j as u32, top), (j as u32 + 1, top + 1)],
                color.filled(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                text,
                (j as u32, top + 1),
                ("sans-serif", 18).into_font().color(&FOREGROUND),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Blue for -1, black for 0, red for +1.
fn heat_color(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    if v >= 0.0 {
        RGBColor((255.0 * v) as u8, (60.0 * v) as u8, (40.0 * v) as u8)
    } else {
        RGBColor((40.0 * -v) as u8, (90.0 * -v) as u8, (255.0 * -v) as u8)
    }
}

/// Data ranges padded by 5% on each side; `None` when there are no points.
fn padded_ranges(points: impl Iterator<Item = (f64, f64)>) -> Option<Bounds> {
    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    for (x, y) in points.filter(|(x, y)| x.is_finite() && y.is_finite()) {
        bounds = Some(match bounds {
            None => (x, x, y, y),
            Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
        });
    }
    let (x0, x1, y0, y1) = bounds?;
    Some((pad(x0, x1), pad(y0, y1)))
}

fn pad(min: f64, max: f64) -> Range<f64> {
    let span = if max > min { max - min } else { min.abs().max(1.0) };
    (min - span * 0.05)..(max + span * 0.05)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EntitySeries;

    #[test]
    fn ranges_cover_all_points() {
        let (x, y) = padded_ranges([(1.0, 10.0), (3.0, 20.0), (f64::NAN, 5.0)].into_iter()).unwrap();
        assert!(x.start < 1.0 && x.end > 3.0);
        assert!(y.start < 10.0 && y.end > 20.0);
        assert!(padded_ranges(std::iter::empty()).is_none());
    }

    #[test]
    fn single_point_gets_a_nonempty_range() {
        let (x, _) = padded_ranges(std::iter::once((70.0, 1.0))).unwrap();
        assert!(x.start < 70.0 && x.end > 70.0);
    }

    fn model(points: Vec<(f64, f64)>) -> RenderModel {
        RenderModel {
            page_title: "Trend Analysis".into(),
            chart_title: "Life Expectancy vs CO2 Per Capita".into(),
            x_axis_title: "Life Expectancy".into(),
            y_axis_title: "CO2 Per Capita".into(),
            x_axis_variable: "Life expectancy".into(),
            y_axis_variable: "co2_per_capita".into(),
            joined_rows: points.len(),
            entity_series: vec![EntitySeries {
                entity: "France".into(),
                label: "France Life expectancy vs co2_per_capita".into(),
                points,
            }],
            trendlines: vec![],
            correlation: CorrelationMatrix { columns: vec![], cells: vec![] },
            warnings: vec![],
        }
    }

    #[test]
    fn bounds_need_at_least_one_point() {
        assert!(comparison_bounds(&model(vec![])).is_none());
        let (x, y) = comparison_bounds(&model(vec![(78.0, 4.5), (80.0, 5.5)])).unwrap();
        assert!(x.start < 78.0 && x.end > 80.0);
        assert!(y.start < 4.5 && y.end > 5.5);
    }

    #[test]
    fn heat_color_endpoints() {
        assert_eq!(heat_color(0.0), RGBColor(0, 0, 0));
        assert_eq!(heat_color(1.0), RGBColor(255, 60, 40));
        assert_eq!(heat_color(-1.0), RGBColor(40, 90, 255));
    }
}
