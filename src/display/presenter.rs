use super::lcd::TextSurface;
use crate::timekeeping::ColorTheme;
use crate::weather::{WeatherField, WeatherSnapshot};
use crate::Result;

const NO_WEATHER_LABEL: &str = "Weather";
const NO_WEATHER_VALUE: &str = "no weather yet";

/// Clock colour. `Off` blanks the display without powering it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockColor {
    Off,
    Night,
    Day,
}

impl From<ColorTheme> for ClockColor {
    fn from(theme: ColorTheme) -> Self {
        match theme {
            ColorTheme::Day => ClockColor::Day,
            ColorTheme::Night => ClockColor::Night,
        }
    }
}

/// Owns the rendering surface. No timers; every call is idempotent.
pub trait DisplayPresenter {
    fn show_clock(
        &mut self,
        hour_12: u8,
        minute: u8,
        colon_visible: bool,
        color: ClockColor,
    ) -> Result<()>;
    fn show_weather_field(
        &mut self,
        snapshot: Option<&WeatherSnapshot>,
        field_index: usize,
    ) -> Result<()>;
    fn set_blank(&mut self, color: ClockColor) -> Result<()>;
    fn show_message(&mut self, text: &str) -> Result<()>;
}

/// Draw the clock label, e.g. `9:05` or `12 30`.
pub fn clock_label(hour_12: u8, minute: u8, colon_visible: bool) -> String {
    let sep = if colon_visible { ':' } else { ' ' };
    format!("{hour_12}{sep}{minute:02}")
}

/// Centre `text` in `width` columns; the label width changes with the hour
/// digit count so this runs on every render.
pub fn centered(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }
    let left = (width - len) / 2;
    format!("{:left$}{text}{:right$}", "", "", right = width - len - left)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    rows: Vec<String>,
    backlight: bool,
}

/// Character-LCD presenter: the clock sits on the upper-middle row; weather
/// uses that row for the field name and the next one for its value.
pub struct LcdPresenter<S: TextSurface> {
    surface: S,
    last: Option<Frame>,
}

impl<S: TextSurface> LcdPresenter<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            last: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn width(&self) -> usize {
        usize::from(self.surface.cols())
    }

    fn focus_row(&self) -> usize {
        usize::from(self.surface.rows().saturating_sub(1) / 2)
    }

    fn blank_frame(&self, backlight: bool) -> Frame {
        Frame {
            rows: vec![" ".repeat(self.width()); usize::from(self.surface.rows())],
            backlight,
        }
    }

    fn draw(&mut self, frame: Frame) -> Result<()> {
        if self.last.as_ref() == Some(&frame) {
            return Ok(());
        }
        let prev = self.last.take();
        if prev.as_ref().map(|p| p.backlight) != Some(frame.backlight) {
            self.surface.set_backlight(frame.backlight)?;
        }
        for (idx, row) in frame.rows.iter().enumerate() {
            let unchanged = prev.as_ref().and_then(|p| p.rows.get(idx)) == Some(row);
            if !unchanged {
                self.surface.write_row(idx as u8, row)?;
            }
        }
        self.last = Some(frame);
        Ok(())
    }
}

impl<S: TextSurface> DisplayPresenter for LcdPresenter<S> {
    fn show_clock(
        &mut self,
        hour_12: u8,
        minute: u8,
        colon_visible: bool,
        color: ClockColor,
    ) -> Result<()> {
        if color == ClockColor::Off {
            return self.set_blank(color);
        }
        let mut frame = self.blank_frame(true);
        let row = self.focus_row();
        frame.rows[row] = centered(&clock_label(hour_12, minute, colon_visible), self.width());
        self.draw(frame)
    }

    fn show_weather_field(
        &mut self,
        snapshot: Option<&WeatherSnapshot>,
        field_index: usize,
    ) -> Result<()> {
        let (label, value) = match snapshot {
            Some(snap) => {
                let field = WeatherField::from_index(field_index);
                (field.label().to_string(), snap.field_value(field))
            }
            None => (NO_WEATHER_LABEL.to_string(), NO_WEATHER_VALUE.to_string()),
        };
        let mut frame = self.blank_frame(true);
        let row = self.focus_row();
        let width = self.width();
        frame.rows[row] = centered(&label, width);
        if let Some(next) = frame.rows.get_mut(row + 1) {
            *next = centered(&value, width);
        }
        self.draw(frame)
    }

    fn set_blank(&mut self, color: ClockColor) -> Result<()> {
        let frame = self.blank_frame(color != ClockColor::Off);
        self.draw(frame)
    }

    fn show_message(&mut self, text: &str) -> Result<()> {
        let mut frame = self.blank_frame(true);
        frame.rows[0] = centered(text, self.width());
        self.draw(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::Units;

    #[derive(Default)]
    struct MemorySurface {
        cols: u8,
        rows: Vec<String>,
        backlight: bool,
        writes: usize,
    }

    impl MemorySurface {
        fn new(cols: u8, rows: u8) -> Self {
            Self {
                cols,
                rows: vec![String::new(); usize::from(rows)],
                backlight: true,
                writes: 0,
            }
        }
    }

    impl TextSurface for MemorySurface {
        fn cols(&self) -> u8 {
            self.cols
        }

        fn rows(&self) -> u8 {
            self.rows.len() as u8
        }

        fn write_row(&mut self, row: u8, text: &str) -> Result<()> {
            self.rows[usize::from(row)] = text.to_string();
            self.writes += 1;
            Ok(())
        }

        fn set_backlight(&mut self, on: bool) -> Result<()> {
            self.backlight = on;
            Ok(())
        }
    }

    fn presenter() -> LcdPresenter<MemorySurface> {
        LcdPresenter::new(MemorySurface::new(20, 4))
    }

    #[test]
    fn clock_is_centred_on_focus_row() {
        let mut p = presenter();
        p.show_clock(9, 5, true, ClockColor::Day).unwrap();
        assert_eq!(p.surface().rows[1], "        9:05        ");
        p.show_clock(12, 30, false, ClockColor::Night).unwrap();
        assert_eq!(p.surface().rows[1], "       12 30        ");
        assert!(p.surface().backlight);
    }

    #[test]
    fn same_clock_twice_is_identical_and_writes_nothing() {
        let mut p = presenter();
        p.show_clock(3, 7, true, ClockColor::Day).unwrap();
        let rows = p.surface().rows.clone();
        let writes = p.surface().writes;
        p.show_clock(3, 7, true, ClockColor::Day).unwrap();
        assert_eq!(p.surface().rows, rows);
        assert_eq!(p.surface().writes, writes);
    }

    #[test]
    fn blank_off_turns_backlight_off() {
        let mut p = presenter();
        p.show_clock(3, 7, true, ClockColor::Day).unwrap();
        p.set_blank(ClockColor::Off).unwrap();
        assert!(!p.surface().backlight);
        assert!(p.surface().rows.iter().all(|r| r.trim().is_empty()));
    }

    #[test]
    fn weather_placeholder_without_snapshot() {
        let mut p = presenter();
        p.show_weather_field(None, 3).unwrap();
        assert_eq!(p.surface().rows[1].trim(), "Weather");
        assert_eq!(p.surface().rows[2].trim(), "no weather yet");
    }

    #[test]
    fn weather_field_label_and_value() {
        let snap = WeatherSnapshot {
            temperature: 18.2,
            conditions: "Rain".into(),
            location: "Leeds, GB".into(),
            feels_like: None,
            humidity: Some(91),
            wind_speed: Some(4.0),
            units: Units::Metric,
        };
        let mut p = presenter();
        p.show_weather_field(Some(&snap), 1).unwrap();
        assert_eq!(p.surface().rows[1].trim(), "Temp");
        assert_eq!(p.surface().rows[2].trim(), "18C");
        p.show_weather_field(Some(&snap), 9).unwrap();
        assert_eq!(p.surface().rows[2].trim(), "91%");
    }

    #[test]
    fn two_row_display_uses_both_rows_for_weather() {
        let mut p = LcdPresenter::new(MemorySurface::new(16, 2));
        p.show_weather_field(None, 0).unwrap();
        assert_eq!(p.surface().rows[0].trim(), "Weather");
        assert_eq!(p.surface().rows[1].trim(), "no weather yet");
    }

    #[test]
    fn centred_clips_overlong_text() {
        assert_eq!(centered("abcdef", 4), "abcd");
        assert_eq!(centered("ab", 5), " ab  ");
    }
}
