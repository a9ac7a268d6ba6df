//! Text rendering surface

use kiblat_compass::needle::{Tick, dial_ticks};
use kiblat_compass::{CompassState, Locale, RenderSurface};

/// Prints each needle update on its own line
pub struct TextSurface {
    locale: Locale,
    major_ticks: Vec<Tick>,
    errors_shown: usize,
    waiting_shown: bool,
}

impl TextSurface {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            major_ticks: dial_ticks().filter(|tick| tick.major).collect(),
            errors_shown: 0,
            waiting_shown: false,
        }
    }

    /// Major dial ticks with the one nearest `pointing` bracketed.
    fn dial(&self, pointing: f64) -> String {
        let step = 360.0 / self.major_ticks.len() as f64;
        let nearest = (pointing.rem_euclid(360.0) / step).round() as usize % self.major_ticks.len();
        self.major_ticks
            .iter()
            .enumerate()
            .map(|(i, tick)| {
                let label = match self.locale.cardinal(tick.degrees) {
                    Some(cardinal) => cardinal.to_string(),
                    None => format!("{:.0}", tick.degrees),
                };
                if i == nearest {
                    format!("[{label}]")
                } else {
                    label
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl RenderSurface for TextSurface {
    fn present(&mut self, state: &CompassState) {
        let errors: Vec<_> = state.errors().collect();
        for error in &errors[self.errors_shown.min(errors.len())..] {
            eprintln!("! {}", error.user_message(self.locale));
        }
        self.errors_shown = errors.len();

        if state.position().is_none() && state.position_error().is_none() {
            if !self.waiting_shown {
                println!("{}", self.locale.locating());
                self.waiting_shown = true;
            }
            return;
        }

        let Some(needle) = state.needle() else {
            return;
        };
        let heading = state.heading().map_or(0.0, |h| h.degrees);
        println!(
            "{}  {}",
            self.locale.frame_line(heading, needle),
            self.dial(needle.normalized())
        );
    }
}
