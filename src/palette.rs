use plotters::style::RGBColor;

/// Categorical palette for hue levels.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    /// The ten-colour palette used by matplotlib and d3.
    pub fn category10() -> Self {
        Self {
            colors: vec![
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
                RGBColor(148, 103, 189),
                RGBColor(140, 86, 75),
                RGBColor(227, 119, 194),
                RGBColor(127, 127, 127),
                RGBColor(188, 189, 34),
                RGBColor(23, 190, 207),
            ],
        }
    }

    /// Colour for the `index`-th group, cycling when groups outnumber colours.
    pub fn color(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }
}

/// Blue-white-red scale over [-1, 1], centred at zero.
#[derive(Debug, Clone, Copy)]
pub struct DivergingScale {
    low: RGBColor,
    mid: RGBColor,
    high: RGBColor,
}

impl DivergingScale {
    pub fn coolwarm() -> Self {
        Self {
            low: RGBColor(59, 76, 192),
            mid: RGBColor(221, 221, 221),
            high: RGBColor(180, 4, 38),
        }
    }

    /// Colour for a coefficient; values outside [-1, 1] are clamped.
    pub fn color(&self, value: f64) -> RGBColor {
        let v = value.clamp(-1.0, 1.0);
        if v < 0.0 {
            lerp(self.mid, self.low, -v)
        } else {
            lerp(self.mid, self.high, v)
        }
    }

    /// Text colour that stays readable on top of `color(value)`.
    pub fn text_color(&self, value: f64) -> RGBColor {
        if value.abs() > 0.6 {
            RGBColor(255, 255, 255)
        } else {
            RGBColor(0, 0, 0)
        }
    }
}

fn lerp(from: RGBColor, to: RGBColor, t: f64) -> RGBColor {
    let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}
