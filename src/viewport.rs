use crate::config::ViewportConfig;
use serde::Serialize;

/// Pan/zoom applied to the whole scene: `screen = diagram * scale + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub pan_x: f32,
    pub pan_y: f32,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.pan_x, y * self.scale + self.pan_y)
    }

    pub fn to_diagram(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pan_x) / self.scale, (y - self.pan_y) / self.scale)
    }

    /// Value for an SVG `transform` attribute on the scene group.
    pub fn svg_transform(&self) -> String {
        format!(
            "translate({:.2} {:.2}) scale({:.4})",
            self.pan_x, self.pan_y, self.scale
        )
    }
}

/// Owns one viewport transform and keeps its scale inside the configured
/// bounds. Layout coordinates are never touched.
#[derive(Debug, Clone)]
pub struct ViewportController {
    transform: Viewport,
    min_scale: f32,
    max_scale: f32,
    margin: f32,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: &ViewportConfig) -> Self {
        let min_scale = config.min_scale.max(f32::EPSILON);
        let max_scale = config.max_scale.max(min_scale);
        Self {
            transform: Viewport {
                scale: 1.0_f32.clamp(min_scale, max_scale),
                ..Viewport::default()
            },
            min_scale,
            max_scale,
            margin: config.margin.max(0.0),
        }
    }

    pub fn transform(&self) -> Viewport {
        self.transform
    }

    pub fn scale(&self) -> f32 {
        self.transform.scale
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale)
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.transform.pan_x += dx;
            self.transform.pan_y += dy;
        }
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom_to(self.transform.scale + delta);
    }

    /// Sets the scale, clamped to the bounds. NaN is ignored.
    pub fn zoom_to(&mut self, scale: f32) {
        if scale.is_nan() {
            return;
        }
        self.transform.scale = scale.clamp(self.min_scale, self.max_scale);
    }

    /// Zooms while keeping the diagram point under `anchor` (screen space)
    /// where it is, e.g. under the mouse cursor.
    pub fn zoom_around(&mut self, delta: f32, anchor: (f32, f32)) {
        let fixed = self.transform.to_diagram(anchor.0, anchor.1);
        self.zoom_by(delta);
        self.transform.pan_x = anchor.0 - fixed.0 * self.transform.scale;
        self.transform.pan_y = anchor.1 - fixed.1 * self.transform.scale;
    }

    pub fn reset(&mut self) {
        self.transform = Viewport::default();
        self.zoom_to(1.0);
    }

    /// Centers scaled content that is narrower than the viewport; wider
    /// content starts at the margin. Vertically the content hangs from the
    /// top margin.
    pub fn center_on(&mut self, content: (f32, f32), viewport: (f32, f32)) {
        let scaled_width = content.0 * self.transform.scale;
        self.transform.pan_x = if scaled_width < viewport.0 {
            (viewport.0 - scaled_width) / 2.0
        } else {
            self.margin
        };
        self.transform.pan_y = self.margin;
    }

    /// Largest in-bounds scale at which the content fits inside the viewport
    /// minus margins, then centered.
    pub fn fit(&mut self, content: (f32, f32), viewport: (f32, f32)) {
        let avail_w = viewport.0 - self.margin * 2.0;
        let avail_h = viewport.1 - self.margin * 2.0;
        if content.0 > 0.0 && content.1 > 0.0 && avail_w > 0.0 && avail_h > 0.0 {
            self.zoom_to((avail_w / content.0).min(avail_h / content.1));
        } else {
            self.zoom_to(1.0);
        }
        self.center_on(content, viewport);
    }
}
