//! Shared numeric constants for the note board.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.25;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 3.0;

/// Zoom change per wheel pixel when zooming with ctrl/meta held.
pub const WHEEL_ZOOM_STEP: f64 = 0.001;

// ── Notes ───────────────────────────────────────────────────────

/// Minimum note width in world units.
pub const MIN_NOTE_WIDTH: f64 = 120.0;

/// Minimum note height in world units.
pub const MIN_NOTE_HEIGHT: f64 = 80.0;

/// Width of a note created by "add note".
pub const DEFAULT_NOTE_WIDTH: f64 = 200.0;

/// Height of a note created by "add note".
pub const DEFAULT_NOTE_HEIGHT: f64 = 150.0;

/// Color tag of a note created by "add note".
pub const DEFAULT_NOTE_COLOR: &str = "yellow";

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;
