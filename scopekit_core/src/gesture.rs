// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag-to-rescale gesture recognition.
//!
//! A left-button drag on a scope adjusts one of its parameters (for example
//! the dB range or maximum frequency of a spectrum). The first few pixels of
//! movement decide a [`RescaleDirection`] which then stays fixed until the
//! button is released:
//!
//! ```text
//!   Idle ──press──► Armed ──moved ≥ min_dist──► Locked ──release──► Idle
//!                     │                            │
//!                     └────────release─────────────┘
//! ```
//!
//! The move that locks the direction produces nothing. Every later move
//! yields a [`DragEvent`] carrying the displacement since the previous one.
//! The first of these is measured from the press point and normalised to
//! unit steps per axis, so the threshold distance is not applied as one large
//! jump.

use kurbo::{Point, Vec2};

/// Axis a drag gesture was locked to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RescaleDirection {
    /// Mostly vertical.
    North,
    /// Diagonal, up-right or down-left.
    Northeast,
    /// Mostly horizontal.
    East,
    /// Diagonal, down-right or up-left.
    Southeast,
}

impl RescaleDirection {
    /// Classifies a displacement.
    ///
    /// `vertical_threshold` is the `|dy/dx|` ratio above which a move counts
    /// as vertical; below its inverse it counts as horizontal.
    #[must_use]
    pub fn classify(d: Vec2, vertical_threshold: f64) -> Self {
        if d.x == 0.0 {
            return Self::North;
        }
        let ratio = d.y / d.x;
        if ratio.abs() > vertical_threshold {
            Self::North
        } else if ratio.abs() < 1.0 / vertical_threshold {
            Self::East
        } else if ratio < 0.0 {
            Self::Northeast
        } else {
            Self::Southeast
        }
    }
}

/// Keyboard modifiers held when a gesture started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Shift key.
    pub shift: bool,
    /// Control key.
    pub ctrl: bool,
    /// Alt/Option key.
    pub alt: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
    };

    /// Only shift held.
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// Mouse button of a press event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button. Starts rescale gestures.
    Left,
    /// Secondary button.
    Right,
    /// Middle button.
    Middle,
}

/// One step of a locked drag gesture, handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragEvent {
    /// Movement since the previous step, in widget pixels.
    pub displacement: Vec2,
    /// Locked direction of the gesture.
    pub direction: RescaleDirection,
    /// Modifiers held at press time.
    pub modifiers: Modifiers,
}

/// Thresholds for gesture recognition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RescaleConfig {
    /// Manhattan distance the pointer must travel before a direction locks.
    pub min_dist: f64,
    /// `|dy/dx|` ratio separating vertical from diagonal moves.
    pub vertical_threshold: f64,
}

impl RescaleConfig {
    /// Default thresholds: 4 px and a ratio of 2.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            min_dist: 4.0,
            vertical_threshold: 2.0,
        }
    }
}

impl Default for RescaleConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Gesture state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GestureState {
    /// No button held.
    #[default]
    Idle,
    /// Button held, direction not yet decided.
    Armed {
        /// Press position.
        start: Point,
        /// Modifiers held at press time.
        modifiers: Modifiers,
    },
    /// Direction decided; moves produce drag events.
    Locked {
        /// Point the next displacement is measured from.
        anchor: Point,
        /// Locked direction.
        direction: RescaleDirection,
        /// Modifiers held at press time.
        modifiers: Modifiers,
        /// Whether the normalised first step has been emitted.
        first_step_done: bool,
    },
}

/// Recognises rescale gestures from raw pointer events.
#[derive(Clone, Debug, Default)]
pub struct GestureRescaler {
    config: RescaleConfig,
    state: GestureState,
}

impl GestureRescaler {
    /// Creates an idle rescaler.
    #[must_use]
    pub fn new(config: RescaleConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &GestureState {
        &self.state
    }

    /// Locked direction, if any.
    #[must_use]
    pub const fn direction(&self) -> Option<RescaleDirection> {
        match self.state {
            GestureState::Locked { direction, .. } => Some(direction),
            _ => None,
        }
    }

    /// Returns `true` between a left press and its release.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    /// Handles a button press. Only the left button arms a gesture.
    pub fn press(&mut self, at: Point, button: MouseButton, modifiers: Modifiers) {
        if button == MouseButton::Left {
            self.state = GestureState::Armed {
                start: at,
                modifiers,
            };
        }
    }

    /// Handles pointer motion with the button held.
    ///
    /// Returns a drag step for every move after the one that locked the
    /// direction.
    pub fn drag(&mut self, to: Point) -> Option<DragEvent> {
        match self.state {
            GestureState::Idle => None,
            GestureState::Armed { start, modifiers } => {
                let moved = to - start;
                if moved.x.abs() + moved.y.abs() >= self.config.min_dist {
                    self.state = GestureState::Locked {
                        anchor: start,
                        direction: RescaleDirection::classify(
                            moved,
                            self.config.vertical_threshold,
                        ),
                        modifiers,
                        first_step_done: false,
                    };
                }
                None
            }
            GestureState::Locked {
                anchor,
                direction,
                modifiers,
                first_step_done,
            } => {
                let raw = to - anchor;
                let displacement = if first_step_done {
                    raw
                } else {
                    Vec2::new(unit(raw.x), unit(raw.y))
                };
                self.state = GestureState::Locked {
                    anchor: to,
                    direction,
                    modifiers,
                    first_step_done: true,
                };
                Some(DragEvent {
                    displacement,
                    direction,
                    modifiers,
                })
            }
        }
    }

    /// Handles a button release.
    ///
    /// Returns `true` if a gesture was in progress.
    pub fn release(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = GestureState::Idle;
        was_active
    }
}

/// `-1`, `0` or `1` depending on the sign of `v`.
fn unit(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rescaler() -> GestureRescaler {
        GestureRescaler::new(RescaleConfig::standard())
    }

    #[test]
    fn classify_matches_ratio_bands() {
        let thr = 2.0;
        assert_eq!(RescaleDirection::classify(Vec2::new(0.0, 5.0), thr), RescaleDirection::North);
        assert_eq!(RescaleDirection::classify(Vec2::new(1.0, 3.0), thr), RescaleDirection::North);
        assert_eq!(RescaleDirection::classify(Vec2::new(5.0, 1.0), thr), RescaleDirection::East);
        assert_eq!(
            RescaleDirection::classify(Vec2::new(3.0, -3.0), thr),
            RescaleDirection::Northeast
        );
        assert_eq!(
            RescaleDirection::classify(Vec2::new(3.0, 3.0), thr),
            RescaleDirection::Southeast
        );
    }

    #[test]
    fn small_moves_stay_armed() {
        let mut g = rescaler();
        g.press(Point::new(10.0, 10.0), MouseButton::Left, Modifiers::NONE);
        assert_eq!(g.drag(Point::new(11.0, 12.0)), None);
        assert!(matches!(g.state(), GestureState::Armed { .. }));
    }

    #[test]
    fn right_button_does_not_arm() {
        let mut g = rescaler();
        g.press(Point::ZERO, MouseButton::Right, Modifiers::NONE);
        assert!(!g.is_active());
        assert_eq!(g.drag(Point::new(50.0, 0.0)), None);
    }

    #[test]
    fn first_locked_step_is_normalised() {
        let mut g = rescaler();
        g.press(Point::new(0.0, 0.0), MouseButton::Left, Modifiers::SHIFT);
        assert_eq!(g.drag(Point::new(1.0, -9.0)), None, "locking move is silent");
        assert_eq!(g.direction(), Some(RescaleDirection::North));

        let first = g.drag(Point::new(1.0, -14.0)).unwrap();
        assert_eq!(first.direction, RescaleDirection::North);
        assert_eq!(first.displacement, Vec2::new(1.0, -1.0));
        assert_eq!(first.modifiers, Modifiers::SHIFT);

        let second = g.drag(Point::new(1.0, -19.0)).unwrap();
        assert_eq!(second.displacement, Vec2::new(0.0, -5.0), "later steps are raw");
    }

    #[test]
    fn direction_locks_at_min_dist() {
        let mut g = rescaler();
        g.press(Point::ZERO, MouseButton::Left, Modifiers::NONE);
        g.drag(Point::new(2.0, 1.0));
        assert_eq!(g.direction(), None);
        g.drag(Point::new(3.0, 1.0));
        assert_eq!(g.direction(), Some(RescaleDirection::East));
    }

    #[test]
    fn direction_is_stable_for_the_whole_gesture() {
        let mut g = rescaler();
        g.press(Point::ZERO, MouseButton::Left, Modifiers::NONE);
        g.drag(Point::new(10.0, 0.0));
        assert_eq!(g.direction(), Some(RescaleDirection::East));
        // Later vertical moves keep the east lock.
        let step = g.drag(Point::new(10.0, 30.0)).unwrap();
        assert_eq!(step.direction, RescaleDirection::East);
        assert_eq!(step.displacement, Vec2::new(1.0, 1.0));
        let step = g.drag(Point::new(10.0, 60.0)).unwrap();
        assert_eq!(step.direction, RescaleDirection::East);
        assert_eq!(step.displacement, Vec2::new(0.0, 30.0));
    }

    #[test]
    fn release_returns_to_idle() {
        let mut g = rescaler();
        assert!(!g.release());
        g.press(Point::ZERO, MouseButton::Left, Modifiers::NONE);
        g.drag(Point::new(0.0, 8.0));
        assert!(g.release());
        assert_eq!(g.state(), &GestureState::Idle);
        assert_eq!(g.direction(), None);
    }
}
