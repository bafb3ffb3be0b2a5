// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer identity and per-layer storage.
//!
//! Every scope widget paints three independently cached strata. They are
//! scheduled independently and composited bottom-to-top in the order given by
//! [`Layer::ALL`].

use core::fmt;
use core::ops::{Index, IndexMut};

/// One of the three visual strata of a scope widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Static or slowly changing backdrop (grids, gradients, colour wheels).
    Background,
    /// The measurement itself.
    Scope,
    /// Heads-up display: labels, scales, cursor read-outs.
    Hud,
}

impl Layer {
    /// All layers in paint order (bottom first).
    pub const ALL: [Self; 3] = [Self::Background, Self::Scope, Self::Hud];

    /// Position of this layer in [`Layer::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Background => 0,
            Self::Scope => 1,
            Self::Hud => 2,
        }
    }

    /// Short lowercase label used in logs and traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Scope => "scope",
            Self::Hud => "hud",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed storage holding one value per [`Layer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerSet<T>([T; 3]);

impl<T> LayerSet<T> {
    /// Builds a set by calling `f` once per layer, in paint order.
    pub fn from_fn(mut f: impl FnMut(Layer) -> T) -> Self {
        Self(Layer::ALL.map(&mut f))
    }

    /// Iterates over `(layer, value)` pairs in paint order.
    pub fn iter(&self) -> impl Iterator<Item = (Layer, &T)> {
        Layer::ALL.into_iter().zip(self.0.iter())
    }

    /// Mutable variant of [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Layer, &mut T)> {
        Layer::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T> Index<Layer> for LayerSet<T> {
    type Output = T;

    #[inline]
    fn index(&self, layer: Layer) -> &T {
        &self.0[layer.index()]
    }
}

impl<T> IndexMut<Layer> for LayerSet<T> {
    #[inline]
    fn index_mut(&mut self, layer: Layer) -> &mut T {
        &mut self.0[layer.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_order_is_background_scope_hud() {
        assert_eq!(Layer::ALL, [Layer::Background, Layer::Scope, Layer::Hud]);
        for (i, layer) in Layer::ALL.into_iter().enumerate() {
            assert_eq!(layer.index(), i, "index must match paint order");
        }
    }

    #[test]
    fn layer_set_indexes_by_layer() {
        let mut set = LayerSet::from_fn(|l| l.index() * 10);
        assert_eq!(set[Layer::Scope], 10);
        set[Layer::Hud] += 1;
        let collected: Vec<_> = set.iter().map(|(l, v)| (l, *v)).collect();
        assert_eq!(
            collected,
            vec![(Layer::Background, 0), (Layer::Scope, 10), (Layer::Hud, 21)]
        );
    }
}
