use core::fmt;

use thiserror::Error;

use crate::Position;

/// Which side of a rejected pair was already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collision {
    /// The key is taken, the value is free.
    Key,
    /// The value is taken, the key is free.
    Value,
    /// Both are taken, by one entry or by two different ones.
    Both,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Key => "key",
            Self::Value => "value",
            Self::Both => "key and value",
        })
    }
}

/// Returned by [`BiHashMap::try_insert`](crate::BiHashMap::try_insert) when
/// the pair would break key or value uniqueness.
///
/// The rejected pair is handed back untouched.
#[derive(Error)]
#[error("{collision} already present in the map")]
pub struct InsertError<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) position: Position,
    pub(crate) collision: Collision,
}

impl<K, V> InsertError<K, V> {
    /// Position of the entry that blocked the insert.
    ///
    /// When key and value collide with two different entries this is the
    /// entry holding the key.
    #[inline]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub const fn collision(&self) -> Collision {
        self.collision
    }

    #[inline]
    pub const fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Gives back the rejected pair.
    #[inline]
    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> fmt::Debug for InsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("position", &self.position)
            .field("collision", &self.collision)
            .finish_non_exhaustive()
    }
}
