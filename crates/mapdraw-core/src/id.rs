use crate::error::DrawError;
use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide interner for the name part of handles.
///
/// Only prefixes (`circle`, `label`, `tip`, ...) and caller-chosen names are
/// interned; generated serials are stored inline, so drawing does not grow it.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

fn next_serial() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Interned name plus optional serial, rendered as `{name}{sep}{serial}`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct Handle {
    name: Spur,
    serial: Option<u64>,
}

impl Handle {
    fn generated(prefix: &str) -> Self {
        Self {
            name: INTERNER.get_or_intern(prefix),
            serial: Some(next_serial()),
        }
    }

    /// Split a canonical `{name}{sep}{serial}` back into its parts so that
    /// parsing a rendered handle yields the same handle.
    fn parse(s: &str, sep: char) -> Self {
        if let Some((name, digits)) = s.rsplit_once(sep)
            && !name.is_empty()
            && let Ok(serial) = digits.parse::<u64>()
            && serial.to_string() == digits
        {
            return Self {
                name: INTERNER.get_or_intern(name),
                serial: Some(serial),
            };
        }
        Self {
            name: INTERNER.get_or_intern(s),
            serial: None,
        }
    }

    fn name(&self) -> &'static str {
        INTERNER.resolve(&self.name)
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, sep: char) -> fmt::Result {
        match self.serial {
            Some(serial) => write!(f, "{}{sep}{serial}", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// Handle of an overlay placed on the map.
///
/// The overlay itself is owned by the map; state machines only keep this
/// small `Copy` reference to it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(Handle);

impl OverlayId {
    const SEP: char = '_';

    /// The id whose rendering is `s`.
    pub fn intern(s: &str) -> Self {
        OverlayId(Handle::parse(s, Self::SEP))
    }

    /// Generate a unique id with a kind prefix (e.g. `circle_4`, `label_9`).
    pub fn with_prefix(prefix: &str) -> Self {
        OverlayId(Handle::generated(prefix))
    }

    pub fn prefix(&self) -> &str {
        self.0.name()
    }
}

impl fmt::Debug for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("#")?;
        self.0.write(f, Self::SEP)
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write(f, Self::SEP)
    }
}

impl Serialize for OverlayId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OverlayId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(OverlayId::intern(&s))
    }
}

/// Name under which an event listener is registered, used for targeted removal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(Handle);

impl ListenerKey {
    const SEP: char = '-';

    /// Validate a caller-chosen key.
    ///
    /// Keys must be non-empty and consist of `[A-Za-z0-9_-]` only.
    pub fn parse(key: &str) -> Result<Self, DrawError> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(DrawError::InvalidListenerKey(key.to_string()));
        }
        Ok(ListenerKey(Handle::parse(key, Self::SEP)))
    }

    /// Generate a fresh key (`listener-N`) for listeners registered without one.
    pub fn generated() -> Self {
        ListenerKey(Handle::generated("listener"))
    }
}

impl fmt::Debug for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ListenerKey(")?;
        self.0.write(f, Self::SEP)?;
        f.write_str(")")
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write(f, Self::SEP)
    }
}
