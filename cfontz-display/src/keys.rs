//! Keypad key mapping

use cfontz_transport::protocol::key;
use serde::Serialize;
use std::fmt;

/// Logical keys reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
}

impl Key {
    /// Map a raw key activity code; releases and unknown codes give `None`.
    ///
    /// The CFA-631 corner keys stand in for the arrow pad: upper-left is Up,
    /// lower-left Down, upper-right Enter, lower-right Escape.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            key::UP_PRESS | key::UL_PRESS => Some(Self::Up),
            key::DOWN_PRESS | key::LL_PRESS => Some(Self::Down),
            key::LEFT_PRESS => Some(Self::Left),
            key::RIGHT_PRESS => Some(Self::Right),
            key::ENTER_PRESS | key::UR_PRESS => Some(Self::Enter),
            key::EXIT_PRESS | key::LR_PRESS => Some(Self::Escape),
            _ => None,
        }
    }

    /// Name used by LCDproc clients
    pub fn name(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Enter => "Enter",
            Self::Escape => "Escape",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_codes() {
        assert_eq!(Key::from_code(1), Some(Key::Up));
        assert_eq!(Key::from_code(2), Some(Key::Down));
        assert_eq!(Key::from_code(3), Some(Key::Left));
        assert_eq!(Key::from_code(4), Some(Key::Right));
        assert_eq!(Key::from_code(5), Some(Key::Enter));
        assert_eq!(Key::from_code(6), Some(Key::Escape));
    }

    #[test]
    fn test_corner_keys() {
        assert_eq!(Key::from_code(13), Some(Key::Up));
        assert_eq!(Key::from_code(14), Some(Key::Enter));
        assert_eq!(Key::from_code(15), Some(Key::Down));
        assert_eq!(Key::from_code(16), Some(Key::Escape));
    }

    #[test]
    fn test_releases_and_unknown() {
        for code in (7..=12).chain(17..=20) {
            assert_eq!(Key::from_code(code), None, "{code}");
        }
        assert_eq!(Key::from_code(0x42), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(Key::Escape.name(), "Escape");
        assert_eq!(Key::Left.to_string(), "Left");
    }
}
